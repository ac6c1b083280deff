//! Verification outcomes, aggregate reports, and their rendering.

use std::{fmt, path::PathBuf};

use chrono::Utc;

use crate::domain::{Requirement, SourceLocation, SpecId};

/// The terminal status of one requirement after a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Every linked test passed.
    Pass,
    /// At least one linked test failed or errored.
    Fail,
    /// No test is linked and the requirement expects automated coverage.
    Pending,
    /// The requirement is marked skipped and was not evaluated.
    Skipped,
    /// The requirement awaits manual verification and has no linked tests.
    ManualPending,
}

impl Status {
    /// The label used in human-readable output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Pending => "PENDING",
            Self::Skipped => "SKIPPED",
            Self::ManualPending => "MANUAL",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One requirement's result within a [`VerificationReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationEntry {
    requirement: Requirement,
    status: Status,
    detail: Option<String>,
}

impl VerificationEntry {
    pub(crate) fn new(requirement: Requirement, status: Status, detail: Option<String>) -> Self {
        Self {
            requirement,
            status,
            detail,
        }
    }

    /// The requirement this entry describes.
    #[must_use]
    pub const fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// The outcome for this requirement.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Failure detail, present only for [`Status::Fail`] entries. Carries the
    /// first failing test's reference and message.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

/// Aggregate tallies over a report's entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Requirements whose linked tests all passed.
    pub pass: usize,
    /// Requirements with at least one failing or erroring test.
    pub fail: usize,
    /// Requirements awaiting automated coverage.
    pub pending: usize,
    /// Requirements excluded from evaluation.
    pub skipped: usize,
    /// Requirements awaiting manual verification.
    pub manual_pending: usize,
}

impl Counts {
    fn record(&mut self, status: Status) {
        match status {
            Status::Pass => self.pass += 1,
            Status::Fail => self.fail += 1,
            Status::Pending => self.pending += 1,
            Status::Skipped => self.skipped += 1,
            Status::ManualPending => self.manual_pending += 1,
        }
    }

    /// The total number of requirements counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.pass + self.fail + self.pending + self.skipped + self.manual_pending
    }
}

/// A structural problem found while loading specifications, reported
/// alongside verification results rather than aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    /// The same identifier was declared in more than one place.
    #[error(
        "duplicate identifier {id}: first declared at {first}, declared again at {second} (ignored)"
    )]
    DuplicateIdentifier {
        /// The identifier declared twice.
        id: SpecId,
        /// Where the retained declaration lives.
        first: SourceLocation,
        /// Where the ignored declaration lives.
        second: SourceLocation,
    },
    /// A specification file could not be read.
    #[error("failed to read specification file {path}: {message}")]
    UnreadableFile {
        /// The unreadable file.
        path: PathBuf,
        /// The underlying I/O error, rendered.
        message: String,
    },
}

/// The complete outcome of one verification run.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    entries: Vec<VerificationEntry>,
    counts: Counts,
    diagnostics: Vec<Diagnostic>,
}

impl VerificationReport {
    pub(crate) fn new(entries: Vec<VerificationEntry>, diagnostics: Vec<Diagnostic>) -> Self {
        let mut counts = Counts::default();
        for entry in &entries {
            counts.record(entry.status());
        }
        Self {
            entries,
            counts,
            diagnostics,
        }
    }

    /// All entries, in identifier order.
    #[must_use]
    pub fn entries(&self) -> &[VerificationEntry] {
        &self.entries
    }

    /// Aggregate tallies over the entries.
    #[must_use]
    pub const fn counts(&self) -> &Counts {
        &self.counts
    }

    /// Structural problems found while loading specifications.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Decides which non-failure statuses block success.
///
/// An explicit value rather than a buried conditional, so the blocking rule
/// is visible at the call site and adjustable without touching the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockingPolicy {
    /// Whether requirements still awaiting automated coverage block
    /// success. Manually-pending requirements never block.
    pub pending_blocks: bool,
}

impl Default for BlockingPolicy {
    fn default() -> Self {
        Self {
            pending_blocks: true,
        }
    }
}

/// Whether a run succeeded under a [`BlockingPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing blocked: no failures, no structural diagnostics, and no
    /// pending work when the policy counts pending as blocking.
    Success,
    /// At least one blocker was present.
    Failed,
}

/// Renders reports and maps them to process exit codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter;

impl Reporter {
    /// Applies `policy` to `report`.
    ///
    /// Skipped and manually-pending requirements never block: manual
    /// verification is satisfied by human attestation, not by the absence
    /// of a linked test.
    #[must_use]
    pub fn outcome(report: &VerificationReport, policy: BlockingPolicy) -> Outcome {
        let counts = report.counts();
        let blocked = counts.fail > 0
            || !report.diagnostics().is_empty()
            || (policy.pending_blocks && counts.pending > 0);
        if blocked {
            Outcome::Failed
        } else {
            Outcome::Success
        }
    }

    /// Maps a report to a process exit code for CI.
    ///
    /// 0 on success, 1 when any requirement failed or a structural
    /// diagnostic was reported, 2 when the only blockers are pending
    /// requirements.
    #[must_use]
    pub fn exit_code(report: &VerificationReport, policy: BlockingPolicy) -> i32 {
        match Self::outcome(report, policy) {
            Outcome::Success => 0,
            Outcome::Failed => {
                if report.counts().fail > 0 || !report.diagnostics().is_empty() {
                    1
                } else {
                    2
                }
            }
        }
    }

    /// Renders a plain-text summary: one line per requirement, tallies, and
    /// a final verdict line.
    #[must_use]
    pub fn render(report: &VerificationReport, policy: BlockingPolicy) -> String {
        let mut out = String::new();

        for diagnostic in report.diagnostics() {
            out.push_str(&format!("warning: {diagnostic}\n"));
        }
        if !report.diagnostics().is_empty() {
            out.push('\n');
        }

        for entry in report.entries() {
            let requirement = entry.requirement();
            out.push_str(&format!(
                "{:<8} {}: {}\n",
                entry.status().label(),
                requirement.id(),
                requirement.description()
            ));
            if let Some(detail) = entry.detail() {
                out.push_str(&format!("         {detail}\n"));
            }
        }

        let counts = report.counts();
        out.push_str(&format!(
            "\n{} requirements: {} passed, {} failed, {} pending, {} skipped, {} manual\n",
            counts.total(),
            counts.pass,
            counts.fail,
            counts.pending,
            counts.skipped,
            counts.manual_pending
        ));
        out.push_str(match Self::outcome(report, policy) {
            Outcome::Success => "PASSED\n",
            Outcome::Failed => "FAILED\n",
        });
        out
    }

    /// Renders a timestamped markdown verification report.
    #[must_use]
    pub fn to_markdown(report: &VerificationReport) -> String {
        let mut out = String::new();
        out.push_str("# Verification Report\n\n");
        out.push_str(&format!(
            "Generated: {}\n\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        ));

        if !report.diagnostics().is_empty() {
            out.push_str("## Diagnostics\n\n");
            for diagnostic in report.diagnostics() {
                out.push_str(&format!("- {diagnostic}\n"));
            }
            out.push('\n');
        }

        out.push_str("## Requirements\n\n");
        out.push_str("| Identifier | Status | Description |\n");
        out.push_str("| --- | --- | --- |\n");
        for entry in report.entries() {
            let requirement = entry.requirement();
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                requirement.id(),
                entry.status().label(),
                requirement.description()
            ));
        }

        let counts = report.counts();
        out.push_str(&format!(
            "\n## Summary\n\n{} requirements: {} passed, {} failed, {} pending, {} skipped, {} manual\n",
            counts.total(),
            counts.pass,
            counts.fail,
            counts.pending,
            counts.skipped,
            counts.manual_pending
        ));
        out
    }
}
