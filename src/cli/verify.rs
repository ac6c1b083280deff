use std::{path::PathBuf, process};

use spec_test::{
    links,
    registry::strict_scan,
    BlockingPolicy, CommandExecutor, Config, Outcome, Reporter, SpecRegistry, Status,
    VerificationReport, Verifier,
};
use tracing::instrument;

use super::terminal::Colorize;

/// Output format for verification results
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Default, clap::Parser)]
pub struct Verify {
    /// Override the configured specification directory
    #[arg(long, value_name = "DIR")]
    specs: Option<PathBuf>,

    /// Override the configured test-source directory
    #[arg(long, value_name = "DIR")]
    tests: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Write a markdown verification report to this path
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Do not treat pending requirements as blocking
    #[arg(long)]
    allow_pending: bool,

    /// Report lines that look like requirement declarations but have
    /// malformed identifiers, and fail when any are found
    #[arg(long)]
    strict: bool,
}

impl Verify {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let config = Config::load_or_default(&root);
        let specs_dir = root.join(self.specs.as_deref().unwrap_or_else(|| config.specs_dir()));
        let tests_dir = root.join(self.tests.as_deref().unwrap_or_else(|| config.tests_dir()));

        let registry = SpecRegistry::from_directory(&specs_dir);
        let issues = if self.strict || config.strict {
            strict_scan(&specs_dir)
        } else {
            Vec::new()
        };

        let snapshot = links::scan_directory(&tests_dir).snapshot();
        let executor = CommandExecutor::new(config.runner());
        let report = Verifier::run(&registry, &snapshot, &executor);

        let policy = BlockingPolicy {
            pending_blocks: !self.allow_pending,
        };

        // Malformed declarations found by the strict pass are structural
        // problems, same severity as duplicates.
        let failed = Reporter::outcome(&report, policy) == Outcome::Failed || !issues.is_empty();

        match self.output {
            OutputFormat::Table => Self::print_table(&report, &issues, failed),
            OutputFormat::Json => Self::print_json(&report, &issues, failed)?,
        }

        if let Some(path) = &self.report {
            std::fs::write(path, Reporter::to_markdown(&report))
                .map_err(|e| anyhow::anyhow!("Failed to write report to {}: {e}", path.display()))?;
            println!("Wrote report to {}", path.display());
        }

        let mut code = Reporter::exit_code(&report, policy);
        if !issues.is_empty() {
            code = 1;
        }
        if code != 0 {
            process::exit(code);
        }
        Ok(())
    }

    fn print_table(report: &VerificationReport, issues: &[spec_test::ParseIssue], failed: bool) {
        for diagnostic in report.diagnostics() {
            eprintln!("{}", format!("⚠️  {diagnostic}").warning());
        }
        for issue in issues {
            eprintln!("{}", format!("⚠️  {issue}").warning());
        }
        if !report.diagnostics().is_empty() || !issues.is_empty() {
            eprintln!();
        }

        for entry in report.entries() {
            let label = format!("{:<8}", entry.status().label());
            let label = match entry.status() {
                Status::Pass => label.success(),
                Status::Fail => label.failure(),
                Status::Pending | Status::ManualPending => label.warning(),
                Status::Skipped => label.dim(),
            };
            println!(
                "{label} {}: {}",
                entry.requirement().id(),
                entry.requirement().description()
            );
            if let Some(detail) = entry.detail() {
                println!("         {}", detail.dim());
            }
        }

        let counts = report.counts();
        println!(
            "\n{} requirements: {} passed, {} failed, {} pending, {} skipped, {} manual",
            counts.total(),
            counts.pass,
            counts.fail,
            counts.pending,
            counts.skipped,
            counts.manual_pending
        );
        if failed {
            println!("{}", "FAILED".failure());
        } else {
            println!("{}", "PASSED".success());
        }
    }

    fn print_json(
        report: &VerificationReport,
        issues: &[spec_test::ParseIssue],
        failed: bool,
    ) -> anyhow::Result<()> {
        use serde_json::json;

        let entries: Vec<_> = report
            .entries()
            .iter()
            .map(|entry| {
                json!({
                    "id": entry.requirement().id().to_string(),
                    "kind": entry.requirement().kind().to_string(),
                    "description": entry.requirement().description(),
                    "location": entry.requirement().location().to_string(),
                    "status": entry.status().label(),
                    "detail": entry.detail(),
                })
            })
            .collect();

        let counts = report.counts();
        let output = json!({
            "success": !failed,
            "summary": {
                "total": counts.total(),
                "pass": counts.pass,
                "fail": counts.fail,
                "pending": counts.pending,
                "skipped": counts.skipped,
                "manual_pending": counts.manual_pending,
            },
            "diagnostics": report
                .diagnostics()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            "issues": issues.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "requirements": entries,
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn verify_succeeds_on_empty_repository() {
        let tmp = tempdir().unwrap();

        Verify::default()
            .run(tmp.path().to_path_buf())
            .expect("verify should succeed with no specifications");
    }
}
