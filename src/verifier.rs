//! Matches requirements against their linked tests and produces reports.

use std::process::Command;

use crate::{
    domain::{SpecId, VerificationKind},
    links::{LinkSnapshot, TestRef},
    registry::SpecRegistry,
    report::{Status, VerificationEntry, VerificationReport},
};

/// The raw outcome of running one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// The test ran and passed.
    Passed,
    /// The test ran and failed.
    Failed,
    /// The test could not be run at all.
    Errored,
}

/// What the executor observed for one test invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Pass, fail, or could-not-run.
    pub status: ExecutionStatus,
    /// Failure or error detail, when the executor has any.
    pub message: Option<String>,
}

impl ExecutionResult {
    /// A successful run.
    #[must_use]
    pub const fn passed() -> Self {
        Self {
            status: ExecutionStatus::Passed,
            message: None,
        }
    }

    /// A failed run with detail.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            message: Some(message.into()),
        }
    }

    /// A run that could not be started.
    #[must_use]
    pub fn errored(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Errored,
            message: Some(message.into()),
        }
    }
}

/// Runs a single referenced test.
///
/// The verifier is generic over execution so the matching logic can be
/// exercised without spawning processes.
pub trait TestExecutor {
    /// Executes the referenced test and reports what happened.
    fn execute(&self, test: &TestRef) -> ExecutionResult;
}

/// Runs tests through an external command template.
///
/// The template is split on whitespace and every `{test}` placeholder is
/// replaced with the test reference, so a runner like
/// `cargo test --quiet {test}` resolves to one process invocation per test.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    template: String,
}

impl CommandExecutor {
    /// Creates an executor from a runner command template.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl TestExecutor for CommandExecutor {
    fn execute(&self, test: &TestRef) -> ExecutionResult {
        let rendered = self.template.replace("{test}", test.as_str());
        let mut parts = rendered.split_whitespace();
        let Some(program) = parts.next() else {
            return ExecutionResult::errored("runner command is empty");
        };

        tracing::debug!("Running '{rendered}'");
        match Command::new(program).args(parts).output() {
            Ok(output) if output.status.success() => ExecutionResult::passed(),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let detail = stderr.trim();
                if detail.is_empty() {
                    ExecutionResult::failed(format!("exited with {}", output.status))
                } else {
                    ExecutionResult::failed(detail)
                }
            }
            Err(e) => ExecutionResult::errored(format!("failed to run '{rendered}': {e}")),
        }
    }
}

/// Raised when a single-requirement check names an unknown identifier.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CheckError {
    /// The identifier is not declared in any loaded specification.
    #[error("identifier {0} is not declared in any specification")]
    IdentifierNotFound(SpecId),
}

/// Matches every loaded requirement against the declared test links.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verifier;

impl Verifier {
    /// Verifies every requirement in the registry, in identifier order.
    ///
    /// Structural diagnostics collected while the registry was loaded are
    /// carried into the report unchanged.
    #[must_use]
    pub fn run(
        registry: &SpecRegistry,
        links: &LinkSnapshot,
        executor: &dyn TestExecutor,
    ) -> VerificationReport {
        let entries = registry
            .all()
            .map(|requirement| Self::verify_one(requirement, links, executor))
            .collect();
        VerificationReport::new(entries, registry.diagnostics().to_vec())
    }

    /// Verifies a single requirement by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError::IdentifierNotFound`] when no loaded
    /// specification declares `id`.
    pub fn check(
        registry: &SpecRegistry,
        links: &LinkSnapshot,
        executor: &dyn TestExecutor,
        id: &SpecId,
    ) -> Result<VerificationEntry, CheckError> {
        let requirement = registry
            .get(id)
            .ok_or_else(|| CheckError::IdentifierNotFound(id.clone()))?;
        Ok(Self::verify_one(requirement, links, executor))
    }

    fn verify_one(
        requirement: &crate::domain::Requirement,
        links: &LinkSnapshot,
        executor: &dyn TestExecutor,
    ) -> VerificationEntry {
        // Skipped requirements never execute, linked tests or not.
        if requirement.kind() == VerificationKind::Skip {
            return VerificationEntry::new(requirement.clone(), Status::Skipped, None);
        }

        let linked = links.lookup(requirement.id());
        if linked.is_empty() {
            let status = match requirement.kind() {
                VerificationKind::Manual => Status::ManualPending,
                _ => Status::Pending,
            };
            return VerificationEntry::new(requirement.clone(), status, None);
        }

        // A manually-verified requirement with linked tests still runs them;
        // the declaration is a stronger claim than the tag. Every linked test
        // runs even after a failure, so each invocation is observed.
        let mut first_failure = None;
        for link in linked {
            let result = executor.execute(link.test());
            if result.status != ExecutionStatus::Passed && first_failure.is_none() {
                let message = result.message.unwrap_or_else(|| match result.status {
                    ExecutionStatus::Failed => "test failed".to_string(),
                    _ => "test could not be run".to_string(),
                });
                first_failure = Some(format!("{}: {message}", link.test()));
            }
        }

        match first_failure {
            Some(detail) => VerificationEntry::new(requirement.clone(), Status::Fail, Some(detail)),
            None => VerificationEntry::new(requirement.clone(), Status::Pass, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashMap, path::PathBuf};

    use nonempty::NonEmpty;

    use crate::{
        domain::{Requirement, SourceLocation},
        links::TestLinkRegistry,
        report::{BlockingPolicy, Outcome, Reporter},
    };

    use super::*;

    /// Scripted executor that records every invocation.
    struct FakeExecutor {
        results: HashMap<String, ExecutionResult>,
        invoked: RefCell<Vec<String>>,
    }

    impl FakeExecutor {
        fn new(results: impl IntoIterator<Item = (&'static str, ExecutionResult)>) -> Self {
            Self {
                results: results
                    .into_iter()
                    .map(|(name, result)| (name.to_string(), result))
                    .collect(),
                invoked: RefCell::new(Vec::new()),
            }
        }

        fn invoked(&self) -> Vec<String> {
            self.invoked.borrow().clone()
        }
    }

    impl TestExecutor for FakeExecutor {
        fn execute(&self, test: &TestRef) -> ExecutionResult {
            self.invoked.borrow_mut().push(test.as_str().to_string());
            self.results
                .get(test.as_str())
                .cloned()
                .unwrap_or_else(|| ExecutionResult::errored("unknown test"))
        }
    }

    fn requirement(id: &str, kind: VerificationKind) -> Requirement {
        Requirement::new(
            id.parse().unwrap(),
            format!("requirement {id}"),
            kind,
            SourceLocation {
                path: PathBuf::from("docs/specs/spec.md"),
                line: 1,
            },
        )
    }

    fn registry(requirements: Vec<Requirement>) -> SpecRegistry {
        let mut registry = SpecRegistry::new();
        registry.add(requirements);
        registry
    }

    fn link(links: &TestLinkRegistry, id: &str, test: &str) {
        links.declare(NonEmpty::new(id.parse().unwrap()), TestRef::new(test));
    }

    #[test]
    fn unlinked_standard_requirement_is_pending() {
        let registry = registry(vec![requirement("AUTH-001", VerificationKind::Standard)]);
        let snapshot = TestLinkRegistry::new().snapshot();
        let executor = FakeExecutor::new([]);

        let report = Verifier::run(&registry, &snapshot, &executor);

        assert_eq!(report.entries()[0].status(), Status::Pending);
        assert!(executor.invoked().is_empty());
    }

    #[test]
    fn unlinked_contract_requirement_is_pending() {
        let registry = registry(vec![requirement("API-001", VerificationKind::Contract)]);
        let snapshot = TestLinkRegistry::new().snapshot();

        let report = Verifier::run(&registry, &snapshot, &FakeExecutor::new([]));

        assert_eq!(report.entries()[0].status(), Status::Pending);
    }

    #[test]
    fn unlinked_manual_requirement_awaits_attestation() {
        let registry = registry(vec![requirement("OPS-001", VerificationKind::Manual)]);
        let snapshot = TestLinkRegistry::new().snapshot();

        let report = Verifier::run(&registry, &snapshot, &FakeExecutor::new([]));

        assert_eq!(report.entries()[0].status(), Status::ManualPending);
    }

    #[test]
    fn lone_manual_requirement_passes_overall_verification() {
        let registry = registry(vec![requirement("OPS-001", VerificationKind::Manual)]);
        let snapshot = TestLinkRegistry::new().snapshot();

        let report = Verifier::run(&registry, &snapshot, &FakeExecutor::new([]));

        assert_eq!(
            Reporter::outcome(&report, BlockingPolicy::default()),
            Outcome::Success
        );
        assert_eq!(Reporter::exit_code(&report, BlockingPolicy::default()), 0);
    }

    #[test]
    fn skipped_requirement_never_executes_linked_tests() {
        let registry = registry(vec![requirement("OLD-001", VerificationKind::Skip)]);
        let links = TestLinkRegistry::new();
        link(&links, "OLD-001", "test_legacy");
        let executor = FakeExecutor::new([("test_legacy", ExecutionResult::passed())]);

        let report = Verifier::run(&registry, &links.snapshot(), &executor);

        assert_eq!(report.entries()[0].status(), Status::Skipped);
        assert!(executor.invoked().is_empty());
    }

    #[test]
    fn all_linked_tests_passing_yields_pass() {
        let registry = registry(vec![requirement("AUTH-001", VerificationKind::Standard)]);
        let links = TestLinkRegistry::new();
        link(&links, "AUTH-001", "test_a");
        link(&links, "AUTH-001", "test_b");
        let executor = FakeExecutor::new([
            ("test_a", ExecutionResult::passed()),
            ("test_b", ExecutionResult::passed()),
        ]);

        let report = Verifier::run(&registry, &links.snapshot(), &executor);

        assert_eq!(report.entries()[0].status(), Status::Pass);
        assert_eq!(executor.invoked().len(), 2);
    }

    #[test]
    fn first_failure_is_reported_with_test_and_message() {
        let registry = registry(vec![requirement("AUTH-001", VerificationKind::Standard)]);
        let links = TestLinkRegistry::new();
        link(&links, "AUTH-001", "test_fails");
        let executor =
            FakeExecutor::new([("test_fails", ExecutionResult::failed("assertion failed"))]);

        let report = Verifier::run(&registry, &links.snapshot(), &executor);

        let entry = &report.entries()[0];
        assert_eq!(entry.status(), Status::Fail);
        assert_eq!(entry.detail(), Some("test_fails: assertion failed"));
    }

    #[test]
    fn every_linked_test_runs_even_after_a_failure() {
        let registry = registry(vec![requirement("AUTH-001", VerificationKind::Standard)]);
        let links = TestLinkRegistry::new();
        link(&links, "AUTH-001", "test_first");
        link(&links, "AUTH-001", "test_second");
        let executor = FakeExecutor::new([
            ("test_first", ExecutionResult::failed("timeout")),
            ("test_second", ExecutionResult::failed("assertion failed")),
        ]);

        let report = Verifier::run(&registry, &links.snapshot(), &executor);

        let entry = &report.entries()[0];
        assert_eq!(entry.status(), Status::Fail);
        assert_eq!(entry.detail(), Some("test_first: timeout"));
        assert_eq!(
            executor.invoked(),
            vec!["test_first".to_string(), "test_second".to_string()]
        );
    }

    #[test]
    fn execution_error_counts_as_failure() {
        let registry = registry(vec![requirement("AUTH-001", VerificationKind::Standard)]);
        let links = TestLinkRegistry::new();
        link(&links, "AUTH-001", "test_broken");
        let executor =
            FakeExecutor::new([("test_broken", ExecutionResult::errored("runner not found"))]);

        let report = Verifier::run(&registry, &links.snapshot(), &executor);

        let entry = &report.entries()[0];
        assert_eq!(entry.status(), Status::Fail);
        assert_eq!(entry.detail(), Some("test_broken: runner not found"));
    }

    #[test]
    fn manual_requirement_with_linked_tests_runs_them() {
        let registry = registry(vec![requirement("OPS-001", VerificationKind::Manual)]);
        let links = TestLinkRegistry::new();
        link(&links, "OPS-001", "test_ops");
        let executor = FakeExecutor::new([("test_ops", ExecutionResult::passed())]);

        let report = Verifier::run(&registry, &links.snapshot(), &executor);

        assert_eq!(report.entries()[0].status(), Status::Pass);
        assert_eq!(executor.invoked(), vec!["test_ops".to_string()]);
    }

    #[test]
    fn entries_follow_identifier_order() {
        let registry = registry(vec![
            requirement("STORE-002", VerificationKind::Standard),
            requirement("AUTH-010", VerificationKind::Standard),
            requirement("AUTH-002", VerificationKind::Standard),
        ]);
        let snapshot = TestLinkRegistry::new().snapshot();

        let report = Verifier::run(&registry, &snapshot, &FakeExecutor::new([]));

        let ids: Vec<_> = report
            .entries()
            .iter()
            .map(|e| e.requirement().id().to_string())
            .collect();
        assert_eq!(ids, vec!["AUTH-002", "AUTH-010", "STORE-002"]);
    }

    #[test]
    fn check_verifies_one_requirement() {
        let registry = registry(vec![
            requirement("AUTH-001", VerificationKind::Standard),
            requirement("AUTH-002", VerificationKind::Standard),
        ]);
        let links = TestLinkRegistry::new();
        link(&links, "AUTH-001", "test_a");
        let executor = FakeExecutor::new([("test_a", ExecutionResult::passed())]);

        let entry = Verifier::check(
            &registry,
            &links.snapshot(),
            &executor,
            &"AUTH-001".parse().unwrap(),
        )
        .unwrap();

        assert_eq!(entry.status(), Status::Pass);
        assert_eq!(executor.invoked(), vec!["test_a".to_string()]);
    }

    #[test]
    fn check_unknown_identifier_is_an_error() {
        let registry = registry(vec![requirement("AUTH-001", VerificationKind::Standard)]);
        let snapshot = TestLinkRegistry::new().snapshot();

        let error = Verifier::check(
            &registry,
            &snapshot,
            &FakeExecutor::new([]),
            &"MISSING-001".parse().unwrap(),
        )
        .unwrap_err();

        assert_eq!(
            error,
            CheckError::IdentifierNotFound("MISSING-001".parse().unwrap())
        );
    }

    #[test]
    fn padded_identifier_check_finds_unpadded_declaration() {
        let registry = registry(vec![requirement("AUTH-1", VerificationKind::Standard)]);
        let snapshot = TestLinkRegistry::new().snapshot();

        let entry = Verifier::check(
            &registry,
            &snapshot,
            &FakeExecutor::new([]),
            &"AUTH-001".parse().unwrap(),
        )
        .unwrap();

        assert_eq!(entry.status(), Status::Pending);
    }
}
