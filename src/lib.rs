//! Specification-to-Test Matching and Verification
//!
//! Requirements are declared in markdown specification documents, tests
//! declare which requirements they verify, and a verification run matches
//! the two sides and reports which requirements are covered, failing, or
//! still unverified.

pub mod domain;
pub use domain::{Config, Requirement, SourceLocation, SpecId, SpecIdError, VerificationKind};

/// Markdown specification parsing.
pub mod parser;
pub use parser::{parse_document, ParseIssue};

/// The in-memory set of declared requirements.
pub mod registry;
pub use registry::SpecRegistry;

/// Declared links between requirements and tests.
pub mod links;
pub use links::{LinkSnapshot, TestLink, TestLinkRegistry, TestRef};

/// Matching requirements against their linked tests.
pub mod verifier;
pub use verifier::{
    CheckError, CommandExecutor, ExecutionResult, ExecutionStatus, TestExecutor, Verifier,
};

/// Verification reports and their rendering.
pub mod report;
pub use report::{
    BlockingPolicy, Counts, Diagnostic, Outcome, Reporter, Status, VerificationEntry,
    VerificationReport,
};
