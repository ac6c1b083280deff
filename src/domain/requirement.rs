use std::{fmt, path::PathBuf};

use crate::domain::SpecId;

/// How a requirement demands to be verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationKind {
    /// Requires a passing automated test.
    Standard,
    /// Satisfied by human attestation; never auto-passes and never counts as
    /// a pending failure.
    Manual,
    /// Excluded from pass/fail accounting entirely.
    Skip,
    /// Intended for runtime contract verification. No contract mechanism is
    /// present, so this follows the same test-matching path as [`Standard`].
    ///
    /// [`Standard`]: VerificationKind::Standard
    Contract,
}

impl VerificationKind {
    /// The bracketed tag literal used in markdown, if any.
    #[must_use]
    pub const fn tag(self) -> Option<&'static str> {
        match self {
            Self::Standard => None,
            Self::Manual => Some("manual"),
            Self::Skip => Some("SKIP"),
            Self::Contract => Some("contract"),
        }
    }
}

impl fmt::Display for VerificationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Standard => "standard",
            Self::Manual => "manual",
            Self::Skip => "skip",
            Self::Contract => "contract",
        };
        write!(f, "{name}")
    }
}

/// Where a requirement declaration was found. Diagnostics only, never part
/// of the requirement's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// The originating file.
    pub path: PathBuf,
    /// 1-based line number within the file.
    pub line: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

/// A uniquely identified, described, testable claim about system behaviour.
///
/// Requirements are created once per parse pass and never mutated; the full
/// set is rebuilt from scratch on every verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    id: SpecId,
    description: String,
    kind: VerificationKind,
    location: SourceLocation,
}

impl Requirement {
    /// Construct a new [`Requirement`].
    #[must_use]
    pub const fn new(
        id: SpecId,
        description: String,
        kind: VerificationKind,
        location: SourceLocation,
    ) -> Self {
        Self {
            id,
            description,
            kind,
            location,
        }
    }

    /// The requirement's identifier.
    #[must_use]
    pub const fn id(&self) -> &SpecId {
        &self.id
    }

    /// The free-text description following the identifier.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The verification kind declared by the requirement's tag.
    #[must_use]
    pub const fn kind(&self) -> VerificationKind {
        self.kind
    }

    /// Where the requirement was declared.
    #[must_use]
    pub const fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Renders the canonical markdown declaration line for this requirement.
    ///
    /// Parsing the result recovers an equal requirement (modulo location), and
    /// re-rendering a parsed canonical line is idempotent.
    #[must_use]
    pub fn canonical_line(&self) -> String {
        match self.kind.tag() {
            Some(tag) => format!("- **{}** [{tag}]: {}", self.id, self.description),
            None => format!("- **{}**: {}", self.id, self.description),
        }
    }
}
