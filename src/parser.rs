//! Extraction of requirement declarations from markdown text.
//!
//! The parser is deliberately not a general markdown parser: it scans line by
//! line for bold-emphasised identifier tokens and ignores everything else.
//! Malformed identifiers are skipped rather than fatal, so a single typo in a
//! large document never aborts parsing of the rest. Callers who want hard
//! failures run [`strict_issues`] as a separate pass.

use std::{path::Path, sync::LazyLock};

use regex::Regex;

use crate::domain::{Requirement, SourceLocation, SpecId, SpecIdError, VerificationKind};

/// Matches `**PREFIX-NNN** [tag]...: description` with either `**` or `__`
/// emphasis. Only well-formed identifiers match; anything else is ignored.
static REQUIREMENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:\*\*([A-Z][A-Z0-9]+-[0-9]+)\*\*|__([A-Z][A-Z0-9]+-[0-9]+)__)((?:[ \t]*\[[A-Za-z]+\])*):[ \t]*(.+)$",
    )
    .expect("requirement line pattern is valid")
});

/// Matches anything that looks like an emphasised identifier declaration,
/// well-formed or not. Used only by the strict pass.
static CANDIDATE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    // A dash is required so ordinary bold words ("**Note**: ...") are not
    // mistaken for identifier declarations.
    Regex::new(
        r"(?:\*\*([A-Za-z0-9_]+(?:-[A-Za-z0-9_]+)+)\*\*|__([A-Za-z0-9_]+(?:-[A-Za-z0-9_]+)+)__)(?:[ \t]*\[[A-Za-z]+\])*:",
    )
    .expect("candidate line pattern is valid")
});

/// Extracts individual bracketed tag words.
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([A-Za-z]+)\]").expect("tag pattern is valid"));

/// Parses one markdown document into an ordered sequence of requirements.
///
/// Source order is preserved. Lines without a well-formed identifier token
/// are ignored, including malformed identifiers; an empty result is valid.
/// The parser performs no I/O.
#[must_use]
pub fn parse_document(text: &str, path: &Path) -> Vec<Requirement> {
    let mut requirements = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let Some(captures) = REQUIREMENT_LINE.captures(line) else {
            continue;
        };

        let token = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();

        let Ok(id) = token.parse::<SpecId>() else {
            // Second line of defence: the pattern is narrower than the
            // identifier grammar, but never abort on a mismatch.
            tracing::debug!(
                "Skipping malformed identifier '{token}' at {}:{}",
                path.display(),
                index + 1
            );
            continue;
        };

        let kind = kind_from_tags(captures.get(3).map_or("", |m| m.as_str()));
        let description = captures.get(4).map_or("", |m| m.as_str()).trim().to_string();

        requirements.push(Requirement::new(
            id,
            description,
            kind,
            SourceLocation {
                path: path.to_path_buf(),
                line: index + 1,
            },
        ));
    }

    requirements
}

/// Determines the verification kind from the raw tag run.
///
/// Tag words are matched case-insensitively with precedence
/// skip > manual > contract; untagged lines are standard.
fn kind_from_tags(tags: &str) -> VerificationKind {
    let lowercase: Vec<String> = TAG
        .captures_iter(tags)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
        .collect();

    if lowercase.iter().any(|t| t == "skip") {
        VerificationKind::Skip
    } else if lowercase.iter().any(|t| t == "manual") {
        VerificationKind::Manual
    } else if lowercase.iter().any(|t| t == "contract") {
        VerificationKind::Contract
    } else {
        VerificationKind::Standard
    }
}

/// A line that looks like a requirement declaration but carries a malformed
/// identifier.
///
/// The lenient pass skips these silently; this type is produced only by
/// [`strict_issues`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{location}: malformed requirement identifier '{token}': {source}")]
pub struct ParseIssue {
    /// Where the malformed declaration was found.
    pub location: SourceLocation,
    /// The identifier-like token as written.
    pub token: String,
    /// Why the token failed to parse.
    pub source: SpecIdError,
}

/// Strict-mode validation: reports declaration-shaped lines whose identifier
/// does not parse.
///
/// This is the second tier of the two-tier validation policy: extraction is
/// always permissive, and callers opt into hard failures by running this
/// pass and treating a non-empty result as an error.
#[must_use]
pub fn strict_issues(text: &str, path: &Path) -> Vec<ParseIssue> {
    let mut issues = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let Some(captures) = CANDIDATE_LINE.captures(line) else {
            continue;
        };

        let token = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();

        if let Err(source) = token.parse::<SpecId>() {
            issues.push(ParseIssue {
                location: SourceLocation {
                    path: path.to_path_buf(),
                    line: index + 1,
                },
                token: token.to_string(),
                source,
            });
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use test_case::test_case;

    use super::*;

    fn parse(text: &str) -> Vec<Requirement> {
        parse_document(text, Path::new("spec.md"))
    }

    #[test]
    fn extracts_requirements_in_source_order() {
        let text = "# Spec\n\n## Requirements\n- **TEST-001**: First requirement\n- **TEST-002**: Second requirement\n";

        let requirements = parse(text);

        assert_eq!(requirements.len(), 2);
        assert_eq!(requirements[0].id().to_string(), "TEST-001");
        assert_eq!(requirements[0].description(), "First requirement");
        assert_eq!(requirements[0].location().line, 4);
        assert_eq!(requirements[1].id().to_string(), "TEST-002");
        assert_eq!(requirements[1].description(), "Second requirement");
    }

    #[test_case("- **TEST-001**: Normal", VerificationKind::Standard; "untagged")]
    #[test_case("- **TEST-001** [manual]: Needs a human", VerificationKind::Manual; "manual tag")]
    #[test_case("- **TEST-001** [SKIP]: Excluded", VerificationKind::Skip; "skip tag")]
    #[test_case("- **TEST-001** [skip]: Excluded", VerificationKind::Skip; "lowercase skip tag")]
    #[test_case("- **TEST-001** [contract]: Runtime checked", VerificationKind::Contract; "contract tag")]
    #[test_case("- **TEST-001** [manual] [SKIP]: Both", VerificationKind::Skip; "skip wins over manual")]
    fn tag_determines_kind(line: &str, expected: VerificationKind) {
        let requirements = parse(line);
        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].kind(), expected);
    }

    #[test]
    fn underscore_emphasis_is_equivalent() {
        let requirements = parse("- __TEST-001__: Underscored");
        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].id().to_string(), "TEST-001");
        assert_eq!(requirements[0].description(), "Underscored");
    }

    #[test]
    fn description_is_trimmed() {
        let requirements = parse("- **TEST-001**:    padded description   ");
        assert_eq!(requirements[0].description(), "padded description");
    }

    #[test]
    fn prose_headings_and_fences_are_ignored() {
        let text = "# AUTH-001 is discussed below\n\nPlain prose mentioning TEST-001 without emphasis.\n\n```\ncode fence content\n```\n";
        assert!(parse(text).is_empty());
    }

    #[test_case("- **TEST-abc**: non-numeric suffix"; "non numeric suffix")]
    #[test_case("- **test-001**: lowercase prefix"; "lowercase prefix")]
    #[test_case("- **T-001**: short prefix"; "short prefix")]
    fn malformed_identifiers_are_skipped_not_fatal(line: &str) {
        let text = format!("{line}\n- **TEST-002**: still parsed\n");
        let requirements = parse(&text);
        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].id().to_string(), "TEST-002");
    }

    #[test]
    fn missing_colon_is_ignored() {
        assert!(parse("- **TEST-001** no colon here").is_empty());
    }

    #[test]
    fn empty_document_is_valid() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn canonical_line_round_trip_is_idempotent() {
        let original = "- **AUTH-001** [manual]: Login requires a valid token";
        let first = parse(original);
        assert_eq!(first.len(), 1);

        let rendered = first[0].canonical_line();
        assert_eq!(rendered, original);

        let second = parse(&rendered);
        assert_eq!(second[0].id(), first[0].id());
        assert_eq!(second[0].description(), first[0].description());
        assert_eq!(second[0].kind(), first[0].kind());
    }

    #[test]
    fn strict_pass_flags_malformed_declarations() {
        let text = "- **TEST-001**: fine\n- **test-002**: lowercase\n- **T-3**: short\n";
        let issues = strict_issues(text, Path::new("spec.md"));

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].token, "test-002");
        assert_eq!(issues[0].location.line, 2);
        assert_eq!(issues[1].token, "T-3");
    }

    #[test]
    fn strict_pass_ignores_plain_prose() {
        assert!(strict_issues("nothing declared here", Path::new("spec.md")).is_empty());
    }

    #[test]
    fn location_carries_the_given_path() {
        let requirements = parse_document("- **TEST-001**: desc", Path::new("docs/api.md"));
        assert_eq!(requirements[0].location().path, PathBuf::from("docs/api.md"));
    }
}
