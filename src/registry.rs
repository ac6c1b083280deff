//! Aggregation of requirements from multiple sources.
//!
//! The [`SpecRegistry`] is rebuilt from scratch on every verification run.
//! Duplicate identifiers are collected as diagnostics rather than aborting,
//! so a single bad file never blocks visibility into the rest of the specs.

use std::{collections::BTreeMap, ffi::OsStr, path::{Path, PathBuf}};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use walkdir::WalkDir;

use crate::{
    domain::{Requirement, SpecId},
    parser::{self, ParseIssue},
    report::Diagnostic,
};

/// The full set of requirements known to one verification run, keyed and
/// iterated in identifier order.
#[derive(Debug, Default)]
pub struct SpecRegistry {
    by_id: BTreeMap<SpecId, Requirement>,
    diagnostics: Vec<Diagnostic>,
}

impl SpecRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingests a batch of requirements.
    ///
    /// Identifier shape is guaranteed by the [`SpecId`] type, so ingestion
    /// only has to reconcile identity: when an identifier is already present
    /// the first occurrence wins and the conflict is collected as a
    /// [`Diagnostic::DuplicateIdentifier`] carrying both source locations.
    /// Callers decide whether collected duplicates are fatal.
    pub fn add(&mut self, requirements: Vec<Requirement>) {
        for requirement in requirements {
            if let Some(existing) = self.by_id.get(requirement.id()) {
                self.diagnostics.push(Diagnostic::DuplicateIdentifier {
                    id: requirement.id().clone(),
                    first: existing.location().clone(),
                    second: requirement.location().clone(),
                });
                continue;
            }
            self.by_id.insert(requirement.id().clone(), requirement);
        }
    }

    /// Looks up a requirement by identifier.
    #[must_use]
    pub fn get(&self, id: &SpecId) -> Option<&Requirement> {
        self.by_id.get(id)
    }

    /// Iterates all requirements in identifier order.
    pub fn all(&self) -> impl Iterator<Item = &Requirement> {
        self.by_id.values()
    }

    /// The number of distinct requirements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the registry holds no requirements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Structural problems collected while building the registry.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Builds a registry from every markdown file under `specs_dir`.
    ///
    /// Files are discovered recursively; names starting with `_` are
    /// reserved for internal use and skipped. Files are parsed in parallel,
    /// then folded in path order so duplicate resolution is deterministic
    /// regardless of discovery order. Unreadable files are collected as
    /// [`Diagnostic::UnreadableFile`] and the rest of the run proceeds.
    #[must_use]
    pub fn from_directory(specs_dir: &Path) -> Self {
        let paths = collect_markdown_paths(specs_dir);

        let mut parsed: Vec<(PathBuf, Result<Vec<Requirement>, String>)> = paths
            .par_iter()
            .map(|path| {
                let outcome = std::fs::read_to_string(path)
                    .map(|text| parser::parse_document(&text, path))
                    .map_err(|e| e.to_string());
                (path.clone(), outcome)
            })
            .collect();
        parsed.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut registry = Self::new();
        for (path, outcome) in parsed {
            match outcome {
                Ok(requirements) => registry.add(requirements),
                Err(message) => {
                    tracing::debug!("Failed to read spec file {}: {message}", path.display());
                    registry
                        .diagnostics
                        .push(Diagnostic::UnreadableFile { path, message });
                }
            }
        }

        tracing::debug!(
            "Loaded {} requirements from {}",
            registry.len(),
            specs_dir.display()
        );
        registry
    }
}

/// Runs the strict validation pass over every markdown file under
/// `specs_dir`, reporting declaration-shaped lines with malformed
/// identifiers. Unreadable files are skipped here; [`SpecRegistry::from_directory`]
/// already collects them.
#[must_use]
pub fn strict_scan(specs_dir: &Path) -> Vec<ParseIssue> {
    let mut paths = collect_markdown_paths(specs_dir);
    paths.sort();

    paths
        .iter()
        .filter_map(|path| std::fs::read_to_string(path).ok().map(|text| (path, text)))
        .flat_map(|(path, text)| parser::strict_issues(&text, path))
        .collect()
}

fn collect_markdown_paths(specs_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(specs_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension() == Some(OsStr::new("md")))
        .filter(|entry| {
            !entry
                .file_name()
                .to_string_lossy()
                .starts_with('_')
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}
