//! The process-wide table linking requirement identifiers to tests.
//!
//! Lifecycle: a registry is created empty, populated additively during a
//! collection phase (possibly from many threads), frozen into a
//! [`LinkSnapshot`] once collection is known complete, and discarded at the
//! end of the run. The snapshot is the barrier between the write phase and
//! the read phase: no lookups are valid before it is taken. The verifier
//! receives its registry by injection, so a fresh isolated registry can be
//! supplied anywhere the [`global`] one is inappropriate.

use std::{
    collections::HashMap,
    ffi::OsStr,
    fmt,
    path::Path,
    sync::{LazyLock, OnceLock, PoisonError, RwLock},
};

use nonempty::NonEmpty;
use regex::Regex;
use walkdir::WalkDir;

use crate::domain::SpecId;

/// An opaque handle the external test executor understands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestRef(String);

impl TestRef {
    /// Creates a test reference.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An association between one test and the requirement identifiers it
/// declares it verifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestLink {
    spec_ids: NonEmpty<SpecId>,
    test: TestRef,
}

impl TestLink {
    /// The identifiers this test declares it verifies.
    #[must_use]
    pub const fn spec_ids(&self) -> &NonEmpty<SpecId> {
        &self.spec_ids
    }

    /// The executable test handle.
    #[must_use]
    pub const fn test(&self) -> &TestRef {
        &self.test
    }
}

/// Registry of declared test links, safe under concurrent declaration.
///
/// All writes happen during the collection phase; all reads go through a
/// [`LinkSnapshot`].
#[derive(Debug, Default)]
pub struct TestLinkRegistry {
    by_id: RwLock<HashMap<SpecId, Vec<TestLink>>>,
}

impl TestLinkRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that `test` verifies each of `spec_ids`.
    ///
    /// Declaration is additive and idempotent: re-declaring the same
    /// identifiers for the same test reference (for example when a
    /// collection phase is re-run) does not create duplicate entries.
    /// Re-declaring the same test with a different identifier set replaces
    /// the stored link, so the latest declaration wins.
    /// Insertion order carries no meaning; lookups are by identifier.
    pub fn declare(&self, spec_ids: NonEmpty<SpecId>, test: TestRef) {
        let link = TestLink {
            spec_ids: spec_ids.clone(),
            test,
        };

        let mut by_id = self
            .by_id
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        for id in spec_ids.iter() {
            let links = by_id.entry(id.clone()).or_default();
            match links.iter_mut().find(|existing| existing.test == link.test) {
                Some(existing) => {
                    if existing.spec_ids != link.spec_ids {
                        *existing = link.clone();
                    }
                }
                None => links.push(link.clone()),
            }
        }
    }

    /// Freezes the current declarations into a read-only snapshot.
    ///
    /// This is the collection barrier: callers must only take the snapshot
    /// once collection is known complete, and all verification reads go
    /// through the returned value.
    #[must_use]
    pub fn snapshot(&self) -> LinkSnapshot {
        let by_id = self
            .by_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        LinkSnapshot { by_id }
    }
}

/// A frozen, read-only view of declared test links.
#[derive(Debug, Clone, Default)]
pub struct LinkSnapshot {
    by_id: HashMap<SpecId, Vec<TestLink>>,
}

impl LinkSnapshot {
    /// All links declared for an identifier. Empty when nothing was declared.
    #[must_use]
    pub fn lookup(&self, id: &SpecId) -> &[TestLink] {
        self.by_id.get(id).map_or(&[], Vec::as_slice)
    }

    /// The number of identifiers with at least one declared link.
    #[must_use]
    pub fn linked_identifiers(&self) -> usize {
        self.by_id.len()
    }
}

/// The process-wide registry used by in-process declaration sites.
///
/// Created empty on first use and discarded at process end. Prefer passing a
/// registry explicitly; this accessor exists so independent declaration
/// sites need no manual wiring.
pub fn global() -> &'static TestLinkRegistry {
    static GLOBAL: OnceLock<TestLinkRegistry> = OnceLock::new();
    GLOBAL.get_or_init(TestLinkRegistry::new)
}

/// Matches a `// verifies: AUTH-001, AUTH-002` marker comment.
static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*//+\s*verifies:\s*(.+?)\s*$").expect("marker pattern is valid")
});

/// Matches the test function a marker applies to.
static FN_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfn\s+([A-Za-z0-9_]+)").expect("fn pattern is valid")
});

/// Populates a fresh registry from `// verifies:` marker comments in Rust
/// sources under `tests_dir`.
///
/// This is the CLI's collection adapter, not part of the core contract:
/// the same lenient, line-oriented policy as the spec parser applies, so
/// malformed identifiers in a marker are skipped with a debug log and
/// markers with no following function are dropped.
#[must_use]
pub fn scan_directory(tests_dir: &Path) -> TestLinkRegistry {
    let registry = TestLinkRegistry::new();

    let mut paths: Vec<_> = WalkDir::new(tests_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension() == Some(OsStr::new("rs")))
        .map(walkdir::DirEntry::into_path)
        .collect();
    paths.sort();

    for path in paths {
        let Ok(text) = std::fs::read_to_string(&path) else {
            tracing::debug!("Failed to read test source {}", path.display());
            continue;
        };
        scan_source(&registry, &text, &path);
    }

    registry
}

fn scan_source(registry: &TestLinkRegistry, text: &str, path: &Path) {
    let mut pending: Vec<SpecId> = Vec::new();

    for (index, line) in text.lines().enumerate() {
        if let Some(captures) = MARKER.captures(line) {
            let list = captures.get(1).map_or("", |m| m.as_str());
            for token in list.split([',', ' ']).filter(|t| !t.is_empty()) {
                match token.parse::<SpecId>() {
                    Ok(id) => pending.push(id),
                    Err(e) => tracing::debug!(
                        "Skipping malformed identifier '{token}' in marker at {}:{}: {e}",
                        path.display(),
                        index + 1
                    ),
                }
            }
            continue;
        }

        if pending.is_empty() {
            continue;
        }

        if let Some(captures) = FN_NAME.captures(line) {
            let name = captures.get(1).map_or("", |m| m.as_str());
            if let Some(ids) = NonEmpty::from_vec(std::mem::take(&mut pending)) {
                registry.declare(ids, TestRef::new(name));
            }
        }
    }
}
