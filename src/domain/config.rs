use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration for a verification run.
///
/// Stored as a versioned TOML file at `.spec-test/config.toml` in the project
/// root. Every key has a default so a missing file is never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Directory searched (recursively) for spec markdown files.
    specs_dir: PathBuf,

    /// Directory searched for test sources carrying link declarations.
    tests_dir: PathBuf,

    /// Command template used to execute a linked test. `{test}` is replaced
    /// with the test reference.
    runner: String,

    /// Whether malformed-looking requirement lines fail verification.
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            specs_dir: default_specs_dir(),
            tests_dir: default_tests_dir(),
            runner: default_runner(),
            strict: false,
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Loads the configuration for a project root, falling back to defaults
    /// when no config file exists.
    #[must_use]
    pub fn load_or_default(root: &Path) -> Self {
        let path = Self::path_for(root);
        Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("Failed to load config: {e}");
            Self::default()
        })
    }

    /// The canonical config file location for a project root.
    #[must_use]
    pub fn path_for(root: &Path) -> PathBuf {
        root.join(".spec-test").join("config.toml")
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or
    /// if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {e}"))?;
        }
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The spec markdown directory, relative to the project root.
    #[must_use]
    pub fn specs_dir(&self) -> &Path {
        &self.specs_dir
    }

    /// The test-source directory, relative to the project root.
    #[must_use]
    pub fn tests_dir(&self) -> &Path {
        &self.tests_dir
    }

    /// The runner command template.
    #[must_use]
    pub fn runner(&self) -> &str {
        &self.runner
    }

    /// Replaces the spec markdown directory.
    pub fn set_specs_dir(&mut self, dir: PathBuf) {
        self.specs_dir = dir;
    }

    /// Replaces the test-source directory.
    pub fn set_tests_dir(&mut self, dir: PathBuf) {
        self.tests_dir = dir;
    }

    /// Replaces the runner command template.
    pub fn set_runner(&mut self, runner: String) {
        self.runner = runner;
    }
}

fn default_specs_dir() -> PathBuf {
    PathBuf::from("docs/specs")
}

fn default_tests_dir() -> PathBuf {
    PathBuf::from("tests")
}

fn default_runner() -> String {
    "cargo test --quiet {test}".to_string()
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the
/// domain type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_specs_dir")]
        specs_dir: PathBuf,

        #[serde(default = "default_tests_dir")]
        tests_dir: PathBuf,

        /// Command template used to execute a linked test.
        #[serde(default = "default_runner")]
        runner: String,

        #[serde(default)]
        strict: bool,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                specs_dir,
                tests_dir,
                runner,
                strict,
            } => Self {
                specs_dir,
                tests_dir,
                runner,
                strict,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            specs_dir: config.specs_dir,
            tests_dir: config.tests_dir,
            runner: config.runner,
            strict: config.strict,
        }
    }
}
