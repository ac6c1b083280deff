use std::path::{Path, PathBuf};

mod check;
mod list;
mod terminal;
mod verify;

use check::Check;
use clap::ArgAction;
use list::List;
use spec_test::SpecId;
use tracing::instrument;
use verify::Verify;

/// Parse a requirement identifier from a string, normalizing to uppercase.
///
/// This is a CLI boundary function that accepts lowercase input
/// and normalizes it before parsing.
fn parse_spec_id(s: &str) -> Result<SpecId, String> {
    let uppercase = s.to_uppercase();
    uppercase.parse().map_err(|e| format!("{e}"))
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the project root
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Verify(Verify::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Verify every requirement against its linked tests (default)
    Verify(Verify),

    /// Verify a single requirement by identifier
    Check(Check),

    /// List declared requirements
    List(List),

    /// Initialize a new specification repository
    Init,

    /// Show or modify configuration settings
    Config(Config),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Verify(command) => command.run(root)?,
            Self::Check(command) => command.run(root)?,
            Self::List(command) => command.run(root)?,
            Self::Init => Init::run(&root)?,
            Self::Config(command) => command.run(&root)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {}

impl Init {
    #[instrument]
    fn run(root: &PathBuf) -> anyhow::Result<()> {
        use std::fs;

        let config_dir = root.join(".spec-test");
        if config_dir.exists() {
            anyhow::bail!("Repository already initialized (found existing .spec-test directory)");
        }

        fs::create_dir_all(&config_dir)
            .map_err(|e| anyhow::anyhow!("Failed to create .spec-test directory: {e}"))?;

        let config = spec_test::Config::default();
        let config_path = spec_test::Config::path_for(root);
        config
            .save(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to create config.toml: {e}"))?;

        let specs_dir = root.join(config.specs_dir());
        fs::create_dir_all(&specs_dir)
            .map_err(|e| anyhow::anyhow!("Failed to create specifications directory: {e}"))?;

        let example = specs_dir.join("example.md");
        if !example.exists() {
            fs::write(
                &example,
                "# Example Specification\n\n\
                 - **EXAMPLE-001**: The system does something observable\n\
                 - **EXAMPLE-002** [manual]: An operator confirms the behaviour by hand\n\
                 - **EXAMPLE-003** [SKIP]: A retired requirement kept for reference\n",
            )
            .map_err(|e| anyhow::anyhow!("Failed to create example specification: {e}"))?;
        }

        println!("Initialized specification repository in {}", root.display());
        println!("  Created: .spec-test/config.toml");
        println!("  Created: {}", example.display());
        println!();
        println!("Next steps:");
        println!("  spec-test list");
        println!("  spec-test verify");

        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Debug, clap::Parser)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,

        /// Value to set
        value: String,
    },
}

impl Config {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let config_path = spec_test::Config::path_for(root);

        match self.command {
            ConfigCommand::Show => {
                let config = spec_test::Config::load_or_default(root);

                println!("Configuration:");
                println!("  specs_dir: {}", config.specs_dir().display());
                println!("  tests_dir: {}", config.tests_dir().display());
                println!("  runner: {}", config.runner());
                println!("  strict: {}", config.strict);
            }
            ConfigCommand::Set { key, value } => {
                let mut config = spec_test::Config::load_or_default(root);

                match key.as_str() {
                    "specs_dir" => config.set_specs_dir(PathBuf::from(&value)),
                    "tests_dir" => config.set_tests_dir(PathBuf::from(&value)),
                    "runner" => config.set_runner(value.clone()),
                    "strict" => {
                        config.strict = value
                            .parse::<bool>()
                            .map_err(|_| anyhow::anyhow!("Value must be 'true' or 'false'"))?;
                    }
                    _ => {
                        return Err(anyhow::anyhow!(
                            "Unknown configuration key: '{key}'\nSupported keys: specs_dir, \
                             tests_dir, runner, strict",
                        ));
                    }
                }

                config
                    .save(&config_path)
                    .map_err(|e| anyhow::anyhow!("{e}"))?;
                println!("Set {key} = {value}");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn parse_spec_id_normalizes_case() {
        let id = parse_spec_id("auth-001").unwrap();
        assert_eq!(id.to_string(), "AUTH-001");
    }

    #[test]
    fn parse_spec_id_rejects_malformed_input() {
        assert!(parse_spec_id("not an id").is_err());
    }

    #[test]
    fn init_creates_config_and_example_spec() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();

        Init::run(&root).expect("init should succeed on an empty directory");

        assert!(root.join(".spec-test/config.toml").exists());
        assert!(root.join("docs/specs/example.md").exists());
    }

    #[test]
    fn init_refuses_to_reinitialize() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();

        Init::run(&root).unwrap();
        assert!(Init::run(&root).is_err());
    }

    #[test]
    fn config_set_round_trips_through_show() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();

        let set = Config {
            command: ConfigCommand::Set {
                key: "runner".to_string(),
                value: "cargo nextest run {test}".to_string(),
            },
        };
        set.run(&root).expect("set should succeed");

        let config = spec_test::Config::load_or_default(&root);
        assert_eq!(config.runner(), "cargo nextest run {test}");
    }

    #[test]
    fn config_set_rejects_unknown_key() {
        let tmp = tempdir().unwrap();

        let set = Config {
            command: ConfigCommand::Set {
                key: "unknown".to_string(),
                value: "value".to_string(),
            },
        };
        assert!(set.run(tmp.path()).is_err());
    }
}
