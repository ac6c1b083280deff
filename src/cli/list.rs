use std::path::PathBuf;

use spec_test::{Config, SpecRegistry, VerificationKind};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Verification kind filter at the CLI boundary
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum KindFilter {
    Standard,
    Manual,
    Skip,
    Contract,
}

impl From<KindFilter> for VerificationKind {
    fn from(filter: KindFilter) -> Self {
        match filter {
            KindFilter::Standard => Self::Standard,
            KindFilter::Manual => Self::Manual,
            KindFilter::Skip => Self::Skip,
            KindFilter::Contract => Self::Contract,
        }
    }
}

#[derive(Debug, Default, clap::Parser)]
pub struct List {
    /// Only show requirements with this identifier prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Only show requirements with this verification kind
    #[arg(long)]
    kind: Option<KindFilter>,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

impl List {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let config = Config::load_or_default(&root);
        let registry = SpecRegistry::from_directory(&root.join(config.specs_dir()));

        // CLI boundary: prefixes are matched case-insensitively.
        let prefix_filter = self.prefix.as_deref().map(str::to_uppercase);
        let kind_filter = self.kind.map(VerificationKind::from);

        let requirements: Vec<_> = registry
            .all()
            .filter(|requirement| {
                prefix_filter
                    .as_deref()
                    .is_none_or(|prefix| requirement.id().prefix() == prefix)
            })
            .filter(|requirement| kind_filter.is_none_or(|kind| requirement.kind() == kind))
            .collect();

        match self.output {
            OutputFormat::Table => {
                if requirements.is_empty() {
                    println!("No requirements found.");
                    return Ok(());
                }

                for requirement in &requirements {
                    println!(
                        "{:<12} {:<9} {}  {}",
                        requirement.id().to_string(),
                        requirement.kind().to_string(),
                        requirement.description(),
                        requirement.location().to_string().dim()
                    );
                }
                println!("\n{} requirements", requirements.len());
            }
            OutputFormat::Json => {
                use serde_json::json;

                let items: Vec<_> = requirements
                    .iter()
                    .map(|requirement| {
                        json!({
                            "id": requirement.id().to_string(),
                            "kind": requirement.kind().to_string(),
                            "description": requirement.description(),
                            "location": requirement.location().to_string(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&json!(items))?);
            }
        }

        Ok(())
    }
}
