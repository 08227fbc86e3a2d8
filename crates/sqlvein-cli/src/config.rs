//! Configuration file handling

use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for sqlvein
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Index document path
    #[serde(default)]
    pub index: Option<String>,

    /// AST document path
    #[serde(default)]
    pub ast: Option<String>,

    /// Lineage output path
    #[serde(default)]
    pub output: Option<String>,

    /// SQL flavor (tsql, postgresql)
    #[serde(default)]
    pub flavor: Option<String>,

    /// Output format for failure reports (human, json)
    #[serde(default)]
    pub format: Option<String>,

    /// Directory with replacement JSON Schemas
    pub schema_dir: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path).into_diagnostic()?;
        let config: Config = toml::from_str(&contents).into_diagnostic()?;
        Ok(config)
    }

    /// Try to find and load sqlvein.toml in current directory or parent directories
    pub fn find_and_load() -> Result<Option<Self>> {
        let mut current_dir = std::env::current_dir().into_diagnostic()?;

        loop {
            let config_path = current_dir.join("sqlvein.toml");
            if config_path.exists() {
                return Ok(Some(Self::from_file(&config_path)?));
            }

            // Try parent directory
            if !current_dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Merge CLI arguments into configuration
    /// CLI arguments take precedence over config file values
    pub fn merge_with_args(
        mut self,
        index: &Option<PathBuf>,
        ast: &Option<PathBuf>,
        output: &Option<PathBuf>,
        flavor: &Option<String>,
        schema_dir: &Option<PathBuf>,
        format: Option<crate::args::OutputFormat>,
    ) -> Self {
        // CLI args override config file
        if let Some(path) = index {
            self.index = Some(path.display().to_string());
        }

        if let Some(path) = ast {
            self.ast = Some(path.display().to_string());
        }

        if let Some(path) = output {
            self.output = Some(path.display().to_string());
        }

        if flavor.is_some() {
            self.flavor = flavor.clone();
        }

        if schema_dir.is_some() {
            self.schema_dir = schema_dir.as_ref().map(|p| p.display().to_string());
        }

        if let Some(fmt) = format {
            self.format = Some(format!("{:?}", fmt).to_lowercase());
        }

        self
    }
}
