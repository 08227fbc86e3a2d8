//! sqlvein CLI - SQL data lineage analysis tool

mod args;
mod config;
mod output;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde_json::Value;
use sqlvein_core::{
    analyze_with_validator, check_consistency, AnalyzeError, AstDocument, IndexDocument, Lineage,
    Normalizer, ObjectType, SchemaValidator, SqlFlavor,
};

use crate::args::{Args, Command, OutputFormat};
use crate::config::Config;
use crate::output::ReportFormatter;

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing; -v raises the level, RUST_LOG still wins
    let default_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<bool> {
    let quiet = args.quiet;

    match args.command {
        Command::Analyze {
            index,
            ast,
            output,
            flavor,
            config: config_path,
            schema_dir,
            format,
        } => {
            // Load configuration
            let config = if let Some(path) = config_path {
                // Load from specified path
                Config::from_file(&path)?
            } else {
                // Try to find sqlvein.toml
                Config::find_and_load()?.unwrap_or_default()
            };

            // Merge CLI args with config (CLI takes precedence)
            let config = config.merge_with_args(&index, &ast, &output, &flavor, &schema_dir, format);

            let Some(index_path) = config.index.as_deref() else {
                miette::bail!("No index document specified. Use --index or configure in sqlvein.toml");
            };
            let Some(ast_path) = config.ast.as_deref() else {
                miette::bail!("No AST document specified. Use --ast or configure in sqlvein.toml");
            };
            let Some(output_path) = config.output.as_deref() else {
                miette::bail!("No output path specified. Use --output or configure in sqlvein.toml");
            };

            let flavor = parse_flavor(config.flavor.as_deref())?;
            let formatter = ReportFormatter::new(resolve_format(config.format.as_deref()));
            let validator = load_validator(config.schema_dir.as_deref().map(Path::new))?;

            let index_doc = read_json(Path::new(index_path))?;
            let ast_doc = read_json(Path::new(ast_path))?;

            match analyze_with_validator(&index_doc, &ast_doc, flavor, &validator) {
                Ok(lineage) => {
                    write_lineage(&lineage, Path::new(output_path))?;
                    if !quiet {
                        output::print_summary(&lineage);
                        eprintln!("Lineage written to {}", output_path);
                    }
                    Ok(false)
                }
                Err(
                    error @ (AnalyzeError::Schema { .. } | AnalyzeError::Consistency(_)),
                ) => {
                    formatter.print_failure(&error);
                    Ok(true)
                }
                Err(error) => Err(error).into_diagnostic(),
            }
        }

        Command::Validate {
            index,
            ast,
            flavor,
            schema_dir,
            format,
        } => {
            let flavor: SqlFlavor = flavor.parse().map_err(|e: String| miette::miette!(e))?;
            let formatter = ReportFormatter::new(format);
            let validator = load_validator(schema_dir.as_deref())?;

            let index_value = read_json(&index)?;
            let ast_value = read_json(&ast)?;

            let mut has_errors = false;
            for result in [
                validator.validate_index(&index_value),
                validator.validate_ast(&ast_value),
            ] {
                if let Err(error) = result {
                    formatter.print_failure(&error);
                    has_errors = true;
                }
            }

            // Name consistency is only meaningful on schema-valid documents
            if !has_errors {
                let index_doc = IndexDocument::from_value(&index_value).into_diagnostic()?;
                let ast_doc = AstDocument::from_value(&ast_value).into_diagnostic()?;
                let report = check_consistency(&index_doc, &ast_doc, &Normalizer::new(flavor));
                if !report.is_consistent() {
                    formatter.print_failure(&AnalyzeError::Consistency(report));
                    has_errors = true;
                }
            }

            if !has_errors && !quiet {
                eprintln!("index and AST documents passed validation");
            }
            Ok(has_errors)
        }

        Command::Inspect { file } => {
            let value = read_json(&file)?;
            let lineage: Lineage = serde_json::from_value(value)
                .into_diagnostic()
                .wrap_err_with(|| format!("{} is not a lineage document", file.display()))?;

            output::print_summary(&lineage);
            for (label, object_type) in [
                ("Tables:", ObjectType::Table),
                ("Procedures:", ObjectType::Procedure),
                ("Functions:", ObjectType::Function),
                ("Triggers:", ObjectType::Trigger),
            ] {
                println!("\n{}", label);
                output::print_objects(&lineage, object_type);
            }

            Ok(false)
        }
    }
}

fn parse_flavor(flavor: Option<&str>) -> Result<SqlFlavor> {
    match flavor {
        Some(s) => s.parse().map_err(|e: String| miette::miette!(e)),
        None => Ok(SqlFlavor::default()),
    }
}

fn resolve_format(format: Option<&str>) -> OutputFormat {
    match format {
        Some("json") => OutputFormat::Json,
        _ => OutputFormat::Human,
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("could not read {}", path.display()))?;
    serde_json::from_str(&content)
        .into_diagnostic()
        .wrap_err_with(|| format!("{} is not valid JSON", path.display()))
}

/// Write the lineage document; nothing is written unless analysis and
/// output validation already succeeded
fn write_lineage(lineage: &Lineage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .into_diagnostic()
                .wrap_err_with(|| format!("could not create {}", parent.display()))?;
        }
    }
    let text = lineage.to_pretty_json().into_diagnostic()?;
    fs::write(path, text)
        .into_diagnostic()
        .wrap_err_with(|| format!("could not write {}", path.display()))
}

fn load_validator(schema_dir: Option<&Path>) -> Result<SchemaValidator> {
    match schema_dir {
        Some(dir) => {
            let read = |name: &str| -> Result<String> {
                let path = dir.join(name);
                fs::read_to_string(&path)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("could not read schema {}", path.display()))
            };
            SchemaValidator::from_sources(
                &read("index.schema.json")?,
                &read("ast.schema.json")?,
                &read("lineage.schema.json")?,
            )
            .into_diagnostic()
        }
        None => SchemaValidator::from_embedded().into_diagnostic(),
    }
}
