use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use crate::config::load_effective_config;
use crate::error::GenerateError;
use crate::generator::{generate_project, resolve_entity, GenerateOptions};
use crate::spec::{load_spec, validate};
use crate::validator::print_issues;

/// Command-line interface for Worldbuilder
#[derive(Parser, Debug)]
#[command(name = "worldbuilder-gen")]
#[command(about = "Generate a TypeScript backend from a project spec", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Log at debug level unless WORLDBUILDER_LOG_LEVEL is set
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the backend source tree from a project spec
    Generate {
        /// Path to the project specification (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Output directory (default: `[output] dir`, then generated/{slug})
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace an existing output directory
        #[arg(short, long, default_value_t = false)]
        force: bool,

        /// Show the files that would be written without writing them
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Abort when any entity fails instead of emitting the rest
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Run entity pipelines one after another
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Path to worldbuilder.toml
        /// If not provided, will auto-detect alongside the project spec
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a project spec and report every issue found
    Validate {
        /// Path to the project specification (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Path to worldbuilder.toml, used to check field types against the
        /// configured type tables
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Execute a parsed command.
///
/// # Errors
///
/// Returns an error if the project spec cannot be loaded, fails validation, or
/// generation aborts. Entities that fail without aborting are reported on
/// stdout and do not make the call fail.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate {
            spec,
            output,
            force,
            dry_run,
            strict,
            sequential,
            config,
        } => {
            let mut config = load_effective_config(config.as_deref(), &spec)?;
            if sequential {
                config.generation.parallel = false;
            }
            debug!(?config, "effective configuration");

            let options = GenerateOptions {
                output,
                force,
                dry_run,
                strict,
            };
            match generate_project(&spec, &options, config) {
                Ok(_) => Ok(()),
                Err(e) => {
                    report_generate_error(&e);
                    Err(e)
                }
            }
        }
        Commands::Validate { spec, config } => {
            let config = load_effective_config(config.as_deref(), &spec)?;
            let project = load_spec(&spec)?;
            let model = match validate(&project) {
                Ok(model) => model,
                Err(e) => {
                    print_issues(&e.0);
                    return Err(e.into());
                }
            };

            let tables = config.type_tables()?;
            let mut unresolved = 0;
            for entity in &model.entities {
                if let Err(e) = resolve_entity(entity, &tables) {
                    unresolved += 1;
                    warn!(entity = %entity.name, error = %e, "type resolution failed");
                    println!("⚠️  {}: {e}", entity.name);
                }
            }

            println!(
                "✅ {} is valid: {} entit(y/ies), {} rule(s), {} worker(s), {} integration(s)",
                spec.display(),
                model.entities.len(),
                model.rules.len(),
                model.workers.len(),
                model.integrations.len()
            );
            if unresolved > 0 {
                bail!("{unresolved} entit(y/ies) use types the configured tables cannot resolve");
            }
            Ok(())
        }
    }
}

fn report_generate_error(e: &anyhow::Error) {
    match e.downcast_ref::<GenerateError>() {
        Some(GenerateError::SpecValidation(validation)) => print_issues(&validation.0),
        Some(GenerateError::StrictFailure(failures)) => {
            eprintln!("\n❌ Strict mode: {} entit(y/ies) failed\n", failures.len());
            for failure in failures {
                eprintln!("   {failure}");
            }
        }
        Some(GenerateError::Assembly(errors)) => {
            eprintln!("\n❌ Nothing was written. {} assembly error(s):\n", errors.len());
            for error in errors {
                eprintln!("   {error}");
            }
        }
        None => {}
    }
}
