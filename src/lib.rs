//! # Worldbuilder
//!
//! **Worldbuilder** turns a declarative project specification (entities,
//! business rules, integrations and background workers, written in YAML or
//! JSON) into the source tree of a TypeScript backend: zod-validated entity
//! schemas, persistence-backed services, HTTP controllers, rule enforcers,
//! auditors, queue workers and an application module that wires them
//! together.
//!
//! ## Architecture
//!
//! - **[`spec`]** - Loading the raw `ProjectSpec` and validating it into a [`spec::Model`]
//! - **[`naming`]** - Case conversion, pluralisation and the domain type tables
//! - **[`rules`]** - Condition parsing and compilation into enforcer fragments
//! - **[`generator`]** - Per-entity pipelines, poisoning, assembly and write-out
//! - **[`config`]** - `worldbuilder.toml` and environment overrides
//! - **[`cli`]** - The `worldbuilder-gen` command line
//!
//! ### Generation Flow
//!
//! ```text
//! load_spec → validate → EntityPipeline × N → poison → assemble → FileTree::write_to
//! ```
//!
//! Validation collects every issue before failing. Past validation, a
//! failure is contained to the entity that raised it unless another emitted
//! artifact imports what it would have produced, in which case nothing is
//! written.
//!
//! ## Example
//!
//! ```no_run
//! use worldbuilder::{config::GeneratorConfig, load_spec, Generator};
//!
//! let spec = load_spec("tracker.yaml")?;
//! let outcome = Generator::new(GeneratorConfig::default())?.generate(&spec)?;
//! outcome.tree.write_to(std::path::Path::new("generated/tracker"), false)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod naming;
pub mod rules;
pub mod spec;
pub mod validator;

pub use error::{GenerateError, SpecValidationError};
pub use generator::{
    generate_project, FileTree, GenerateOptions, GenerationOutcome, Generator,
};
pub use spec::{load_spec, parse_spec, validate, Model, ProjectSpec};
