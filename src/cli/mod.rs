//! # CLI Module
//!
//! Command-line interface of the `worldbuilder-gen` binary.
//!
//! ## Commands
//!
//! - **`generate`** - Validate a project spec and write the TypeScript backend
//! - **`validate`** - Check a project spec without generating anything
//!
//! Both commands load `worldbuilder.toml` from `--config`, or from the
//! directory of the project spec when present, then apply `WORLDBUILDER_*`
//! environment overrides.
//!
//! ## Usage
//!
//! ```bash
//! # Generate into generated/<slug>
//! worldbuilder-gen generate --spec tracker.yaml
//!
//! # Preview the file list
//! worldbuilder-gen generate --spec tracker.yaml --dry-run
//!
//! # Replace an existing output directory, failing on any entity error
//! worldbuilder-gen generate --spec tracker.yaml --output out --force --strict
//!
//! # Validate only
//! worldbuilder-gen validate --spec tracker.yaml
//! ```

mod commands;


pub use commands::{run_cli, Cli, Commands};
