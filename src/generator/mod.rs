//! # Generator Module
//!
//! Turns a validated project model into a TypeScript backend tree.
//!
//! ## Architecture
//!
//! ```text
//! Model → EntityPipeline (per entity, rayon) → poison → support/integration/
//!       standalone worker/module artifacts → assemble → FileTree → write_to
//! ```
//!
//! 1. **Pipelines** ([`EntityPipeline`]) resolve type tokens, compile the
//!    entity's rules and render its artifacts. A failure stops only that
//!    entity.
//! 2. **Poisoning** ([`poison`]) withdraws the service, controller, workers
//!    and relation-reading enforcers of entities related to a failed one.
//! 3. **Assembly** ([`assemble`]) resolves every logical import to a relative
//!    module specifier and refuses the whole tree if any import points at a
//!    withheld or missing artifact.
//! 4. **Write-out** ([`FileTree::write_to`]) stages the tree beside the
//!    destination and renames it into place.
//!
//! ## Generated Structure
//!
//! ```text
//! out/
//! ├── app.module.ts                # createApplication(): wiring of everything below
//! ├── worldbuilder.manifest.json   # path, kind and sha256 of every file
//! ├── runtime/                     # errors, persistence, context, rules, audit, broker
//! ├── entities/<entity>.entity.ts  # record type, zod schemas, storage descriptor
//! ├── integrations/<name>.integration.ts
//! ├── enforcers/<rule>.enforcer.ts
//! ├── auditors/<entity>.auditor.ts
//! ├── services/<entity>.service.ts
//! ├── controllers/<entity>.controller.ts
//! └── workers/<worker>.worker.ts
//! ```
//!
//! ## Templates
//!
//! Askama templates live in `templates/`, one `*.ts.txt` file per artifact
//! kind. Templates render bodies only; import blocks are added during
//! assembly.

mod artifact;
mod assemble;
mod pipeline;
mod project;
mod render;
mod resolve;
mod templates;

pub use artifact::{
    relative_specifier, render_imports, ArtifactKind, ArtifactRef, GeneratedArtifact,
    ImportSource, ImportSpec,
};
pub use assemble::{assemble, AssemblyError, EmittedFile, FileTree, MANIFEST_NAME};
pub use pipeline::{
    planned_artifacts, poison, EntityFailure, EntityOutcome, EntityPipeline, PipelineFailure,
    PipelineState,
};
pub use project::{generate_project, GenerateOptions, GenerationOutcome, Generator, DEFAULT_OUTPUT_DIR};
pub use render::RenderError;
pub use resolve::{resolve_entity, ResolvedEntity, ResolvedField, ResolvedRelation};
