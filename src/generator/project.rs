use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{error, info, warn};

use super::artifact::{ArtifactRef, GeneratedArtifact};
use super::assemble::{assemble, AssemblyError, FileTree};
use super::pipeline::{poison, EntityFailure, EntityOutcome, EntityPipeline};
use super::render::{self, RenderError};
use crate::config::GeneratorConfig;
use crate::error::GenerateError;
use crate::naming::TypeTables;
use crate::spec::{load_spec, validate, Entity, Model, ProjectSpec};

/// Output directory used when neither `--output` nor `[output] dir` is set.
pub const DEFAULT_OUTPUT_DIR: &str = "generated";

/// Result of a run that produced a consistent tree.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub tree: FileTree,
    /// Entities, or parts of them, left out of `tree`.
    pub failures: Vec<EntityFailure>,
}

/// Turns a project spec into a file tree. Holds no state between runs.
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
    tables: TypeTables,
    strict: bool,
}

fn render_abort(e: RenderError) -> GenerateError {
    GenerateError::Assembly(vec![AssemblyError::Render(e)])
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> anyhow::Result<Self> {
        let tables = config.type_tables()?;
        Ok(Generator {
            config,
            tables,
            strict: false,
        })
    }

    pub fn with_tables(mut self, tables: TypeTables) -> Self {
        self.tables = tables;
        self
    }

    /// Abort on any entity failure instead of emitting the rest.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn generate(&self, spec: &ProjectSpec) -> Result<GenerationOutcome, GenerateError> {
        let model = validate(spec)?;
        self.generate_model(&model)
    }

    pub fn generate_model(&self, model: &Model) -> Result<GenerationOutcome, GenerateError> {
        let parallel = self.config.generation.parallel;
        info!(
            project = %model.name,
            entities = model.entities.len(),
            rules = model.rules.len(),
            parallel,
            "generating"
        );

        let run = |entity: &Entity| EntityPipeline::new(model, entity, &self.tables).run();
        let mut outcomes: Vec<EntityOutcome> = if parallel {
            model.entities.par_iter().map(run).collect()
        } else {
            model.entities.iter().map(run).collect()
        };

        let (failures, withheld) = poison(model, &mut outcomes);
        if self.strict && !failures.is_empty() {
            return Err(GenerateError::StrictFailure(failures));
        }

        let mut artifacts: Vec<GeneratedArtifact> =
            render::support_artifacts(&self.config.broker).map_err(render_abort)?;
        for integration in &model.integrations {
            artifacts.push(render::integration_artifact(integration).map_err(render_abort)?);
        }
        for outcome in outcomes {
            artifacts.extend(outcome.artifacts);
        }
        for worker in model.workers.iter().filter(|w| w.entity.is_none()) {
            artifacts.push(render::worker_artifact(worker).map_err(render_abort)?);
        }

        let emitted: BTreeSet<ArtifactRef> =
            artifacts.iter().map(|a| a.reference.clone()).collect();
        artifacts.push(render::module_artifact(model, &emitted).map_err(render_abort)?);

        let tree = assemble(
            artifacts,
            &withheld,
            self.config.generation.header.as_deref(),
        )
        .map_err(|errors| {
            for e in &errors {
                error!(error = %e, "assembly error");
            }
            GenerateError::Assembly(errors)
        })?;

        info!(
            files = tree.len(),
            failures = failures.len(),
            "generation finished"
        );
        Ok(GenerationOutcome { tree, failures })
    }
}

/// Options of one `generate` invocation.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub output: Option<PathBuf>,
    pub force: bool,
    pub dry_run: bool,
    pub strict: bool,
}

/// Load, generate and write a project.
///
/// Returns the destination directory. Failed entities are printed but do not
/// fail the call unless `strict` is set.
pub fn generate_project(
    spec_path: &Path,
    options: &GenerateOptions,
    config: GeneratorConfig,
) -> anyhow::Result<PathBuf> {
    let spec = load_spec(spec_path)?;
    let dest = options
        .output
        .clone()
        .or_else(|| config.output.dir.clone())
        .unwrap_or_else(|| Path::new(DEFAULT_OUTPUT_DIR).join(spec.slug()));

    let outcome = Generator::new(config)?
        .strict(options.strict)
        .generate(&spec)?;

    if options.dry_run {
        println!(
            "🔍 Dry run: {} file(s) would be written to {:?}",
            outcome.tree.len(),
            dest
        );
        for file in outcome.tree.files() {
            println!("   {} ({})", file.path, file.kind);
        }
    } else {
        outcome.tree.write_to(&dest, options.force)?;
        println!("✅ Generated {} file(s) at {:?}", outcome.tree.len(), dest);
    }

    for failure in &outcome.failures {
        warn!(entity = %failure.entity, reason = %failure.reason, "entity not generated");
        println!("⚠️  {failure}");
        for artifact in &failure.artifacts {
            println!("     skipped {artifact}");
        }
    }

    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"
name: Notes
entities:
  - name: Note
    fields:
      - { name: body, type: string, required: true }
"#;

    #[test]
    fn test_generate_project_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let spec_path = dir.path().join("notes.yaml");
        std::fs::write(&spec_path, SPEC).unwrap();
        let output = dir.path().join("out");

        let options = GenerateOptions {
            output: Some(output.clone()),
            dry_run: true,
            ..Default::default()
        };
        let dest = generate_project(&spec_path, &options, GeneratorConfig::default()).unwrap();
        assert_eq!(dest, output);
        assert!(!output.exists());
    }

    #[test]
    fn test_generate_project_writes_tree() {
        let dir = tempfile::tempdir().unwrap();
        let spec_path = dir.path().join("notes.yaml");
        std::fs::write(&spec_path, SPEC).unwrap();
        let output = dir.path().join("out");

        let options = GenerateOptions {
            output: Some(output.clone()),
            ..Default::default()
        };
        generate_project(&spec_path, &options, GeneratorConfig::default()).unwrap();
        assert!(output.join("entities/note.entity.ts").is_file());
        assert!(output.join("app.module.ts").is_file());

        assert!(generate_project(&spec_path, &options, GeneratorConfig::default()).is_err());
        let forced = GenerateOptions {
            force: true,
            ..options
        };
        generate_project(&spec_path, &forced, GeneratorConfig::default()).unwrap();
    }
}
