//! Per-entity rendering pipeline.
//!
//! Each entity walks `Pending → NamesResolved → RulesAttached → Rendered`,
//! dropping to `Failed` on the first resolver, compiler or render error. A
//! failed entity never stops its siblings; [`poison`] then withdraws the
//! relation-bearing artifacts of entities that point at a failed one.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use super::artifact::{ArtifactRef, GeneratedArtifact};
use super::render::{self, RenderError};
use super::resolve::{resolve_entity, ResolvedEntity};
use crate::naming::{TypeResolutionError, TypeTables};
use crate::rules::{compile_rule, RuleCompilationError, RuleFragment};
use crate::spec::{Entity, Model};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    NamesResolved,
    RulesAttached,
    Rendered,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineState::Pending => "pending",
            PipelineState::NamesResolved => "names_resolved",
            PipelineState::RulesAttached => "rules_attached",
            PipelineState::Rendered => "rendered",
            PipelineState::Failed => "failed",
        })
    }
}

/// Why an entity, or part of it, produced no output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineFailure {
    #[error(transparent)]
    TypeResolution(#[from] TypeResolutionError),
    #[error(transparent)]
    RuleCompilation(#[from] RuleCompilationError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("relation `{relation}` targets failed entity `{target}`")]
    RelationFailed { relation: String, target: String },
}

/// A failure reported to the caller, with the paths it kept out of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFailure {
    pub entity: String,
    pub reason: PipelineFailure,
    pub artifacts: Vec<String>,
}

impl fmt::Display for EntityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.reason)
    }
}

/// Every artifact an entity's pipeline renders when it succeeds.
pub fn planned_artifacts(model: &Model, entity: &Entity) -> Vec<ArtifactRef> {
    let mut planned = vec![render::entity_ref(&entity.name)];
    if entity.flags.auditor {
        planned.push(render::auditor_ref(&entity.name));
    }
    planned.extend(
        model
            .rules_for(&entity.name)
            .map(|r| render::enforcer_ref(&r.name)),
    );
    if entity.flags.service {
        planned.push(render::service_ref(&entity.name));
        if entity.flags.controller {
            planned.push(render::controller_ref(&entity.name));
        }
    }
    planned.extend(
        model
            .workers_for(&entity.name)
            .map(|w| render::worker_ref(&w.name)),
    );
    planned
}

pub struct EntityPipeline<'m> {
    model: &'m Model,
    entity: &'m Entity,
    tables: &'m TypeTables,
    state: PipelineState,
    resolved: Option<ResolvedEntity<'m>>,
    fragments: Vec<RuleFragment>,
    artifacts: Vec<GeneratedArtifact>,
}

impl<'m> EntityPipeline<'m> {
    pub fn new(model: &'m Model, entity: &'m Entity, tables: &'m TypeTables) -> Self {
        EntityPipeline {
            model,
            entity,
            tables,
            state: PipelineState::Pending,
            resolved: None,
            fragments: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn artifacts(&self) -> &[GeneratedArtifact] {
        &self.artifacts
    }

    pub fn resolve_names(&mut self) -> Result<(), PipelineFailure> {
        debug_assert_eq!(self.state, PipelineState::Pending);
        self.resolved = Some(resolve_entity(self.entity, self.tables)?);
        self.state = PipelineState::NamesResolved;
        Ok(())
    }

    pub fn attach_rules(&mut self) -> Result<(), PipelineFailure> {
        debug_assert_eq!(self.state, PipelineState::NamesResolved);
        for rule in self.model.rules_for(&self.entity.name) {
            self.fragments.push(compile_rule(self.model, rule)?);
        }
        self.state = PipelineState::RulesAttached;
        Ok(())
    }

    pub fn render(&mut self) -> Result<(), PipelineFailure> {
        debug_assert_eq!(self.state, PipelineState::RulesAttached);
        let Some(resolved) = &self.resolved else {
            return Err(PipelineFailure::Render(RenderError {
                artifact: render::entity_ref(&self.entity.name).path(),
                message: "names were not resolved".to_string(),
            }));
        };
        let entity = self.entity;

        let mut artifacts = vec![render::entity_artifact(resolved)?];
        if entity.flags.auditor {
            artifacts.push(render::auditor_artifact(entity)?);
        }
        for fragment in &self.fragments {
            artifacts.push(render::enforcer_artifact(fragment)?);
        }
        if entity.flags.service {
            artifacts.push(render::service_artifact(entity)?);
            if entity.flags.controller {
                artifacts.push(render::controller_artifact(entity)?);
            }
        }
        for worker in self.model.workers_for(&entity.name) {
            artifacts.push(render::worker_artifact(worker)?);
        }

        self.artifacts = artifacts;
        self.state = PipelineState::Rendered;
        Ok(())
    }

    fn advance(&mut self) -> Result<(), PipelineFailure> {
        self.resolve_names()?;
        self.attach_rules()?;
        self.render()
    }

    /// Drive the pipeline to `Rendered` or `Failed`.
    pub fn run(mut self) -> EntityOutcome {
        match self.advance() {
            Ok(()) => {
                debug!(
                    entity = %self.entity.name,
                    artifacts = self.artifacts.len(),
                    "entity rendered"
                );
                EntityOutcome {
                    entity: self.entity.name.clone(),
                    state: self.state,
                    artifacts: self.artifacts,
                    fragments: self.fragments,
                    failure: None,
                }
            }
            Err(reason) => {
                warn!(entity = %self.entity.name, stage = %self.state, error = %reason, "entity failed");
                EntityOutcome {
                    entity: self.entity.name.clone(),
                    state: PipelineState::Failed,
                    artifacts: Vec::new(),
                    fragments: Vec::new(),
                    failure: Some(reason),
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntityOutcome {
    pub entity: String,
    pub state: PipelineState,
    pub artifacts: Vec<GeneratedArtifact>,
    pub fragments: Vec<RuleFragment>,
    pub failure: Option<PipelineFailure>,
}

/// Withdraw artifacts that depend on a failed entity and report every
/// failure in spec order.
///
/// A rendered entity with a relation to a failed one loses its service,
/// controller and bound workers, plus each enforcer whose condition reaches
/// into the failed entity. Its schema stays: schemas are generated
/// independently of relation targets. Returns the failures and the
/// references of every planned artifact that was not produced.
pub fn poison(
    model: &Model,
    outcomes: &mut [EntityOutcome],
) -> (Vec<EntityFailure>, BTreeSet<ArtifactRef>) {
    let failed_entities: BTreeSet<String> = outcomes
        .iter()
        .filter(|o| o.state == PipelineState::Failed)
        .map(|o| o.entity.to_ascii_lowercase())
        .collect();

    let mut failures = Vec::new();
    let mut withheld = BTreeSet::new();

    for outcome in outcomes.iter_mut() {
        let Some(entity) = model.entity(&outcome.entity) else {
            continue;
        };

        if let Some(reason) = outcome.failure.clone() {
            let planned = planned_artifacts(model, entity);
            failures.push(EntityFailure {
                entity: outcome.entity.clone(),
                reason,
                artifacts: planned.iter().map(ArtifactRef::path).collect(),
            });
            withheld.extend(planned);
            continue;
        }

        let Some(broken) = entity
            .relations
            .iter()
            .find(|r| failed_entities.contains(&r.target.to_ascii_lowercase()))
        else {
            continue;
        };

        let mut poisoned = BTreeSet::new();
        if entity.flags.service {
            poisoned.insert(render::service_ref(&entity.name));
            poisoned.insert(render::controller_ref(&entity.name));
        }
        for worker in model.workers_for(&entity.name) {
            poisoned.insert(render::worker_ref(&worker.name));
        }
        for fragment in &outcome.fragments {
            if fragment
                .related_entities
                .iter()
                .any(|e| failed_entities.contains(&e.to_ascii_lowercase()))
            {
                poisoned.insert(render::enforcer_ref(&fragment.rule));
            }
        }

        let before = outcome.artifacts.len();
        outcome
            .artifacts
            .retain(|a| !poisoned.contains(&a.reference));
        if outcome.artifacts.len() == before {
            continue;
        }

        warn!(
            entity = %outcome.entity,
            relation = %broken.name,
            target = %broken.target,
            withdrawn = before - outcome.artifacts.len(),
            "relation target failed"
        );
        let withdrawn: Vec<ArtifactRef> = planned_artifacts(model, entity)
            .into_iter()
            .filter(|r| poisoned.contains(r))
            .collect();
        failures.push(EntityFailure {
            entity: outcome.entity.clone(),
            reason: PipelineFailure::RelationFailed {
                relation: broken.name.clone(),
                target: broken.target.clone(),
            },
            artifacts: withdrawn.iter().map(ArtifactRef::path).collect(),
        });
        withheld.extend(withdrawn);
    }

    (failures, withheld)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::DomainType;
    use crate::spec::{parse_spec, validate};

    fn model() -> Model {
        let spec = parse_spec(
            r#"
name: Tracker
entities:
  - name: Project
    fields:
      - { name: budget, type: decimal }
  - name: Task
    fields:
      - { name: title, type: string, required: true }
    relations:
      - { name: project, target: Project }
  - name: Note
    fields:
      - { name: body, type: string }
    generate: { auditor: true }
rules:
  - name: title required
    entity: Task
    trigger: before_create
    kind: constraint
    condition: "title == ''"
    action: { reject: "Title is required" }
workers:
  - name: digest
    queue: digests
    entity: Task
"#,
            true,
        )
        .unwrap();
        validate(&spec).unwrap()
    }

    fn run_all(model: &Model, tables: &TypeTables) -> Vec<EntityOutcome> {
        model
            .entities
            .iter()
            .map(|e| EntityPipeline::new(model, e, tables).run())
            .collect()
    }

    #[test]
    fn test_pipeline_walks_states() {
        let model = model();
        let tables = TypeTables::standard();
        let task = model.entity("Task").unwrap();
        let mut pipeline = EntityPipeline::new(&model, task, &tables);
        assert_eq!(pipeline.state(), PipelineState::Pending);
        pipeline.resolve_names().unwrap();
        assert_eq!(pipeline.state(), PipelineState::NamesResolved);
        pipeline.attach_rules().unwrap();
        assert_eq!(pipeline.state(), PipelineState::RulesAttached);
        pipeline.render().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Rendered);

        let paths: Vec<String> = pipeline.artifacts().iter().map(|a| a.path()).collect();
        assert_eq!(
            paths,
            vec![
                "entities/task.entity.ts",
                "enforcers/title-required.enforcer.ts",
                "services/task.service.ts",
                "controllers/task.controller.ts",
                "workers/digest.worker.ts",
            ]
        );
        let planned: Vec<String> = planned_artifacts(&model, task)
            .iter()
            .map(ArtifactRef::path)
            .collect();
        assert_eq!(planned, paths);
    }

    #[test]
    fn test_unmapped_type_fails_only_owner() {
        let model = model();
        let tables = TypeTables::standard().without_storage(DomainType::Decimal);
        let outcomes = run_all(&model, &tables);
        assert_eq!(outcomes[0].state, PipelineState::Failed);
        assert!(matches!(
            outcomes[0].failure,
            Some(PipelineFailure::TypeResolution(_))
        ));
        assert_eq!(outcomes[1].state, PipelineState::Rendered);
        assert_eq!(outcomes[2].state, PipelineState::Rendered);
    }

    #[test]
    fn test_poison_withdraws_relation_bearing_artifacts() {
        let model = model();
        let tables = TypeTables::standard().without_storage(DomainType::Decimal);
        let mut outcomes = run_all(&model, &tables);
        let (failures, withheld) = poison(&model, &mut outcomes);

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].entity, "Project");
        assert_eq!(failures[1].entity, "Task");
        assert_eq!(
            failures[1].reason,
            PipelineFailure::RelationFailed {
                relation: "project".into(),
                target: "Project".into(),
            }
        );
        assert_eq!(
            failures[1].artifacts,
            vec![
                "services/task.service.ts",
                "controllers/task.controller.ts",
                "workers/digest.worker.ts",
            ]
        );

        let task_paths: Vec<String> = outcomes[1].artifacts.iter().map(|a| a.path()).collect();
        assert_eq!(
            task_paths,
            vec![
                "entities/task.entity.ts",
                "enforcers/title-required.enforcer.ts",
            ]
        );
        assert!(withheld.contains(&render::entity_ref("Project")));
        assert!(withheld.contains(&render::service_ref("Task")));
        assert_eq!(outcomes[2].artifacts.len(), 4);
    }
}
