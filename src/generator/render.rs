//! Artifact builders: fill a template and declare the artifacts it imports.

use std::collections::BTreeSet;

use askama::Template;
use thiserror::Error;

use super::artifact::{ArtifactKind, ArtifactRef, GeneratedArtifact, ImportSpec};
use super::resolve::ResolvedEntity;
use super::templates::*;
use crate::config::BrokerConfig;
use crate::naming::{to_camel_case, ts_identifier, ts_string_literal, NameForms};
use crate::rules::{Guard, RuleFragment};
use crate::spec::{Entity, IntegrationContract, Model, RuleAction, Trigger, Worker};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to render {artifact}: {message}")]
pub struct RenderError {
    pub artifact: String,
    pub message: String,
}

fn rendered<T: Template>(
    reference: ArtifactRef,
    template: &T,
    imports: Vec<ImportSpec>,
    owner: Option<&str>,
) -> Result<GeneratedArtifact, RenderError> {
    let body = template.render().map_err(|e| RenderError {
        artifact: reference.path(),
        message: e.to_string(),
    })?;
    Ok(GeneratedArtifact {
        reference,
        body,
        imports,
        owner: owner.map(str::to_string),
    })
}

fn symbols<const N: usize>(names: [&str; N]) -> Vec<String> {
    names.into_iter().map(str::to_string).collect()
}

pub fn entity_ref(entity: &str) -> ArtifactRef {
    ArtifactRef::new(ArtifactKind::Entity, NameForms::of(entity).kebab)
}

pub fn service_ref(entity: &str) -> ArtifactRef {
    ArtifactRef::new(ArtifactKind::Service, NameForms::of(entity).kebab)
}

pub fn controller_ref(entity: &str) -> ArtifactRef {
    ArtifactRef::new(ArtifactKind::Controller, NameForms::of(entity).kebab)
}

pub fn auditor_ref(entity: &str) -> ArtifactRef {
    ArtifactRef::new(ArtifactKind::Auditor, NameForms::of(entity).kebab)
}

pub fn enforcer_ref(rule: &str) -> ArtifactRef {
    ArtifactRef::new(ArtifactKind::Enforcer, NameForms::of(rule).kebab)
}

pub fn integration_ref(integration: &str) -> ArtifactRef {
    ArtifactRef::new(ArtifactKind::Integration, NameForms::of(integration).kebab)
}

pub fn worker_ref(worker: &str) -> ArtifactRef {
    ArtifactRef::new(ArtifactKind::Worker, NameForms::of(worker).kebab)
}

fn enforcer_class(rule: &str) -> String {
    format!("{}Enforcer", NameForms::of(rule).upper_camel)
}

fn integration_type(integration: &str) -> String {
    format!("{}Integration", NameForms::of(integration).upper_camel)
}

fn integration_stub(integration: &str) -> String {
    format!("Unimplemented{}Integration", NameForms::of(integration).upper_camel)
}

fn worker_class(worker: &str) -> String {
    format!("{}Worker", NameForms::of(worker).upper_camel)
}

/// Runtime modules every generated tree carries.
pub fn support_artifacts(broker: &BrokerConfig) -> Result<Vec<GeneratedArtifact>, RenderError> {
    let errors = ArtifactRef::support("errors");
    let context = ArtifactRef::support("context");
    Ok(vec![
        rendered(errors.clone(), &ErrorsTemplate, vec![], None)?,
        rendered(
            ArtifactRef::support("persistence"),
            &PersistenceTemplate,
            vec![],
            None,
        )?,
        rendered(context.clone(), &ContextTemplate, vec![], None)?,
        rendered(
            ArtifactRef::support("rules"),
            &RulesTemplate {
                triggers: Trigger::ALL.iter().map(Trigger::as_str).collect(),
            },
            vec![
                ImportSpec::values(errors.clone(), symbols(["RuleViolationError"])),
                ImportSpec::types(context.clone(), symbols(["CallerContext"])),
            ],
            None,
        )?,
        rendered(
            ArtifactRef::support("audit"),
            &AuditTemplate,
            vec![ImportSpec::types(context, symbols(["CallerContext"]))],
            None,
        )?,
        rendered(
            ArtifactRef::support("broker"),
            &BrokerTemplate {
                endpoint_env: ts_string_literal(&broker.endpoint_env),
                probe_timeout_ms: broker.probe_timeout_ms,
            },
            vec![ImportSpec::values(errors, symbols(["JobCancelledError"]))],
            None,
        )?,
    ])
}

/// Type-only imports of the entities `targets` names, skipping `owner`.
fn related_entity_types<'a>(
    owner: &str,
    targets: impl IntoIterator<Item = &'a str>,
) -> Vec<ImportSpec> {
    let owner = NameForms::of(owner).upper_camel;
    let mut seen = BTreeSet::new();
    targets
        .into_iter()
        .map(NameForms::of)
        .filter(|t| t.upper_camel != owner && seen.insert(t.upper_camel.clone()))
        .map(|t| {
            ImportSpec::types(
                ArtifactRef::new(ArtifactKind::Entity, t.kebab),
                [t.upper_camel],
            )
        })
        .collect()
}

pub fn entity_artifact(resolved: &ResolvedEntity<'_>) -> Result<GeneratedArtifact, RenderError> {
    let names = &resolved.names;
    let mut enums = Vec::new();
    let mut props = vec![PropView {
        name: "id".to_string(),
        ts_type: "string".to_string(),
        optional: false,
    }];
    let mut schema = Vec::new();
    let mut columns = vec![ColumnView {
        name: "id".to_string(),
        descriptor: format!(
            "{{ type: {}, primary: true }}",
            ts_string_literal(&resolved.key_storage)
        ),
    }];

    for field in &resolved.fields {
        if let Some((const_name, type_name)) = &field.enum_names {
            enums.push(EnumView {
                const_name: const_name.clone(),
                type_name: type_name.clone(),
                values: field
                    .field
                    .enum_values()
                    .iter()
                    .map(|v| ts_string_literal(v))
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        props.push(PropView {
            name: field.prop.clone(),
            ts_type: field.ts_type(),
            optional: !field.field.is_present(),
        });
        schema.push(SchemaEntryView {
            name: field.prop.clone(),
            expr: field.schema_expr(),
        });
        columns.push(ColumnView {
            name: field.prop.clone(),
            descriptor: field.column(),
        });
    }

    for relation in &resolved.relations {
        let target = &relation.target.upper_camel;
        match &relation.fk_prop {
            Some(fk) => {
                props.push(PropView {
                    name: fk.clone(),
                    ts_type: "string | null".to_string(),
                    optional: true,
                });
                props.push(PropView {
                    name: relation.prop.clone(),
                    ts_type: format!("{target} | null"),
                    optional: true,
                });
                schema.push(SchemaEntryView {
                    name: fk.clone(),
                    expr: format!("{}.nullable().optional()", resolved.key_validation),
                });
                columns.push(ColumnView {
                    name: fk.clone(),
                    descriptor: format!(
                        "{{ type: {}, nullable: true, references: {} }}",
                        ts_string_literal(&resolved.key_storage),
                        ts_string_literal(&relation.target.plural_snake())
                    ),
                });
            }
            None => props.push(PropView {
                name: relation.prop.clone(),
                ts_type: format!("{target}[]"),
                optional: true,
            }),
        }
    }

    let mut imports = vec![ImportSpec::package("zod", &["z"])];
    imports.extend(related_entity_types(
        &resolved.entity.name,
        resolved.entity.relations.iter().map(|r| r.target.as_str()),
    ));

    let template = EntityTemplate {
        name: names.upper_camel.clone(),
        enums,
        props,
        schema,
        constant: names.constant(),
        table: names.plural_snake(),
        columns,
    };
    rendered(
        entity_ref(&resolved.entity.name),
        &template,
        imports,
        Some(&resolved.entity.name),
    )
}

/// Relations a service resolves through the foreign key it stores.
pub fn loaders(entity: &Entity) -> Vec<LoaderView> {
    entity
        .relations
        .iter()
        .filter(|r| r.kind.owns_foreign_key())
        .map(|r| {
            let prop = to_camel_case(&r.name);
            let target = NameForms::of(&r.target);
            LoaderView {
                fk_prop: format!("{prop}Id"),
                prop,
                table: target.plural_snake(),
                type_name: target.upper_camel,
            }
        })
        .collect()
}

pub fn service_artifact(entity: &Entity) -> Result<GeneratedArtifact, RenderError> {
    let name = NameForms::of(&entity.name).upper_camel;
    let loaders = loaders(entity);

    let mut imports = vec![
        ImportSpec::types(entity_ref(&entity.name), [name.clone()]),
        ImportSpec::values(
            entity_ref(&entity.name),
            [format!("{name}Schema"), format!("{name}UpdateSchema")],
        ),
        ImportSpec::types(
            ArtifactRef::support("persistence"),
            symbols(["FindManyOptions", "PersistenceCapability"]),
        ),
        ImportSpec::types(ArtifactRef::support("context"), symbols(["CallerContext"])),
        ImportSpec::values(ArtifactRef::support("rules"), symbols(["RuleSet"])),
        ImportSpec::values(
            ArtifactRef::support("errors"),
            symbols(["NotFoundError", "ValidationFailedError"]),
        ),
    ];
    if entity.flags.auditor {
        imports.push(ImportSpec::types(
            auditor_ref(&entity.name),
            [format!("{name}Auditor")],
        ));
    }
    imports.extend(related_entity_types(
        &entity.name,
        entity
            .relations
            .iter()
            .filter(|r| r.kind.owns_foreign_key())
            .map(|r| r.target.as_str()),
    ));

    let template = ServiceTemplate {
        name,
        has_loaders: !loaders.is_empty(),
        loaders,
        has_auditor: entity.flags.auditor,
    };
    rendered(service_ref(&entity.name), &template, imports, Some(&entity.name))
}

pub fn controller_artifact(entity: &Entity) -> Result<GeneratedArtifact, RenderError> {
    let names = NameForms::of(&entity.name);
    let name = names.upper_camel.clone();
    let imports = vec![
        ImportSpec::types(service_ref(&entity.name), [format!("{name}Service")]),
        ImportSpec::types(entity_ref(&entity.name), [name.clone()]),
        ImportSpec::types(
            ArtifactRef::support("context"),
            symbols(["RouteDefinition", "RouteRequest"]),
        ),
        ImportSpec::values(ArtifactRef::support("context"), symbols(["pageOptions"])),
    ];
    let template = ControllerTemplate {
        base_path: format!("/{}", names.plural_kebab()),
        name,
    };
    rendered(controller_ref(&entity.name), &template, imports, Some(&entity.name))
}

pub fn auditor_artifact(entity: &Entity) -> Result<GeneratedArtifact, RenderError> {
    let name = NameForms::of(&entity.name).upper_camel;
    let imports = vec![
        ImportSpec::types(
            ArtifactRef::support("audit"),
            symbols(["AuditAction", "AuditSink", "Auditor"]),
        ),
        ImportSpec::types(ArtifactRef::support("context"), symbols(["CallerContext"])),
        ImportSpec::types(entity_ref(&entity.name), [name.clone()]),
    ];
    rendered(
        auditor_ref(&entity.name),
        &AuditorTemplate { name },
        imports,
        Some(&entity.name),
    )
}

pub fn enforcer_artifact(fragment: &RuleFragment) -> Result<GeneratedArtifact, RenderError> {
    let entity = NameForms::of(&fragment.entity).upper_camel;
    let mut imports = vec![
        ImportSpec::types(ArtifactRef::support("rules"), symbols(["RuleEnforcer"])),
        ImportSpec::types(ArtifactRef::support("context"), symbols(["CallerContext"])),
        ImportSpec::types(entity_ref(&fragment.entity), [entity.clone()]),
    ];

    let mut template = EnforcerTemplate {
        class_name: enforcer_class(&fragment.rule),
        entity,
        rule_literal: ts_string_literal(&fragment.rule),
        trigger: fragment.trigger.as_str(),
        binding: fragment.binding,
        caller_param: "_caller",
        invoke: None,
        reject_message: None,
        capability: None,
        denied_message: String::new(),
        has_predicate: false,
        predicate_or_true: "true".to_string(),
    };
    let message = fragment.message.as_deref().map(ts_string_literal);

    let predicate = match &fragment.guard {
        Guard::Reject { predicate } => {
            imports.push(ImportSpec::values(
                ArtifactRef::support("errors"),
                symbols(["RuleViolationError"]),
            ));
            template.reject_message = message;
            Some(predicate)
        }
        Guard::Require {
            predicate,
            capability,
        } => {
            imports.push(ImportSpec::values(
                ArtifactRef::support("context"),
                symbols(["hasCapability"]),
            ));
            imports.push(ImportSpec::values(
                ArtifactRef::support("errors"),
                symbols(["PermissionDeniedError"]),
            ));
            template.caller_param = "caller";
            template.capability = Some(ts_string_literal(capability));
            template.denied_message = message.unwrap_or_else(|| "'Permission denied'".to_string());
            predicate.as_ref()
        }
        Guard::Invoke {
            predicate,
            integration,
            method,
            args,
        } => {
            let type_name = integration_type(integration);
            imports.push(ImportSpec::types(
                integration_ref(integration),
                [type_name.clone()],
            ));
            template.invoke = Some(InvokeView {
                field: to_camel_case(integration),
                type_name,
                method: ts_identifier(&to_camel_case(method)),
                args: args
                    .iter()
                    .map(|a| a.expression.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
            predicate.as_ref()
        }
    };
    if let Some(predicate) = predicate {
        template.has_predicate = true;
        template.predicate_or_true = predicate.clone();
    }

    rendered(
        enforcer_ref(&fragment.rule),
        &template,
        imports,
        Some(&fragment.entity),
    )
}

pub fn integration_artifact(
    integration: &IntegrationContract,
) -> Result<GeneratedArtifact, RenderError> {
    let names = NameForms::of(&integration.name);
    let methods = integration
        .methods
        .iter()
        .map(|m| {
            let params: Vec<(String, &str)> = m
                .params
                .iter()
                .map(|(name, ty)| (ts_identifier(&to_camel_case(name)), ty.ts_type()))
                .collect();
            MethodView {
                name: ts_identifier(&to_camel_case(&m.name)),
                params: params
                    .iter()
                    .map(|(name, ty)| format!("{name}: {ty}"))
                    .collect::<Vec<_>>()
                    .join(", "),
                stub_params: params
                    .iter()
                    .map(|(name, ty)| format!("_{name}: {ty}"))
                    .collect::<Vec<_>>()
                    .join(", "),
                returns: m.returns.map_or("void", |t| t.ts_type()).to_string(),
            }
        })
        .collect();

    let template = IntegrationTemplate {
        constant: names.constant(),
        category_literal: ts_string_literal(&integration.category),
        type_name: integration_type(&integration.name),
        stub_name: integration_stub(&integration.name),
        name_literal: ts_string_literal(&integration.name),
        methods,
    };
    let imports = vec![ImportSpec::values(
        ArtifactRef::support("errors"),
        symbols(["NotImplementedError"]),
    )];
    rendered(integration_ref(&integration.name), &template, imports, None)
}

pub fn worker_artifact(worker: &Worker) -> Result<GeneratedArtifact, RenderError> {
    let class_name = worker_class(&worker.name);
    let service = worker
        .entity
        .as_deref()
        .map(|e| format!("{}Service", NameForms::of(e).upper_camel));
    let queued = worker.modes.queued;
    let direct = worker.modes.direct;

    let broker = ArtifactRef::support("broker");
    let mut imports = vec![ImportSpec::types(
        broker.clone(),
        symbols(["BrokerClient", "JobReceipt", "WorkerMode"]),
    )];
    let mut values = Vec::new();
    if queued {
        values.extend(symbols(["JobPool", "probeBroker"]));
    }
    if direct {
        values.push("nextDirectJobId".to_string());
    }
    if !values.is_empty() {
        imports.push(ImportSpec::values(broker, values));
    }
    if !direct {
        imports.push(ImportSpec::values(
            ArtifactRef::support("errors"),
            symbols(["BrokerUnavailableError"]),
        ));
    }
    if let (Some(entity), Some(service)) = (&worker.entity, &service) {
        imports.push(ImportSpec::types(service_ref(entity), [service.clone()]));
    }

    let modes = [(queued, "'queued'"), (direct, "'direct'")]
        .into_iter()
        .filter_map(|(on, literal)| on.then_some(literal))
        .collect::<Vec<_>>()
        .join(", ");

    let template = WorkerTemplate {
        class_name,
        service,
        name_literal: ts_string_literal(&worker.name),
        queue_literal: ts_string_literal(&worker.queue),
        concurrency: worker.concurrency,
        modes,
        queued,
        direct,
        rate_limit: worker
            .rate_limit
            .as_ref()
            .map(|r| format!("{{ max: {}, perMs: {} }}", r.max, r.per_ms)),
    };
    rendered(
        worker_ref(&worker.name),
        &template,
        imports,
        worker.entity.as_deref(),
    )
}

/// Build the wiring module over the artifacts in `emitted`.
///
/// Services, controllers, enforcers, auditors and workers missing from
/// `emitted` are left out.
pub fn module_artifact(
    model: &Model,
    emitted: &BTreeSet<ArtifactRef>,
) -> Result<GeneratedArtifact, RenderError> {
    let mut imports = vec![
        ImportSpec::types(
            ArtifactRef::support("persistence"),
            symbols(["PersistenceProvider"]),
        ),
        ImportSpec::types(ArtifactRef::support("context"), symbols(["RouteDefinition"])),
        ImportSpec::types(ArtifactRef::support("broker"), symbols(["WorkerMode"])),
    ];

    let mut integrations = Vec::new();
    for integration in &model.integrations {
        let reference = integration_ref(&integration.name);
        if !emitted.contains(&reference) {
            continue;
        }
        let view = ModuleIntegrationView {
            key: to_camel_case(&integration.name),
            type_name: integration_type(&integration.name),
            stub_name: integration_stub(&integration.name),
        };
        imports.push(ImportSpec::types(reference.clone(), [view.type_name.clone()]));
        imports.push(ImportSpec::values(reference, [view.stub_name.clone()]));
        integrations.push(view);
    }

    let mut services = Vec::new();
    let mut controllers = Vec::new();
    for entity in &model.entities {
        let names = NameForms::of(&entity.name);
        let reference = service_ref(&entity.name);
        if !emitted.contains(&reference) {
            continue;
        }
        let class_name = format!("{}Service", names.upper_camel);
        imports.push(ImportSpec::values(reference, [class_name.clone()]));
        imports.push(ImportSpec::types(
            entity_ref(&entity.name),
            [names.upper_camel.clone()],
        ));

        let mut enforcers = Vec::new();
        for rule in model.rules_for(&entity.name) {
            let reference = enforcer_ref(&rule.name);
            if !emitted.contains(&reference) {
                continue;
            }
            let class = enforcer_class(&rule.name);
            let integration = match &rule.action {
                Some(RuleAction::Invoke(target)) => model
                    .integration(&target.integration)
                    .map(|i| format!("integrations.{}", to_camel_case(&i.name))),
                _ => None,
            };
            enforcers.push(format!("new {class}({})", integration.unwrap_or_default()));
            imports.push(ImportSpec::values(reference, [class]));
        }

        let has_auditor = emitted.contains(&auditor_ref(&entity.name));
        if has_auditor {
            imports.push(ImportSpec::values(
                auditor_ref(&entity.name),
                [format!("{}Auditor", names.upper_camel)],
            ));
        }
        let loaders = loaders(entity);
        imports.extend(related_entity_types(
            &entity.name,
            entity
                .relations
                .iter()
                .filter(|r| r.kind.owns_foreign_key())
                .map(|r| r.target.as_str()),
        ));

        let service_var = format!("{}Service", names.lower_camel);
        let controller = controller_ref(&entity.name);
        if emitted.contains(&controller) {
            let class_name = format!("{}Controller", names.upper_camel);
            imports.push(ImportSpec::values(controller, [class_name.clone()]));
            controllers.push(ModuleControllerView {
                key: names.lower_camel.clone(),
                var: format!("{}Controller", names.lower_camel),
                class_name,
                service_var: service_var.clone(),
            });
        }

        services.push(ModuleServiceView {
            key: names.lower_camel.clone(),
            var: service_var,
            class_name,
            entity: names.upper_camel.clone(),
            table: names.plural_snake(),
            enforcers: enforcers.join(", "),
            has_auditor,
            loaders,
        });
    }
    if !services.is_empty() {
        imports.push(ImportSpec::values(
            ArtifactRef::support("rules"),
            symbols(["RuleSet"]),
        ));
    }

    let mut workers = Vec::new();
    for worker in &model.workers {
        let reference = worker_ref(&worker.name);
        if !emitted.contains(&reference) {
            continue;
        }
        let names = NameForms::of(&worker.name);
        let class_name = worker_class(&worker.name);
        imports.push(ImportSpec::values(reference.clone(), [class_name.clone()]));
        imports.push(ImportSpec::types(reference, [format!("{class_name}Handler")]));
        workers.push(ModuleWorkerView {
            key: names.lower_camel.clone(),
            var: format!("{}Worker", names.lower_camel),
            class_name,
            service_var: worker
                .entity
                .as_deref()
                .map(|e| format!("{}Service", NameForms::of(e).lower_camel)),
        });
    }
    if !workers.is_empty() {
        imports.push(ImportSpec::types(
            ArtifactRef::support("broker"),
            symbols(["BrokerClient"]),
        ));
    }

    let needs_audit = services.iter().any(|s| s.has_auditor);
    if needs_audit {
        imports.push(ImportSpec::types(
            ArtifactRef::support("audit"),
            symbols(["AuditSink"]),
        ));
    }

    let template = ModuleTemplate {
        name_literal: ts_string_literal(&model.name),
        needs_audit,
        integrations,
        services,
        controllers,
        workers,
    };
    rendered(ArtifactRef::module(), &template, imports, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{parse_spec, validate};

    fn model() -> Model {
        let spec = parse_spec(
            r#"
name: Tracker
entities:
  - name: Project
    fields:
      - { name: title, type: string, required: true }
  - name: Task
    fields:
      - { name: title, type: string, required: true }
      - { name: completed, type: boolean, default: false }
    relations:
      - { name: project, target: Project }
    generate: { auditor: true }
rules:
  - name: notify owner
    entity: Task
    trigger: after_create
    kind: side_effect
    action: { invoke: { integration: email, method: send, args: { to: title } } }
integrations:
  - name: email
    category: notification
    methods:
      - { name: send, params: [{ name: to, type: string }], returns: boolean }
workers:
  - name: reminder
    queue: reminders
    entity: Task
    concurrency: 2
    modes: [queued]
"#,
            true,
        )
        .unwrap();
        validate(&spec).unwrap()
    }

    fn has_import(artifact: &GeneratedArtifact, target: &ArtifactRef, symbol: &str) -> bool {
        artifact.imports.iter().any(|i| {
            i.artifact() == Some(target) && i.symbols.iter().any(|s| s == symbol)
        })
    }

    #[test]
    fn test_service_imports_entity_and_related_types() {
        let model = model();
        let task = model.entity("Task").unwrap();
        let service = service_artifact(task).unwrap();
        assert_eq!(service.path(), "services/task.service.ts");
        assert!(has_import(&service, &entity_ref("Task"), "TaskSchema"));
        assert!(has_import(&service, &entity_ref("Project"), "Project"));
        assert!(has_import(&service, &auditor_ref("Task"), "TaskAuditor"));
        assert!(service.body.contains("loaded.projectId"));
    }

    #[test]
    fn test_enforcer_binds_integration() {
        let model = model();
        let fragment = crate::rules::compile_rule(&model, &model.rules[0]).unwrap();
        let enforcer = enforcer_artifact(&fragment).unwrap();
        assert_eq!(enforcer.path(), "enforcers/notify-owner.enforcer.ts");
        assert!(has_import(&enforcer, &integration_ref("email"), "EmailIntegration"));
        assert!(enforcer
            .body
            .contains("await this.email.send(created.title);"));
        assert!(enforcer.body.contains("_caller: CallerContext"));
    }

    #[test]
    fn test_queued_only_worker_requires_broker() {
        let model = model();
        let worker = worker_artifact(&model.workers[0]).unwrap();
        assert!(has_import(
            &worker,
            &ArtifactRef::support("errors"),
            "BrokerUnavailableError"
        ));
        assert!(has_import(&worker, &service_ref("Task"), "TaskService"));
        assert!(!worker.body.contains("nextDirectJobId"));
        assert!(worker.body.contains("throw new BrokerUnavailableError(ReminderWorker.QUEUE);"));
    }

    #[test]
    fn test_module_skips_missing_artifacts() {
        let model = model();
        let mut emitted: BTreeSet<ArtifactRef> = [
            service_ref("Project"),
            controller_ref("Project"),
            integration_ref("email"),
        ]
        .into_iter()
        .collect();
        let module = module_artifact(&model, &emitted).unwrap();
        assert!(module.body.contains("const projectService = new ProjectService({"));
        assert!(!module.body.contains("TaskService"));

        emitted.extend([
            service_ref("Task"),
            enforcer_ref("notify owner"),
            auditor_ref("Task"),
            worker_ref("reminder"),
        ]);
        let module = module_artifact(&model, &emitted).unwrap();
        assert!(module
            .body
            .contains("rules: new RuleSet<Task>([new NotifyOwnerEnforcer(integrations.email)]),"));
        assert!(module.body.contains("auditor: new TaskAuditor(deps.audit),"));
        assert!(module.body.contains("project: deps.persistence.for<Project>('projects'),"));
        assert!(module.body.contains("deps.handlers.reminder,"));
    }
}
