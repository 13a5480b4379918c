use askama::Template;

/// Template for `runtime/errors.ts`
#[derive(Template)]
#[template(path = "errors.ts.txt", escape = "none")]
pub struct ErrorsTemplate;

/// Template for `runtime/persistence.ts`
#[derive(Template)]
#[template(path = "persistence.ts.txt", escape = "none")]
pub struct PersistenceTemplate;

/// Template for `runtime/context.ts`
#[derive(Template)]
#[template(path = "context.ts.txt", escape = "none")]
pub struct ContextTemplate;

/// Template for `runtime/audit.ts`
#[derive(Template)]
#[template(path = "audit.ts.txt", escape = "none")]
pub struct AuditTemplate;

/// Template data for `runtime/rules.ts`
#[derive(Template)]
#[template(path = "rules.ts.txt", escape = "none")]
pub struct RulesTemplate {
    /// Every trigger name, in lifecycle order
    pub triggers: Vec<&'static str>,
}

/// Template data for `runtime/broker.ts`
#[derive(Template)]
#[template(path = "broker.ts.txt", escape = "none")]
pub struct BrokerTemplate {
    /// String literal naming the endpoint environment variable
    pub endpoint_env: String,
    pub probe_timeout_ms: u64,
}

/// One enumerated field: its value tuple and the union alias over it
#[derive(Debug, Clone)]
pub struct EnumView {
    pub const_name: String,
    pub type_name: String,
    /// Comma-separated string literals
    pub values: String,
}

#[derive(Debug, Clone)]
pub struct PropView {
    pub name: String,
    pub ts_type: String,
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub struct SchemaEntryView {
    pub name: String,
    /// Zod expression
    pub expr: String,
}

#[derive(Debug, Clone)]
pub struct ColumnView {
    pub name: String,
    /// Object literal describing the column
    pub descriptor: String,
}

/// Template data for an entity schema module
#[derive(Template)]
#[template(path = "entity.ts.txt", escape = "none")]
pub struct EntityTemplate {
    /// Entity type name
    pub name: String,
    pub enums: Vec<EnumView>,
    /// Properties of the stored record, `id` first
    pub props: Vec<PropView>,
    /// Create-input validation entries
    pub schema: Vec<SchemaEntryView>,
    /// `SCREAMING_SNAKE` prefix of the storage constant
    pub constant: String,
    pub table: String,
    pub columns: Vec<ColumnView>,
}

/// A relation the service loads through its foreign key
#[derive(Debug, Clone)]
pub struct LoaderView {
    pub prop: String,
    pub type_name: String,
    pub fk_prop: String,
    /// Storage table of the related entity
    pub table: String,
}

/// Template data for an entity service
#[derive(Template)]
#[template(path = "service.ts.txt", escape = "none")]
pub struct ServiceTemplate {
    pub name: String,
    pub has_loaders: bool,
    pub loaders: Vec<LoaderView>,
    pub has_auditor: bool,
}

/// Template data for an entity controller
#[derive(Template)]
#[template(path = "controller.ts.txt", escape = "none")]
pub struct ControllerTemplate {
    pub name: String,
    /// Route prefix, e.g. `/tasks`
    pub base_path: String,
}

/// Template data for an entity auditor
#[derive(Template)]
#[template(path = "auditor.ts.txt", escape = "none")]
pub struct AuditorTemplate {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct InvokeView {
    /// Constructor property holding the integration
    pub field: String,
    pub type_name: String,
    pub method: String,
    /// Comma-separated argument expressions
    pub args: String,
}

/// Template data for one rule enforcer
///
/// Literal-valued fields hold ready-to-emit TypeScript string literals.
#[derive(Template)]
#[template(path = "enforcer.ts.txt", escape = "none")]
pub struct EnforcerTemplate {
    pub class_name: String,
    pub entity: String,
    pub rule_literal: String,
    pub trigger: &'static str,
    /// Record parameter name
    pub binding: &'static str,
    /// `caller`, or `_caller` when the guard never reads it
    pub caller_param: &'static str,
    pub invoke: Option<InvokeView>,
    pub reject_message: Option<String>,
    pub capability: Option<String>,
    pub denied_message: String,
    pub has_predicate: bool,
    /// Guard predicate, `true` when the rule is unconditional
    pub predicate_or_true: String,
}

#[derive(Debug, Clone)]
pub struct MethodView {
    pub name: String,
    /// `to: string, subject: string`
    pub params: String,
    /// Same parameters, underscore-prefixed for the stub
    pub stub_params: String,
    pub returns: String,
}

/// Template data for an integration contract and its stub
#[derive(Template)]
#[template(path = "integration.ts.txt", escape = "none")]
pub struct IntegrationTemplate {
    pub constant: String,
    pub category_literal: String,
    pub type_name: String,
    pub stub_name: String,
    pub name_literal: String,
    pub methods: Vec<MethodView>,
}

/// Template data for a background worker
#[derive(Template)]
#[template(path = "worker.ts.txt", escape = "none")]
pub struct WorkerTemplate {
    pub class_name: String,
    /// Service class handed to the handler, for entity-bound workers
    pub service: Option<String>,
    pub name_literal: String,
    pub queue_literal: String,
    pub concurrency: u32,
    /// Comma-separated mode literals
    pub modes: String,
    pub queued: bool,
    pub direct: bool,
    /// `{ max, perMs }` object literal
    pub rate_limit: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModuleIntegrationView {
    pub key: String,
    pub type_name: String,
    pub stub_name: String,
}

#[derive(Debug, Clone)]
pub struct ModuleServiceView {
    pub key: String,
    pub var: String,
    pub class_name: String,
    pub entity: String,
    pub table: String,
    /// Comma-separated enforcer constructions
    pub enforcers: String,
    pub has_auditor: bool,
    pub loaders: Vec<LoaderView>,
}

#[derive(Debug, Clone)]
pub struct ModuleControllerView {
    pub key: String,
    pub var: String,
    pub class_name: String,
    pub service_var: String,
}

#[derive(Debug, Clone)]
pub struct ModuleWorkerView {
    pub key: String,
    pub var: String,
    pub class_name: String,
    pub service_var: Option<String>,
}

/// Template data for `app.module.ts`
#[derive(Template)]
#[template(path = "module.ts.txt", escape = "none")]
pub struct ModuleTemplate {
    pub name_literal: String,
    pub needs_audit: bool,
    pub integrations: Vec<ModuleIntegrationView>,
    pub services: Vec<ModuleServiceView>,
    pub controllers: Vec<ModuleControllerView>,
    pub workers: Vec<ModuleWorkerView>,
}
