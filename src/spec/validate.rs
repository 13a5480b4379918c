//! Structural validation of a [`ProjectSpec`].
//!
//! [`validate`] walks the whole document once and either returns a
//! cross-referenced [`Model`] or every issue it found. Nothing downstream of
//! this module ever sees an unknown domain type, trigger, rule kind, relation
//! kind or worker mode.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::model::{
    ContractMethod, Entity, Field, IntegrationContract, Model, Relation, RelationKind, Rule,
    RuleKind, Trigger, Worker, WorkerModes,
};
use super::types::{
    BusinessRule, EntityDef, FieldConstraints, FieldDef, Integration, InvokeTarget, ProjectSpec,
    RuleAction, WorkerDef,
};
use crate::error::SpecValidationError;
use crate::naming::{to_camel_case, to_kebab_case, to_pascal_case, DomainType, NameForms};
use crate::rules::{parse_condition, resolve_path, FieldPath, PathError, ID_FIELD};
use crate::validator::{IssueKind, ValidationIssue};

fn plural_snake(name: &str) -> String {
    NameForms::of(name).plural_snake()
}

/// Entities, fields, relations, methods and parameters.
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("identifier regex should be valid")
});

/// Rules, integrations and workers may be written as words (`hide completed`).
static WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9 _-]*$").expect("name regex should be valid")
});

struct Validator {
    issues: Vec<ValidationIssue>,
    /// Lowercased integration name → declared method names.
    integrations: BTreeMap<String, BTreeSet<String>>,
}

impl Validator {
    fn push(&mut self, location: impl Into<String>, kind: IssueKind, message: impl Into<String>) {
        self.issues.push(ValidationIssue::new(location, kind, message));
    }

    fn check_name(&mut self, location: &str, what: &str, name: &str, pattern: &Regex) -> bool {
        if pattern.is_match(name.trim()) && name.trim() == name {
            return true;
        }
        self.push(
            location,
            IssueKind::InvalidName,
            format!("{what} name `{name}` is empty or not a valid identifier"),
        );
        false
    }

    /// Report names that are distinct as written but equal once stamped into
    /// a file name or identifier.
    fn check_collisions<'a>(
        &mut self,
        scope: &str,
        what: &str,
        duplicate: IssueKind,
        names: impl Iterator<Item = &'a str>,
        stamps: &[fn(&str) -> String],
    ) {
        let mut seen: BTreeMap<(usize, String), &str> = BTreeMap::new();
        for name in names {
            let forms: Vec<String> = stamps.iter().map(|stamp| stamp(name)).collect();
            let clash = forms
                .iter()
                .enumerate()
                .find_map(|(i, form)| {
                    seen.get(&(i, form.clone())).map(|first| (*first, form.clone()))
                });
            match clash {
                Some((first, _)) if first.eq_ignore_ascii_case(name) => self.push(
                    format!("{scope}{what}:{name}"),
                    duplicate,
                    format!("{what} `{name}` is declared more than once"),
                ),
                Some((first, stamped)) => self.push(
                    format!("{scope}{what}:{name}"),
                    IssueKind::NameCollision,
                    format!("{what} `{name}` and `{first}` both become `{stamped}`"),
                ),
                None => {
                    for (i, form) in forms.into_iter().enumerate() {
                        seen.insert((i, form), name);
                    }
                }
            }
        }
    }

    fn entity(&mut self, def: &EntityDef, known: &BTreeSet<String>) -> Entity {
        let loc = format!("entity:{}", def.name);
        self.check_name(&loc, "entity", &def.name, &IDENTIFIER);

        self.check_collisions(
            &format!("{loc}/"),
            "field",
            IssueKind::DuplicateField,
            def.fields.iter().map(|f| f.name.as_str()),
            &[to_camel_case],
        );
        self.check_collisions(
            &format!("{loc}/"),
            "relation",
            IssueKind::DuplicateRelation,
            def.relations.iter().map(|r| r.name.as_str()),
            &[to_camel_case],
        );

        let mut fields = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            let floc = format!("{loc}/field:{}", field.name);
            self.check_name(&floc, "field", &field.name, &IDENTIFIER);
            if to_camel_case(&field.name) == ID_FIELD {
                self.push(
                    &floc,
                    IssueKind::NameCollision,
                    "`id` is the generated record identifier and cannot be redeclared",
                );
            }
            if let Some(field) = self.field(&floc, field) {
                fields.push(field);
            }
        }

        let field_props: BTreeSet<String> = def.fields.iter().map(|f| to_camel_case(&f.name)).collect();
        let mut relations = Vec::with_capacity(def.relations.len());
        for rel in &def.relations {
            let rloc = format!("{loc}/relation:{}", rel.name);
            self.check_name(&rloc, "relation", &rel.name, &IDENTIFIER);
            let prop = to_camel_case(&rel.name);
            if field_props.contains(&prop) || field_props.contains(&format!("{prop}Id")) {
                self.push(
                    &rloc,
                    IssueKind::NameCollision,
                    format!("relation `{}` collides with a field of the same name", rel.name),
                );
            }
            if !known.contains(&rel.target.to_ascii_lowercase()) {
                self.push(
                    &rloc,
                    IssueKind::UndefinedRelationTarget,
                    format!(
                        "relation `{}` targets undefined entity `{}`",
                        rel.name, rel.target
                    ),
                );
            }
            let kind = match rel.kind.as_deref() {
                None => RelationKind::ManyToOne,
                Some(raw) => RelationKind::parse(raw).unwrap_or_else(|| {
                    self.push(
                        &rloc,
                        IssueKind::UnknownRelationKind,
                        format!("unknown relation kind `{raw}`"),
                    );
                    RelationKind::ManyToOne
                }),
            };
            relations.push(Relation {
                name: rel.name.clone(),
                target: rel.target.clone(),
                kind,
            });
        }

        // Enum aliases share the entity file's type namespace with the
        // entity's own input types and every imported relation target.
        let entity_type = to_pascal_case(&def.name);
        let mut taken: BTreeSet<String> = def.relations.iter().map(|r| to_pascal_case(&r.target)).collect();
        taken.insert(format!("{entity_type}Input"));
        taken.insert(format!("{entity_type}Update"));
        for field in fields.iter().filter(|f| f.domain_type == DomainType::Enum) {
            let alias = format!("{entity_type}{}", to_pascal_case(&field.name));
            if taken.contains(&alias) {
                self.push(
                    format!("{loc}/field:{}", field.name),
                    IssueKind::NameCollision,
                    format!(
                        "enum type `{alias}` for field `{}` collides with another type in the entity file",
                        field.name
                    ),
                );
            }
        }

        if def.generate.controller && !def.generate.service {
            self.push(
                &loc,
                IssueKind::MissingService,
                "a controller is requested but the service is disabled",
            );
        }

        Entity {
            name: def.name.clone(),
            fields,
            relations,
            flags: def.generate,
        }
    }

    fn field(&mut self, loc: &str, def: &FieldDef) -> Option<Field> {
        let Some(domain_type) = DomainType::parse(&def.domain_type) else {
            self.push(
                loc,
                IssueKind::UnknownDomainType,
                format!("unknown domain type `{}`", def.domain_type),
            );
            return None;
        };
        self.constraints(loc, domain_type, &def.constraints);
        Some(Field {
            name: def.name.clone(),
            domain_type,
            constraints: def.constraints.clone(),
        })
    }

    fn constraints(&mut self, loc: &str, ty: DomainType, c: &FieldConstraints) {
        let inconsistent = |v: &mut Self, msg: String| {
            v.push(loc, IssueKind::InconsistentConstraint, msg);
        };

        if (c.min_length.is_some() || c.max_length.is_some()) && !ty.is_textual() {
            inconsistent(self, format!("length bounds do not apply to `{ty}` fields"));
        }
        if let (Some(min), Some(max)) = (c.min_length, c.max_length) {
            if min > max {
                inconsistent(self, format!("min_length {min} is greater than max_length {max}"));
            }
        }
        if (c.min.is_some() || c.max.is_some()) && !ty.is_numeric() {
            inconsistent(self, format!("numeric bounds do not apply to `{ty}` fields"));
        }
        if let (Some(min), Some(max)) = (c.min, c.max) {
            if min > max {
                inconsistent(self, format!("min {min} is greater than max {max}"));
            }
        }
        if let Some(pattern) = &c.pattern {
            if !ty.is_textual() {
                inconsistent(self, format!("a pattern does not apply to `{ty}` fields"));
            } else if let Err(e) = Regex::new(pattern) {
                inconsistent(self, format!("pattern `{pattern}` is not a valid regular expression: {e}"));
            }
        }

        match (ty, &c.values) {
            (DomainType::Enum, None) => {
                inconsistent(self, "enum field declares no `values`".to_string());
            }
            (DomainType::Enum, Some(values)) => {
                if values.is_empty() || values.iter().any(|v| v.is_empty()) {
                    inconsistent(self, "enum `values` must be non-empty strings".to_string());
                }
                let distinct: BTreeSet<&String> = values.iter().collect();
                if distinct.len() != values.len() {
                    inconsistent(self, "enum `values` contains duplicates".to_string());
                }
            }
            (_, Some(_)) => {
                inconsistent(self, format!("`values` only applies to enum fields, not `{ty}`"));
            }
            (_, None) => {}
        }

        if let Some(default) = &c.default {
            if let Err(msg) = check_default(ty, c, default) {
                inconsistent(self, msg);
            }
        }
    }

    fn rule(&mut self, def: &BusinessRule, entities: &[Entity]) -> Option<Rule> {
        let loc = format!("rule:{}", def.name);
        self.check_name(&loc, "rule", &def.name, &WORDS);

        let owner = entities.iter().find(|e| e.name.eq_ignore_ascii_case(&def.entity));
        if owner.is_none() {
            self.push(
                &loc,
                IssueKind::UndefinedEntity,
                format!("rule references undefined entity `{}`", def.entity),
            );
        }
        if owner.is_some_and(|e| !e.flags.service) {
            self.push(
                &loc,
                IssueKind::MissingService,
                format!("rules on `{}` need its service to be generated", def.entity),
            );
        }

        let trigger = Trigger::parse(&def.trigger);
        if trigger.is_none() {
            self.push(
                &loc,
                IssueKind::UnknownTrigger,
                format!("unknown trigger `{}`", def.trigger),
            );
        }
        let kind = RuleKind::parse(&def.kind);
        if kind.is_none() {
            self.push(
                &loc,
                IssueKind::UnknownRuleKind,
                format!("unknown rule kind `{}`", def.kind),
            );
        }

        let condition = match def.condition.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => match parse_condition(raw) {
                Ok(expr) => Some(expr),
                Err(e) => {
                    self.push(&loc, IssueKind::InvalidCondition, format!("`{raw}`: {e}"));
                    None
                }
            },
            _ => {
                if kind == Some(RuleKind::Constraint) {
                    self.push(&loc, IssueKind::MissingCondition, "constraint rules need a condition");
                }
                None
            }
        };

        if let (Some(expr), Some(owner)) = (&condition, owner) {
            for path in expr.paths() {
                self.check_path(&loc, entities, owner, path);
            }
        }

        match (kind, &def.action) {
            (Some(RuleKind::Constraint), Some(RuleAction::Reject(_))) => {}
            (Some(RuleKind::Constraint), _) => {
                self.push(&loc, IssueKind::MissingAction, "constraint rules need a `reject` action");
            }
            (Some(RuleKind::SideEffect), Some(RuleAction::Invoke(target))) => {
                self.invoke_target(&loc, def, target, entities, owner);
            }
            (Some(RuleKind::SideEffect), _) => {
                self.push(&loc, IssueKind::MissingAction, "side_effect rules need an `invoke` action");
            }
            (Some(RuleKind::Permission), _) => {
                if def.capability.as_deref().map_or(true, |c| c.trim().is_empty()) {
                    self.push(
                        &loc,
                        IssueKind::MissingCapability,
                        "permission rules need a `capability`",
                    );
                }
            }
            (None, _) => {}
        }

        Some(Rule {
            name: def.name.clone(),
            entity: owner.map(|e| e.name.clone())?,
            trigger: trigger?,
            kind: kind?,
            condition,
            action: def.action.clone(),
            capability: def.capability.clone(),
            message: def.message.clone(),
        })
    }

    fn check_path(&mut self, loc: &str, entities: &[Entity], owner: &Entity, path: &FieldPath) {
        match resolve_path(entities, owner, path) {
            Ok(_) => {}
            Err(e @ (PathError::BareRelation(_) | PathError::CollectionRelation(_))) => {
                self.push(loc, IssueKind::InvalidCondition, e.to_string());
            }
            Err(e) => self.push(loc, IssueKind::UndefinedField, e.to_string()),
        }
    }

    fn invoke_target(
        &mut self,
        loc: &str,
        def: &BusinessRule,
        target: &InvokeTarget,
        entities: &[Entity],
        owner: Option<&Entity>,
    ) {
        let declared = self
            .integrations
            .get(&target.integration.to_ascii_lowercase())
            .map(|methods| methods.contains(&target.method));
        match declared {
            None => {
                self.push(
                    loc,
                    IssueKind::UndefinedIntegration,
                    format!(
                        "rule `{}` invokes undefined integration `{}`",
                        def.name, target.integration
                    ),
                );
                return;
            }
            Some(false) => self.push(
                loc,
                IssueKind::UndefinedMethod,
                format!(
                    "integration `{}` declares no method `{}`",
                    target.integration, target.method
                ),
            ),
            Some(true) => {}
        }
        let Some(owner) = owner else { return };
        for (param, raw) in &target.args {
            match FieldPath::parse(raw) {
                Ok(path) => self.check_path(loc, entities, owner, &path),
                Err(e) => self.push(
                    loc,
                    IssueKind::InvalidCondition,
                    format!("argument `{param}`: `{raw}` is not a field path ({e})"),
                ),
            }
        }
    }

    fn integration(&mut self, def: &Integration) -> IntegrationContract {
        let loc = format!("integration:{}", def.name);
        self.check_name(&loc, "integration", &def.name, &WORDS);
        self.check_collisions(
            &format!("{loc}/"),
            "method",
            IssueKind::DuplicateMethod,
            def.methods.iter().map(|m| m.name.as_str()),
            &[to_camel_case],
        );

        let mut methods = Vec::with_capacity(def.methods.len());
        for method in &def.methods {
            let mloc = format!("{loc}/method:{}", method.name);
            self.check_name(&mloc, "method", &method.name, &IDENTIFIER);
            let mut params = Vec::with_capacity(method.params.len());
            for param in &method.params {
                self.check_name(&mloc, "parameter", &param.name, &IDENTIFIER);
                match DomainType::parse(&param.domain_type) {
                    Some(ty) => params.push((param.name.clone(), ty)),
                    None => self.push(
                        &mloc,
                        IssueKind::UnknownDomainType,
                        format!(
                            "parameter `{}` has unknown domain type `{}`",
                            param.name, param.domain_type
                        ),
                    ),
                }
            }
            let returns = match method.returns.as_deref() {
                None | Some("void") => None,
                Some(raw) => {
                    let parsed = DomainType::parse(raw);
                    if parsed.is_none() {
                        self.push(
                            &mloc,
                            IssueKind::UnknownDomainType,
                            format!("unknown return type `{raw}`"),
                        );
                    }
                    parsed
                }
            };
            methods.push(ContractMethod {
                name: method.name.clone(),
                params,
                returns,
            });
        }
        IntegrationContract {
            name: def.name.clone(),
            category: def.category.clone(),
            methods,
        }
    }

    fn worker(&mut self, def: &WorkerDef, entities: &[Entity]) -> Worker {
        let loc = format!("worker:{}", def.name);
        self.check_name(&loc, "worker", &def.name, &WORDS);
        if def.queue.trim().is_empty() {
            self.push(&loc, IssueKind::InvalidWorker, "worker needs a queue name");
        }
        if def.concurrency == 0 {
            self.push(&loc, IssueKind::InvalidWorker, "concurrency must be at least 1");
        }
        if let Some(limit) = &def.rate_limit {
            if limit.max == 0 || limit.per_ms == 0 {
                self.push(
                    &loc,
                    IssueKind::InvalidWorker,
                    "rate_limit needs a non-zero `max` and `per_ms`",
                );
            }
        }

        let entity = def.entity.as_deref().and_then(|name| {
            let found = entities.iter().find(|e| e.name.eq_ignore_ascii_case(name));
            match found {
                None => self.push(
                    &loc,
                    IssueKind::UndefinedEntity,
                    format!("worker is bound to undefined entity `{name}`"),
                ),
                Some(e) if !e.flags.service => self.push(
                    &loc,
                    IssueKind::MissingService,
                    format!("worker is bound to `{}` whose service is disabled", e.name),
                ),
                Some(_) => {}
            }
            found.map(|e| e.name.clone())
        });

        let mut modes = WorkerModes::default();
        if def.modes.is_empty() {
            self.push(&loc, IssueKind::InvalidWorker, "worker declares no execution modes");
        }
        for mode in &def.modes {
            match mode.trim().to_ascii_lowercase().as_str() {
                "queued" => modes.queued = true,
                "direct" => modes.direct = true,
                other => self.push(
                    &loc,
                    IssueKind::UnknownWorkerMode,
                    format!("unknown worker mode `{other}`"),
                ),
            }
        }

        Worker {
            name: def.name.clone(),
            queue: def.queue.clone(),
            entity,
            concurrency: def.concurrency,
            rate_limit: def.rate_limit,
            modes,
        }
    }
}

fn check_default(ty: DomainType, c: &FieldConstraints, default: &Value) -> Result<(), String> {
    let fits = match ty {
        DomainType::String => match default.as_str() {
            Some(s) => {
                let len = s.chars().count() as u64;
                if c.min_length.is_some_and(|min| len < min)
                    || c.max_length.is_some_and(|max| len > max)
                {
                    return Err(format!("default `{s}` violates the length bounds"));
                }
                true
            }
            None => false,
        },
        DomainType::Date | DomainType::DateTime | DomainType::Uuid => default.is_string(),
        DomainType::Decimal => {
            default.is_number() || default.as_str().is_some_and(|s| s.parse::<f64>().is_ok())
        }
        DomainType::Integer => default.is_i64() || default.is_u64(),
        DomainType::Boolean => default.is_boolean(),
        DomainType::Json => true,
        DomainType::Enum => match default.as_str() {
            Some(s) => {
                let values = c.values.as_deref().unwrap_or(&[]);
                if !values.iter().any(|v| v == s) {
                    return Err(format!("default `{s}` is not one of the enum values"));
                }
                true
            }
            None => false,
        },
    };
    if !fits {
        return Err(format!("default {default} does not match domain type `{ty}`"));
    }
    if let Some(n) = default.as_f64() {
        if c.min.is_some_and(|min| n < min) || c.max.is_some_and(|max| n > max) {
            return Err(format!("default {n} is outside the numeric bounds"));
        }
    }
    Ok(())
}

/// Validate a raw specification into a [`Model`], collecting every issue.
pub fn validate(spec: &ProjectSpec) -> Result<Model, SpecValidationError> {
    let mut v = Validator {
        issues: Vec::new(),
        integrations: BTreeMap::new(),
    };

    if spec.name.trim().is_empty() {
        v.push("project", IssueKind::InvalidName, "project name is empty");
    }

    v.check_collisions(
        "",
        "entity",
        IssueKind::DuplicateEntity,
        spec.entities.iter().map(|e| e.name.as_str()),
        &[to_kebab_case, to_pascal_case, to_camel_case, plural_snake],
    );
    let known: BTreeSet<String> = spec
        .entities
        .iter()
        .map(|e| e.name.to_ascii_lowercase())
        .collect();

    let mut entities: Vec<Entity> = Vec::with_capacity(spec.entities.len());
    for def in &spec.entities {
        let entity = v.entity(def, &known);
        if !entities.iter().any(|e| e.name.eq_ignore_ascii_case(&entity.name)) {
            entities.push(entity);
        }
    }

    v.check_collisions(
        "",
        "integration",
        IssueKind::DuplicateIntegration,
        spec.integrations.iter().map(|i| i.name.as_str()),
        &[to_kebab_case, to_pascal_case, to_camel_case],
    );
    let integrations: Vec<IntegrationContract> =
        spec.integrations.iter().map(|i| v.integration(i)).collect();

    v.check_collisions(
        "",
        "rule",
        IssueKind::DuplicateRule,
        spec.rules.iter().map(|r| r.name.as_str()),
        &[to_kebab_case, to_pascal_case, to_camel_case],
    );
    v.integrations = integrations
        .iter()
        .map(|i| {
            let methods = i.methods.iter().map(|m| m.name.clone()).collect();
            (i.name.to_ascii_lowercase(), methods)
        })
        .collect();
    let rules: Vec<Rule> = spec
        .rules
        .iter()
        .filter_map(|r| v.rule(r, &entities))
        .collect();

    v.check_collisions(
        "",
        "worker",
        IssueKind::DuplicateWorker,
        spec.workers.iter().map(|w| w.name.as_str()),
        &[to_kebab_case, to_pascal_case, to_camel_case],
    );
    let workers: Vec<Worker> = spec.workers.iter().map(|w| v.worker(w, &entities)).collect();

    if !v.issues.is_empty() {
        debug!(issues = v.issues.len(), "project spec failed validation");
        return Err(SpecValidationError(v.issues));
    }

    debug!(
        entities = entities.len(),
        rules = rules.len(),
        integrations = integrations.len(),
        workers = workers.len(),
        "project spec validated"
    );
    Ok(Model {
        name: spec.name.clone(),
        slug: spec.slug(),
        entities,
        rules,
        integrations,
        workers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::parse_spec;

    fn issues(yaml: &str) -> Vec<ValidationIssue> {
        let spec = parse_spec(yaml, true).unwrap();
        match validate(&spec) {
            Ok(_) => Vec::new(),
            Err(SpecValidationError(issues)) => issues,
        }
    }

    fn kinds(yaml: &str) -> Vec<IssueKind> {
        issues(yaml).into_iter().map(|i| i.kind).collect()
    }

    const TASKS: &str = r#"
name: Task Tracker
entities:
  - name: Task
    fields:
      - { name: title, type: string, required: true, min_length: 1, max_length: 200 }
      - { name: completed, type: boolean, default: false }
      - { name: status, type: enum, values: [open, closed], default: open }
    relations:
      - { name: project, target: Project }
  - name: Project
    fields:
      - { name: name, type: string }
    relations:
      - { name: tasks, target: Task, kind: one_to_many }
rules:
  - { name: hide completed, entity: Task, trigger: before_read, kind: constraint, condition: "completed == true", action: { reject: "Completed tasks are hidden" } }
integrations:
  - name: email
    category: notification
    methods:
      - { name: send, params: [{ name: to, type: string }], returns: boolean }
workers:
  - { name: reminder, queue: reminders, entity: Task, concurrency: 5, rate_limit: { max: 10, per_ms: 1000 } }
"#;

    #[test]
    fn test_valid_spec_builds_model() {
        let spec = parse_spec(TASKS, true).unwrap();
        let model = validate(&spec).unwrap();
        assert_eq!(model.slug, "task_tracker");
        assert_eq!(model.entities.len(), 2);
        let task = model.entity("task").unwrap();
        assert_eq!(task.relation("project").unwrap().kind, RelationKind::ManyToOne);
        assert_eq!(model.rules[0].trigger, Trigger::BeforeRead);
        assert_eq!(model.integrations[0].methods[0].returns, Some(DomainType::Boolean));
        let worker = &model.workers[0];
        assert_eq!(worker.entity.as_deref(), Some("Task"));
        assert!(worker.modes.queued && worker.modes.direct);
    }

    #[test]
    fn test_undefined_relation_target_is_named() {
        let found = issues(
            r#"
name: X
entities:
  - name: Task
    relations: [{ name: project, target: Project }]
"#,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, IssueKind::UndefinedRelationTarget);
        assert_eq!(found[0].location, "entity:Task/relation:project");
        assert!(found[0].message.contains("Project"));
    }

    #[test]
    fn test_condition_on_missing_field_is_rejected() {
        let yaml = TASKS.replace("completed == true", "archived == true");
        assert_eq!(kinds(&yaml), vec![IssueKind::UndefinedField]);
    }

    #[test]
    fn test_collects_all_issues_in_one_pass() {
        let found = kinds(
            r#"
name: X
entities:
  - name: Task
    fields:
      - { name: title, type: string, min_length: 5, max_length: 2 }
      - { name: title, type: string }
      - { name: cost, type: money }
  - name: task
rules:
  - { name: r, entity: Ghost, trigger: on_save, kind: constraint, condition: "x ==", action: { reject: "no" } }
"#,
        );
        for expected in [
            IssueKind::DuplicateEntity,
            IssueKind::DuplicateField,
            IssueKind::InconsistentConstraint,
            IssueKind::UnknownDomainType,
            IssueKind::UndefinedEntity,
            IssueKind::UnknownTrigger,
            IssueKind::InvalidCondition,
        ] {
            assert!(found.contains(&expected), "missing {expected} in {found:?}");
        }
    }

    #[test]
    fn test_constraint_consistency() {
        let found = issues(
            r#"
name: X
entities:
  - name: Item
    fields:
      - { name: count, type: integer, min_length: 1 }
      - { name: flag, type: boolean, min: 0 }
      - { name: code, type: string, pattern: "([a-z" }
      - { name: size, type: integer, default: "big" }
      - { name: kind, type: enum }
      - { name: color, type: enum, values: [red], default: blue }
      - { name: label, type: string, values: [a] }
      - { name: qty, type: integer, min: 1, max: 10, default: 20 }
"#,
        );
        assert_eq!(found.len(), 8, "{found:?}");
        assert!(found
            .iter()
            .all(|i| i.kind == IssueKind::InconsistentConstraint));
    }

    #[test]
    fn test_rule_and_worker_checks() {
        let found = kinds(
            r#"
name: X
entities:
  - name: Task
    fields: [{ name: title, type: string }]
    generate: { service: false, controller: false }
rules:
  - { name: a, entity: Task, trigger: before_create, kind: constraint, action: { reject: "no" } }
  - { name: b, entity: Task, trigger: after_create, kind: side_effect, action: { invoke: { integration: sms, method: send } } }
  - { name: c, entity: Task, trigger: before_delete, kind: permission }
  - { name: d, entity: Task, trigger: before_create, kind: audit }
workers:
  - { name: w, queue: q, entity: Task, concurrency: 0, modes: [queued, batch] }
"#,
        );
        for expected in [
            IssueKind::MissingCondition,
            IssueKind::UndefinedIntegration,
            IssueKind::MissingCapability,
            IssueKind::UnknownRuleKind,
            IssueKind::MissingService,
            IssueKind::InvalidWorker,
            IssueKind::UnknownWorkerMode,
        ] {
            assert!(found.contains(&expected), "missing {expected} in {found:?}");
        }
    }

    #[test]
    fn test_name_collisions() {
        let found = issues(
            r#"
name: X
entities:
  - name: TaskItem
  - name: Task_Item
  - name: Note
    fields:
      - { name: due_date, type: date }
      - { name: dueDate, type: date }
      - { name: id, type: uuid }
"#,
        );
        let collisions: Vec<&str> = found
            .iter()
            .filter(|i| i.kind == IssueKind::NameCollision)
            .map(|i| i.location.as_str())
            .collect();
        assert_eq!(
            collisions,
            vec![
                "entity:Task_Item",
                "entity:Note/field:dueDate",
                "entity:Note/field:id"
            ]
        );
    }

    #[test]
    fn test_names_equal_in_type_position_collide() {
        let found = issues(
            r#"
name: X
entities:
  - name: Item2
  - name: item_2
"#,
        );
        let collision = found
            .iter()
            .find(|i| i.kind == IssueKind::NameCollision)
            .expect("pascal forms collide");
        assert_eq!(collision.location, "entity:item_2");
        assert!(collision.message.contains("`Item2`"), "{}", collision.message);
    }

    #[test]
    fn test_enum_alias_collides_with_entity_file_types() {
        let found = issues(
            r#"
name: X
entities:
  - name: TaskPriority
  - name: Task
    fields:
      - { name: priority, type: enum, values: [low, high] }
      - { name: input, type: enum, values: [form, api] }
      - { name: status, type: enum, values: [open, closed] }
    relations:
      - { name: level, target: TaskPriority }
"#,
        );
        let collisions: Vec<&str> = found
            .iter()
            .filter(|i| i.kind == IssueKind::NameCollision)
            .map(|i| i.location.as_str())
            .collect();
        assert_eq!(
            collisions,
            vec!["entity:Task/field:priority", "entity:Task/field:input"]
        );
    }
}
