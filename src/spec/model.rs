//! Validated, cross-referenced project model.
//!
//! Values of these types only come out of [`super::validate`]; every name
//! they mention resolves and every enumerated value is known.

use std::fmt;

use super::types::{ArtifactFlags, FieldConstraints, RateLimit, RuleAction};
use crate::naming::DomainType;
use crate::rules::Expr;

#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub slug: String,
    pub entities: Vec<Entity>,
    pub rules: Vec<Rule>,
    pub integrations: Vec<IntegrationContract>,
    pub workers: Vec<Worker>,
}

impl Model {
    /// Case-insensitive entity lookup.
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn integration(&self, name: &str) -> Option<&IntegrationContract> {
        self.integrations
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
    }

    /// Rules owned by `entity`, in declaration order.
    pub fn rules_for<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules.iter().filter(move |r| r.entity == entity)
    }

    /// Workers bound to `entity`, in declaration order.
    pub fn workers_for<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a Worker> + 'a {
        self.workers
            .iter()
            .filter(move |w| w.entity.as_deref() == Some(entity))
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub fields: Vec<Field>,
    pub relations: Vec<Relation>,
    pub flags: ArtifactFlags,
}

impl Entity {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub domain_type: DomainType,
    pub constraints: FieldConstraints,
}

impl Field {
    /// Fields with a default are always present on a stored record.
    pub fn is_present(&self) -> bool {
        self.constraints.required || self.constraints.default.is_some()
    }

    pub fn enum_values(&self) -> &[String] {
        self.constraints.values.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone)]
pub struct Relation {
    pub name: String,
    /// Declared name of the target entity.
    pub target: String,
    pub kind: RelationKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    ManyToOne,
    OneToMany,
    OneToOne,
    ManyToMany,
}

impl RelationKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "many_to_one" => Some(RelationKind::ManyToOne),
            "one_to_many" => Some(RelationKind::OneToMany),
            "one_to_one" => Some(RelationKind::OneToOne),
            "many_to_many" => Some(RelationKind::ManyToMany),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::ManyToOne => "many_to_one",
            RelationKind::OneToMany => "one_to_many",
            RelationKind::OneToOne => "one_to_one",
            RelationKind::ManyToMany => "many_to_many",
        }
    }

    /// The owning record holds many related records.
    pub fn is_collection(&self) -> bool {
        matches!(self, RelationKind::OneToMany | RelationKind::ManyToMany)
    }

    /// The owning record stores the foreign key.
    pub fn owns_foreign_key(&self) -> bool {
        matches!(self, RelationKind::ManyToOne | RelationKind::OneToOne)
    }
}

/// Lifecycle point at which a rule runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Trigger {
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
    BeforeRead,
}

impl Trigger {
    pub const ALL: [Trigger; 7] = [
        Trigger::BeforeCreate,
        Trigger::AfterCreate,
        Trigger::BeforeUpdate,
        Trigger::AfterUpdate,
        Trigger::BeforeDelete,
        Trigger::AfterDelete,
        Trigger::BeforeRead,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        Trigger::ALL
            .into_iter()
            .find(|t| t.as_str() == raw.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::BeforeCreate => "before_create",
            Trigger::AfterCreate => "after_create",
            Trigger::BeforeUpdate => "before_update",
            Trigger::AfterUpdate => "after_update",
            Trigger::BeforeDelete => "before_delete",
            Trigger::AfterDelete => "after_delete",
            Trigger::BeforeRead => "before_read",
        }
    }

    /// Name of the record the generated service hands to enforcers at this
    /// trigger point. Guards bind exactly this identifier.
    pub fn binding(&self) -> &'static str {
        match self {
            Trigger::BeforeCreate => "input",
            Trigger::AfterCreate => "created",
            Trigger::BeforeUpdate => "candidate",
            Trigger::AfterUpdate => "updated",
            Trigger::BeforeDelete => "existing",
            Trigger::AfterDelete => "removed",
            Trigger::BeforeRead => "candidate",
        }
    }

    /// Every record name some trigger binds.
    pub fn record_names() -> impl Iterator<Item = &'static str> {
        Trigger::ALL.into_iter().map(|t| t.binding())
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Constraint,
    SideEffect,
    Permission,
}

impl RuleKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "constraint" => Some(RuleKind::Constraint),
            "side_effect" => Some(RuleKind::SideEffect),
            "permission" => Some(RuleKind::Permission),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Constraint => "constraint",
            RuleKind::SideEffect => "side_effect",
            RuleKind::Permission => "permission",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    /// Declared name of the owning entity.
    pub entity: String,
    pub trigger: Trigger,
    pub kind: RuleKind,
    pub condition: Option<Expr>,
    pub action: Option<RuleAction>,
    pub capability: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IntegrationContract {
    pub name: String,
    pub category: String,
    pub methods: Vec<ContractMethod>,
}

impl IntegrationContract {
    pub fn method(&self, name: &str) -> Option<&ContractMethod> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct ContractMethod {
    pub name: String,
    pub params: Vec<(String, DomainType)>,
    pub returns: Option<DomainType>,
}

#[derive(Debug, Clone)]
pub struct Worker {
    pub name: String,
    pub queue: String,
    /// Declared name of the bound entity.
    pub entity: Option<String>,
    pub concurrency: u32,
    pub rate_limit: Option<RateLimit>,
    pub modes: WorkerModes,
}

/// Runtime execution modes a generated worker must support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerModes {
    pub queued: bool,
    pub direct: bool,
}
