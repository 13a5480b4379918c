//! Raw project specification, exactly as deserialized from a document.
//!
//! Enumerated values (`type`, `trigger`, `kind`, `modes`) are kept as strings
//! here; the validator turns them into closed enums so an unknown spelling is
//! reported with its location instead of failing deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Root aggregate of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSpec {
    /// Project name; the output slug is derived from it.
    pub name: String,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub rules: Vec<BusinessRule>,
    #[serde(default)]
    pub integrations: Vec<Integration>,
    #[serde(default)]
    pub workers: Vec<WorkerDef>,
}

impl ProjectSpec {
    /// Filesystem-safe slug of the project name (`Task Tracker` → `task_tracker`).
    pub fn slug(&self) -> String {
        let slug = self
            .name
            .to_lowercase()
            .replace(|c: char| !c.is_ascii_alphanumeric(), "_")
            .trim_matches('_')
            .to_string();
        if slug.is_empty() {
            "project".to_string()
        } else {
            slug
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub relations: Vec<RelationRef>,
    #[serde(default)]
    pub generate: ArtifactFlags,
}

/// Which optional artifacts an entity asks for. The entity schema is always
/// generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFlags {
    #[serde(default = "enabled")]
    pub service: bool,
    #[serde(default = "enabled")]
    pub controller: bool,
    #[serde(default)]
    pub auditor: bool,
}

fn enabled() -> bool {
    true
}

impl Default for ArtifactFlags {
    fn default() -> Self {
        ArtifactFlags {
            service: true,
            controller: true,
            auditor: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub domain_type: String,
    #[serde(flatten)]
    pub constraints: FieldConstraints,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConstraints {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Members of an `enum` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationRef {
    /// Property name on the owning record, and the path segment used by rule
    /// conditions.
    pub name: String,
    /// Name of the related entity.
    pub target: String,
    /// `many_to_one` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessRule {
    pub name: String,
    pub entity: String,
    pub trigger: String,
    pub kind: String,
    /// Optional for side effects and permissions, where it means "always".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<RuleAction>,
    /// Capability a caller must hold; permission rules only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Reject the operation with this message.
    Reject(String),
    /// Call a method on a declared integration.
    Invoke(InvokeTarget),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeTarget {
    pub integration: String,
    pub method: String,
    /// Method parameter → field path. Parameters left out bind to the
    /// same-named field of the owning entity.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Integration {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub methods: Vec<IntegrationMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrationMethod {
    pub name: String,
    #[serde(default)]
    pub params: Vec<MethodParam>,
    /// Domain type of the result; `void` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodParam {
    pub name: String,
    #[serde(rename = "type")]
    pub domain_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerDef {
    pub name: String,
    pub queue: String,
    /// Entity whose service the worker receives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
    #[serde(default = "default_modes")]
    pub modes: Vec<String>,
}

fn default_concurrency() -> u32 {
    1
}

fn default_modes() -> Vec<String> {
    vec!["queued".to_string(), "direct".to_string()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Jobs allowed per window.
    pub max: u32,
    /// Window length in milliseconds.
    pub per_ms: u64,
}
