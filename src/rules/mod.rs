//! # Business Rules
//!
//! Conditions are parsed once by the validator ([`parse_condition`]) and
//! compiled per entity pipeline ([`compile_rule`]) into a [`RuleFragment`]:
//! a guard bound to the record name its trigger supplies.
//!
//! Paths resolve against the owning entity first. A two-segment path
//! `relation.field` reaches one hop into a related entity; deeper paths and
//! paths through collection relations are rejected. A leading record name
//! (`candidate.completed`) is accepted when the entity has no field or
//! relation of that name, and the compiler then insists it matches the
//! trigger's binding.

mod compile;
mod expr;

pub use compile::*;
pub use expr::*;

use crate::naming::DomainType;
use crate::spec::{Entity, Relation, Trigger};

/// Name of the identifier every stored record carries.
pub const ID_FIELD: &str = "id";

/// What a field path points at.
#[derive(Debug, Clone)]
pub struct PathTarget<'m> {
    /// Record name the path was prefixed with, if any.
    pub prefix: Option<String>,
    /// Relation hopped through for `relation.field` paths.
    pub relation: Option<&'m Relation>,
    pub field: String,
    pub domain_type: DomainType,
    /// Members when `domain_type` is `enum`.
    pub enum_values: &'m [String],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    UnknownField { entity: String, field: String },
    UnknownRelation { entity: String, relation: String },
    BareRelation(String),
    CollectionRelation(String),
    TooDeep(String),
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::UnknownField { entity, field } => {
                write!(f, "`{field}` is not a field of `{entity}`")
            }
            PathError::UnknownRelation { entity, relation } => {
                write!(f, "`{relation}` is not a relation of `{entity}`")
            }
            PathError::BareRelation(rel) => {
                write!(f, "`{rel}` is a relation; reference one of its fields")
            }
            PathError::CollectionRelation(rel) => {
                write!(f, "`{rel}` holds many records and cannot appear in a condition")
            }
            PathError::TooDeep(path) => {
                write!(f, "`{path}` reaches beyond a direct relation")
            }
        }
    }
}

fn lookup_field<'m>(entity: &'m Entity, name: &str) -> Option<(DomainType, &'m [String])> {
    if let Some(field) = entity.field(name) {
        return Some((field.domain_type, field.enum_values()));
    }
    (name == ID_FIELD).then_some((DomainType::Uuid, &[][..]))
}

/// Resolve `path` against `owner`, reaching into `entities` for relation hops.
pub fn resolve_path<'m>(
    entities: &'m [Entity],
    owner: &'m Entity,
    path: &FieldPath,
) -> Result<PathTarget<'m>, PathError> {
    let mut segments: &[String] = &path.segments;
    let mut prefix = None;
    if let Some(first) = segments.first() {
        let shadowed = owner.field(first).is_some() || owner.relation(first).is_some();
        if segments.len() > 1 && !shadowed && Trigger::record_names().any(|r| r == first) {
            prefix = Some(first.clone());
            segments = &segments[1..];
        }
    }

    match segments {
        [field] => {
            if owner.relation(field).is_some() && owner.field(field).is_none() {
                return Err(PathError::BareRelation(field.clone()));
            }
            let (domain_type, enum_values) =
                lookup_field(owner, field).ok_or_else(|| PathError::UnknownField {
                    entity: owner.name.clone(),
                    field: field.clone(),
                })?;
            Ok(PathTarget {
                prefix,
                relation: None,
                field: field.clone(),
                domain_type,
                enum_values,
            })
        }
        [rel_name, field] => {
            let relation = owner
                .relation(rel_name)
                .ok_or_else(|| PathError::UnknownRelation {
                    entity: owner.name.clone(),
                    relation: rel_name.clone(),
                })?;
            if relation.kind.is_collection() {
                return Err(PathError::CollectionRelation(rel_name.clone()));
            }
            let target = entities
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(&relation.target))
                .ok_or_else(|| PathError::UnknownRelation {
                    entity: owner.name.clone(),
                    relation: rel_name.clone(),
                })?;
            let (domain_type, enum_values) =
                lookup_field(target, field).ok_or_else(|| PathError::UnknownField {
                    entity: target.name.clone(),
                    field: field.clone(),
                })?;
            Ok(PathTarget {
                prefix,
                relation: Some(relation),
                field: field.clone(),
                domain_type,
                enum_values,
            })
        }
        _ => Err(PathError::TooDeep(path.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ArtifactFlags, Field, FieldConstraints, RelationKind};

    fn field(name: &str, domain_type: DomainType) -> Field {
        Field {
            name: name.into(),
            domain_type,
            constraints: FieldConstraints::default(),
        }
    }

    fn entities() -> Vec<Entity> {
        vec![
            Entity {
                name: "Task".into(),
                fields: vec![
                    field("title", DomainType::String),
                    field("completed", DomainType::Boolean),
                ],
                relations: vec![
                    Relation {
                        name: "project".into(),
                        target: "Project".into(),
                        kind: RelationKind::ManyToOne,
                    },
                    Relation {
                        name: "tags".into(),
                        target: "Project".into(),
                        kind: RelationKind::ManyToMany,
                    },
                ],
                flags: ArtifactFlags::default(),
            },
            Entity {
                name: "Project".into(),
                fields: vec![field("name", DomainType::String)],
                relations: vec![],
                flags: ArtifactFlags::default(),
            },
        ]
    }

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    #[test]
    fn test_resolves_own_and_related_fields() {
        let all = entities();
        let task = &all[0];
        let own = resolve_path(&all, task, &path("completed")).unwrap();
        assert_eq!(own.domain_type, DomainType::Boolean);
        assert!(own.relation.is_none());

        let related = resolve_path(&all, task, &path("project.name")).unwrap();
        assert_eq!(related.relation.map(|r| r.name.as_str()), Some("project"));
        assert_eq!(related.domain_type, DomainType::String);

        let id = resolve_path(&all, task, &path("project.id")).unwrap();
        assert_eq!(id.domain_type, DomainType::Uuid);
    }

    #[test]
    fn test_record_prefix_is_stripped() {
        let all = entities();
        let target = resolve_path(&all, &all[0], &path("candidate.completed")).unwrap();
        assert_eq!(target.prefix.as_deref(), Some("candidate"));
        assert_eq!(target.field, "completed");
    }

    #[test]
    fn test_rejects_unknown_and_collection_paths() {
        let all = entities();
        let task = &all[0];
        assert!(matches!(
            resolve_path(&all, task, &path("priority")),
            Err(PathError::UnknownField { .. })
        ));
        assert!(matches!(
            resolve_path(&all, task, &path("owner.name")),
            Err(PathError::UnknownRelation { .. })
        ));
        assert_eq!(
            resolve_path(&all, task, &path("tags.name")).unwrap_err(),
            PathError::CollectionRelation("tags".into())
        );
        assert_eq!(
            resolve_path(&all, task, &path("project")).unwrap_err(),
            PathError::BareRelation("project".into())
        );
        assert!(matches!(
            resolve_path(&all, task, &path("project.owner.name")),
            Err(PathError::TooDeep(_))
        ));
    }
}
