//! Names and type tokens for one entity, looked up once per pipeline.

use crate::naming::{
    to_camel_case, ts_number_literal, ts_string_literal, ts_value_literal, DomainType, NameForms,
    TypeResolutionError, TypeTables,
};
use crate::rules::ID_FIELD;
use crate::spec::{Entity, Field, Relation};

#[derive(Debug, Clone)]
pub struct ResolvedField<'m> {
    pub field: &'m Field,
    /// Property name on the generated record type.
    pub prop: String,
    pub storage: String,
    pub validation: String,
    /// `(const name, type alias)` for enum fields.
    pub enum_names: Option<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct ResolvedRelation<'m> {
    pub relation: &'m Relation,
    pub prop: String,
    pub target: NameForms,
    /// Foreign key property, for relations whose owner stores the key.
    pub fk_prop: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedEntity<'m> {
    pub entity: &'m Entity,
    pub names: NameForms,
    pub fields: Vec<ResolvedField<'m>>,
    pub relations: Vec<ResolvedRelation<'m>>,
    /// Storage and validation tokens for the id and foreign key columns.
    pub key_storage: String,
    pub key_validation: String,
}

/// Look up every field's storage and validation type.
///
/// The first unmapped type fails the whole entity.
pub fn resolve_entity<'m>(
    entity: &'m Entity,
    tables: &TypeTables,
) -> Result<ResolvedEntity<'m>, TypeResolutionError> {
    let names = NameForms::of(&entity.name);

    let mut fields = Vec::with_capacity(entity.fields.len());
    for field in &entity.fields {
        let storage = tables.storage_type(field.domain_type, &field.name)?;
        let validation = tables.validation_type(field.domain_type, &field.name)?;
        let field_names = NameForms::of(&field.name);
        let enum_names = (field.domain_type == DomainType::Enum).then(|| {
            (
                format!("{}_{}_VALUES", names.constant(), field_names.constant()),
                format!("{}{}", names.upper_camel, field_names.upper_camel),
            )
        });
        fields.push(ResolvedField {
            field,
            prop: field_names.lower_camel,
            storage: storage.to_string(),
            validation: validation.to_string(),
            enum_names,
        });
    }

    let key_storage = tables.storage_type(DomainType::Uuid, ID_FIELD)?.to_string();
    let key_validation = tables.validation_type(DomainType::Uuid, ID_FIELD)?.to_string();

    let relations = entity
        .relations
        .iter()
        .map(|relation| {
            let prop = to_camel_case(&relation.name);
            ResolvedRelation {
                fk_prop: relation
                    .kind
                    .owns_foreign_key()
                    .then(|| format!("{prop}Id")),
                prop,
                target: NameForms::of(&relation.target),
                relation,
            }
        })
        .collect();

    Ok(ResolvedEntity {
        entity,
        names,
        fields,
        relations,
        key_storage,
        key_validation,
    })
}

impl ResolvedField<'_> {
    /// TypeScript type of the property.
    pub fn ts_type(&self) -> String {
        match &self.enum_names {
            Some((_, alias)) => alias.clone(),
            None => self.field.domain_type.ts_type().to_string(),
        }
    }

    /// Zod expression validating the property on create.
    pub fn schema_expr(&self) -> String {
        let c = &self.field.constraints;
        let mut expr = match &self.enum_names {
            Some((constant, _)) => format!("{}({constant})", self.validation),
            None => self.validation.clone(),
        };

        match self.field.domain_type {
            DomainType::String => {
                if let Some(min) = c.min_length {
                    expr.push_str(&format!(".min({min})"));
                }
                if let Some(max) = c.max_length {
                    expr.push_str(&format!(".max({max})"));
                }
                if let Some(pattern) = &c.pattern {
                    expr.push_str(&format!(
                        ".regex(new RegExp({}))",
                        ts_string_literal(pattern)
                    ));
                }
            }
            DomainType::Integer => {
                if let Some(min) = c.min {
                    expr.push_str(&format!(".min({})", ts_number_literal(min)));
                }
                if let Some(max) = c.max {
                    expr.push_str(&format!(".max({})", ts_number_literal(max)));
                }
            }
            DomainType::Decimal => {
                if let Some(min) = c.min {
                    let min = ts_number_literal(min);
                    expr.push_str(&format!(
                        ".refine((value) => Number(value) >= {min}, {{ message: {} }})",
                        ts_string_literal(&format!("{} must be at least {min}", self.prop))
                    ));
                }
                if let Some(max) = c.max {
                    let max = ts_number_literal(max);
                    expr.push_str(&format!(
                        ".refine((value) => Number(value) <= {max}, {{ message: {} }})",
                        ts_string_literal(&format!("{} must be at most {max}", self.prop))
                    ));
                }
            }
            _ => {}
        }

        match &c.default {
            Some(default) => {
                let literal = match (self.field.domain_type, default) {
                    (DomainType::Decimal, serde_json::Value::Number(n)) => {
                        ts_string_literal(&n.to_string())
                    }
                    _ => ts_value_literal(default),
                };
                expr.push_str(&format!(".default({literal})"));
            }
            None if !c.required => expr.push_str(".optional()"),
            None => {}
        }
        expr
    }

    /// Storage column descriptor object literal.
    pub fn column(&self) -> String {
        let c = &self.field.constraints;
        let mut parts = vec![
            format!("type: {}", ts_string_literal(&self.storage)),
            format!("nullable: {}", !self.field.is_present()),
        ];
        if c.unique {
            parts.push("unique: true".to_string());
        }
        if let Some((constant, _)) = &self.enum_names {
            parts.push(format!("values: {constant}"));
        }
        format!("{{ {} }}", parts.join(", "))
    }
}
