use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// The fixed set of field types a project specification may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DomainType {
    String,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Uuid,
    Json,
    Enum,
}

impl DomainType {
    /// Every domain type, in declaration order.
    pub const ALL: [DomainType; 9] = [
        DomainType::String,
        DomainType::Integer,
        DomainType::Decimal,
        DomainType::Boolean,
        DomainType::Date,
        DomainType::DateTime,
        DomainType::Uuid,
        DomainType::Json,
        DomainType::Enum,
    ];

    /// Parse the spelling used in specification documents.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "string" => Some(DomainType::String),
            "integer" => Some(DomainType::Integer),
            "decimal" => Some(DomainType::Decimal),
            "boolean" => Some(DomainType::Boolean),
            "date" => Some(DomainType::Date),
            "datetime" => Some(DomainType::DateTime),
            "uuid" => Some(DomainType::Uuid),
            "json" => Some(DomainType::Json),
            "enum" => Some(DomainType::Enum),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DomainType::String => "string",
            DomainType::Integer => "integer",
            DomainType::Decimal => "decimal",
            DomainType::Boolean => "boolean",
            DomainType::Date => "date",
            DomainType::DateTime => "datetime",
            DomainType::Uuid => "uuid",
            DomainType::Json => "json",
            DomainType::Enum => "enum",
        }
    }

    /// TypeScript type of a value of this domain type.
    ///
    /// Decimals travel as strings to keep precision. Enums are rendered as a
    /// union alias per field, so this returns the widened `string`.
    pub fn ts_type(&self) -> &'static str {
        match self {
            DomainType::String
            | DomainType::Decimal
            | DomainType::Date
            | DomainType::DateTime
            | DomainType::Uuid
            | DomainType::Enum => "string",
            DomainType::Integer => "number",
            DomainType::Boolean => "boolean",
            DomainType::Json => "unknown",
        }
    }

    /// Types whose values are strings and accept length constraints.
    pub fn is_textual(&self) -> bool {
        matches!(self, DomainType::String)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DomainType::Integer | DomainType::Decimal)
    }

    /// Types that compare as strings in generated guards.
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            DomainType::String
                | DomainType::Date
                | DomainType::DateTime
                | DomainType::Uuid
                | DomainType::Enum
        )
    }

    /// Types with a meaningful `<`/`>` ordering.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, DomainType::Boolean | DomainType::Json)
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DomainType::parse(s).ok_or_else(|| format!("unknown domain type `{s}`"))
    }
}

/// Raised when a domain type has no entry in one of the lookup tables.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeResolutionError {
    #[error("field `{field}`: no storage type is mapped for domain type `{domain}`")]
    UnmappedStorage { field: String, domain: DomainType },
    #[error("field `{field}`: no validation type is mapped for domain type `{domain}`")]
    UnmappedValidation { field: String, domain: DomainType },
}

/// The two parallel domain-type lookup tables.
///
/// [`TypeTables::standard`] covers every [`DomainType`]. Configuration can
/// override tokens or drop types a target cannot store; lookups on a dropped
/// type fail instead of falling back to a generic type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTables {
    storage: BTreeMap<DomainType, String>,
    validation: BTreeMap<DomainType, String>,
}

impl TypeTables {
    pub fn standard() -> Self {
        let storage = [
            (DomainType::String, "varchar"),
            (DomainType::Integer, "integer"),
            (DomainType::Decimal, "numeric"),
            (DomainType::Boolean, "boolean"),
            (DomainType::Date, "date"),
            (DomainType::DateTime, "timestamptz"),
            (DomainType::Uuid, "uuid"),
            (DomainType::Json, "jsonb"),
            (DomainType::Enum, "enum"),
        ];
        let validation = [
            (DomainType::String, "z.string()"),
            (DomainType::Integer, "z.number().int()"),
            (DomainType::Decimal, r"z.string().regex(/^-?\d+(\.\d+)?$/)"),
            (DomainType::Boolean, "z.boolean()"),
            (DomainType::Date, "z.string().date()"),
            (DomainType::DateTime, "z.string().datetime()"),
            (DomainType::Uuid, "z.string().uuid()"),
            (DomainType::Json, "z.unknown()"),
            (DomainType::Enum, "z.enum"),
        ];
        TypeTables {
            storage: storage
                .into_iter()
                .map(|(t, s)| (t, s.to_string()))
                .collect(),
            validation: validation
                .into_iter()
                .map(|(t, s)| (t, s.to_string()))
                .collect(),
        }
    }

    /// Replace the storage token of one domain type.
    pub fn with_storage(mut self, domain: DomainType, token: impl Into<String>) -> Self {
        self.storage.insert(domain, token.into());
        self
    }

    /// Replace the validation token of one domain type.
    pub fn with_validation(mut self, domain: DomainType, token: impl Into<String>) -> Self {
        self.validation.insert(domain, token.into());
        self
    }

    /// Remove a domain type from the storage table.
    pub fn without_storage(mut self, domain: DomainType) -> Self {
        self.storage.remove(&domain);
        self
    }

    /// Remove a domain type from the validation table.
    pub fn without_validation(mut self, domain: DomainType) -> Self {
        self.validation.remove(&domain);
        self
    }

    pub fn storage_type(&self, domain: DomainType, field: &str) -> Result<&str, TypeResolutionError> {
        self.storage
            .get(&domain)
            .map(String::as_str)
            .ok_or_else(|| TypeResolutionError::UnmappedStorage {
                field: field.to_string(),
                domain,
            })
    }

    pub fn validation_type(
        &self,
        domain: DomainType,
        field: &str,
    ) -> Result<&str, TypeResolutionError> {
        self.validation
            .get(&domain)
            .map(String::as_str)
            .ok_or_else(|| TypeResolutionError::UnmappedValidation {
                field: field.to_string(),
                domain,
            })
    }
}

impl Default for TypeTables {
    fn default() -> Self {
        TypeTables::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_tables_cover_every_domain_type() {
        let tables = TypeTables::standard();
        for ty in DomainType::ALL {
            let storage = tables.storage_type(ty, "f").unwrap();
            let validation = tables.validation_type(ty, "f").unwrap();
            assert!(!storage.is_empty(), "{ty} has an empty storage token");
            assert!(!validation.is_empty(), "{ty} has an empty validation token");
            assert_ne!(validation, "z.any()", "{ty} falls through to a generic validator");
        }
    }

    #[test]
    fn test_parse_round_trips_spelling() {
        for ty in DomainType::ALL {
            assert_eq!(DomainType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(DomainType::parse(" DateTime "), Some(DomainType::DateTime));
        assert_eq!(DomainType::parse("money"), None);
        assert!("money".parse::<DomainType>().is_err());
    }

    #[test]
    fn test_removed_type_fails_instead_of_defaulting() {
        let tables = TypeTables::standard().without_storage(DomainType::Json);
        let err = tables.storage_type(DomainType::Json, "payload").unwrap_err();
        assert_eq!(
            err,
            TypeResolutionError::UnmappedStorage {
                field: "payload".into(),
                domain: DomainType::Json
            }
        );
        assert!(tables.validation_type(DomainType::Json, "payload").is_ok());
    }

    #[test]
    fn test_overrides_replace_tokens() {
        let tables = TypeTables::standard().with_storage(DomainType::Decimal, "numeric(12,2)");
        assert_eq!(
            tables.storage_type(DomainType::Decimal, "price").unwrap(),
            "numeric(12,2)"
        );
    }
}
