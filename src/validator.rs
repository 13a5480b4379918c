//! Validation issues reported against a project specification.
//!
//! Validation is exhaustive: the validator keeps going after the first
//! problem and hands back every [`ValidationIssue`] it found, each tagged
//! with a stable [`IssueKind`] and a location such as
//! `entity:Task/field:title`.

use std::fmt;

/// Stable classification of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueKind {
    InvalidName,
    DuplicateEntity,
    DuplicateField,
    DuplicateRelation,
    DuplicateRule,
    DuplicateIntegration,
    DuplicateMethod,
    DuplicateWorker,
    /// Two names that differ in spelling but stamp the same file or identifier.
    NameCollision,
    UndefinedEntity,
    UndefinedRelationTarget,
    UndefinedField,
    UndefinedIntegration,
    UndefinedMethod,
    UnknownDomainType,
    UnknownTrigger,
    UnknownRuleKind,
    UnknownRelationKind,
    UnknownWorkerMode,
    InvalidCondition,
    MissingCondition,
    MissingAction,
    MissingCapability,
    InconsistentConstraint,
    InvalidWorker,
    MissingService,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::InvalidName => "InvalidName",
            IssueKind::DuplicateEntity => "DuplicateEntity",
            IssueKind::DuplicateField => "DuplicateField",
            IssueKind::DuplicateRelation => "DuplicateRelation",
            IssueKind::DuplicateRule => "DuplicateRule",
            IssueKind::DuplicateIntegration => "DuplicateIntegration",
            IssueKind::DuplicateMethod => "DuplicateMethod",
            IssueKind::DuplicateWorker => "DuplicateWorker",
            IssueKind::NameCollision => "NameCollision",
            IssueKind::UndefinedEntity => "UndefinedEntity",
            IssueKind::UndefinedRelationTarget => "UndefinedRelationTarget",
            IssueKind::UndefinedField => "UndefinedField",
            IssueKind::UndefinedIntegration => "UndefinedIntegration",
            IssueKind::UndefinedMethod => "UndefinedMethod",
            IssueKind::UnknownDomainType => "UnknownDomainType",
            IssueKind::UnknownTrigger => "UnknownTrigger",
            IssueKind::UnknownRuleKind => "UnknownRuleKind",
            IssueKind::UnknownRelationKind => "UnknownRelationKind",
            IssueKind::UnknownWorkerMode => "UnknownWorkerMode",
            IssueKind::InvalidCondition => "InvalidCondition",
            IssueKind::MissingCondition => "MissingCondition",
            IssueKind::MissingAction => "MissingAction",
            IssueKind::MissingCapability => "MissingCapability",
            IssueKind::InconsistentConstraint => "InconsistentConstraint",
            IssueKind::InvalidWorker => "InvalidWorker",
            IssueKind::MissingService => "MissingService",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Where the issue occurred (e.g. `entity:Task/field:title`, `rule:hide completed`)
    pub location: String,
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(location: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        ValidationIssue {
            location: location.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

/// Print issues to stderr in the CLI's report format.
pub fn print_issues(issues: &[ValidationIssue]) {
    eprintln!(
        "\n❌ Project spec validation failed. {} issue(s) found:\n",
        issues.len()
    );
    for issue in issues {
        eprintln!("{issue}");
    }
    eprintln!("\nPlease fix the issues in your project spec before generating.\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_display() {
        let issue = ValidationIssue::new(
            "entity:Task/relation:project",
            IssueKind::UndefinedRelationTarget,
            "relation `project` targets undefined entity `Project`",
        );
        assert_eq!(
            issue.to_string(),
            "[UndefinedRelationTarget] entity:Task/relation:project: relation `project` targets undefined entity `Project`"
        );
    }
}
