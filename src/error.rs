//! Top-level error kinds of a generation run.
//!
//! Stage-local kinds live next to the stage that raises them:
//! [`crate::naming::TypeResolutionError`], [`crate::rules::RuleCompilationError`],
//! [`crate::generator::PipelineFailure`] and [`crate::generator::AssemblyError`].

use std::fmt;

use thiserror::Error;

use crate::generator::{AssemblyError, EntityFailure};
use crate::validator::ValidationIssue;

/// Every structural problem found in a project spec. Generation does not
/// start when this is raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("project spec failed validation with {} issue(s)", .0.len())]
pub struct SpecValidationError(pub Vec<ValidationIssue>);

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    SpecValidation(#[from] SpecValidationError),
    /// Strict mode escalates any failed entity to a full abort.
    #[error("{} entit(y/ies) failed in strict mode: {}", .0.len(), Names(.0))]
    StrictFailure(Vec<EntityFailure>),
    /// Nothing was written.
    #[error("assembly aborted with {} error(s): {}", .0.len(), Joined(.0))]
    Assembly(Vec<AssemblyError>),
}

struct Names<'a>(&'a [EntityFailure]);

impl fmt::Display for Names<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|e| e.entity.as_str()).collect();
        f.write_str(&names.join(", "))
    }
}

struct Joined<'a>(&'a [AssemblyError]);

impl fmt::Display for Joined<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}
