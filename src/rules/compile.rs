use thiserror::Error;
use tracing::debug;

use super::expr::{CompareOp, Expr, FieldPath, Literal, Operand};
use super::{resolve_path, PathTarget};
use crate::naming::{to_camel_case, ts_string_literal, DomainType, NameForms};
use crate::spec::{Entity, Model, Rule, RuleAction, RuleKind, Trigger};

/// Raised when a validated rule cannot be turned into guard logic.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleCompilationError {
    #[error("rule `{rule}`: `{path}` binds `{found}` but {trigger} supplies `{expected}`")]
    WrongBinding {
        rule: String,
        path: String,
        found: String,
        expected: String,
        trigger: Trigger,
    },
    #[error("rule `{rule}`: {reason}")]
    UnresolvedPath { rule: String, reason: String },
    #[error("rule `{rule}`: {detail}")]
    TypeMismatch { rule: String, detail: String },
    #[error("rule `{rule}`: `{value}` is not a value of `{field}` (expected one of {allowed})")]
    NotEnumMember {
        rule: String,
        field: String,
        value: String,
        allowed: String,
    },
    #[error("rule `{rule}`: parameter `{param}` of `{method}` has no argument and no same-named field")]
    UnboundArgument {
        rule: String,
        method: String,
        param: String,
    },
    #[error("rule `{rule}`: `{integration}.{method}` is not a declared integration method")]
    UnknownTarget {
        rule: String,
        integration: String,
        method: String,
    },
    #[error("rule `{rule}`: owning entity `{entity}` is not defined")]
    UnknownEntity { rule: String, entity: String },
    #[error("rule `{rule}`: a {kind} rule needs {needs}")]
    Incomplete {
        rule: String,
        kind: &'static str,
        needs: &'static str,
    },
}

/// A compiled rule, ready to render as an enforcer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFragment {
    pub rule: String,
    pub names: NameForms,
    pub entity: String,
    pub trigger: Trigger,
    /// Record identifier the guard reads.
    pub binding: &'static str,
    pub guard: Guard,
    pub message: Option<String>,
    /// Entities reached through relation paths, in first-use order.
    pub related_entities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Reject the operation when the predicate holds.
    Reject { predicate: String },
    /// Call an integration method, optionally only when the predicate holds.
    Invoke {
        predicate: Option<String>,
        integration: String,
        method: String,
        args: Vec<InvokeArg>,
    },
    /// Require a caller capability, optionally only when the predicate holds.
    Require {
        predicate: Option<String>,
        capability: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeArg {
    pub param: String,
    /// Target-language expression reading the bound record.
    pub expression: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Text,
    Number,
    Bool,
    Null,
    Opaque,
}

fn family(domain: DomainType) -> Family {
    match domain {
        d if d.is_string_like() => Family::Text,
        d if d.is_numeric() => Family::Number,
        DomainType::Boolean => Family::Bool,
        _ => Family::Opaque,
    }
}

struct Compiler<'m> {
    model: &'m Model,
    owner: &'m Entity,
    rule: &'m Rule,
    binding: &'static str,
    related: Vec<String>,
}

struct Emitted<'m> {
    text: String,
    family: Family,
    target: Option<PathTarget<'m>>,
}

impl<'m> Compiler<'m> {
    fn resolve(&mut self, path: &FieldPath) -> Result<PathTarget<'m>, RuleCompilationError> {
        let target = resolve_path(&self.model.entities, self.owner, path).map_err(|e| {
            RuleCompilationError::UnresolvedPath {
                rule: self.rule.name.clone(),
                reason: e.to_string(),
            }
        })?;
        if let Some(prefix) = &target.prefix {
            if prefix != self.binding {
                return Err(RuleCompilationError::WrongBinding {
                    rule: self.rule.name.clone(),
                    path: path.to_string(),
                    found: prefix.clone(),
                    expected: self.binding.to_string(),
                    trigger: self.rule.trigger,
                });
            }
        }
        if let Some(rel) = target.relation {
            if !self.related.iter().any(|r| r == &rel.target) {
                self.related.push(rel.target.clone());
            }
        }
        Ok(target)
    }

    fn access(&self, target: &PathTarget<'_>) -> String {
        match target.relation {
            Some(rel) => format!(
                "{}.{}?.{}",
                self.binding,
                to_camel_case(&rel.name),
                to_camel_case(&target.field)
            ),
            None => format!("{}.{}", self.binding, to_camel_case(&target.field)),
        }
    }

    fn operand(&mut self, operand: &Operand) -> Result<Emitted<'m>, RuleCompilationError> {
        Ok(match operand {
            Operand::Path(path) => {
                let target = self.resolve(path)?;
                Emitted {
                    text: self.access(&target),
                    family: family(target.domain_type),
                    target: Some(target),
                }
            }
            Operand::Literal(Literal::String(s)) => Emitted {
                text: ts_string_literal(s),
                family: Family::Text,
                target: None,
            },
            Operand::Literal(Literal::Number(n)) => Emitted {
                text: n.clone(),
                family: Family::Number,
                target: None,
            },
            Operand::Literal(Literal::Bool(b)) => Emitted {
                text: b.to_string(),
                family: Family::Bool,
                target: None,
            },
            Operand::Literal(Literal::Null) => Emitted {
                text: "null".to_string(),
                family: Family::Null,
                target: None,
            },
        })
    }

    fn mismatch(&self, detail: String) -> RuleCompilationError {
        RuleCompilationError::TypeMismatch {
            rule: self.rule.name.clone(),
            detail,
        }
    }

    fn check_enum(&self, side: &Emitted<'_>, other: &Operand) -> Result<(), RuleCompilationError> {
        let (Some(target), Operand::Literal(Literal::String(value))) = (&side.target, other) else {
            return Ok(());
        };
        if target.domain_type != DomainType::Enum || target.enum_values.contains(value) {
            return Ok(());
        }
        Err(RuleCompilationError::NotEnumMember {
            rule: self.rule.name.clone(),
            field: target.field.clone(),
            value: value.clone(),
            allowed: target.enum_values.join(", "),
        })
    }

    fn compare(
        &mut self,
        left: &Operand,
        op: CompareOp,
        right: &Operand,
    ) -> Result<String, RuleCompilationError> {
        let mut lhs = self.operand(left)?;
        let mut rhs = self.operand(right)?;

        if lhs.target.is_none() && rhs.target.is_none() {
            return Err(self.mismatch(format!(
                "comparison of two literals ({} and {}) does not read the record",
                lhs.text, rhs.text
            )));
        }

        if lhs.family == Family::Null || rhs.family == Family::Null {
            let js_op = match op {
                CompareOp::Eq => "==",
                CompareOp::Ne => "!=",
                _ => return Err(self.mismatch("`null` only supports `==` and `!=`".into())),
            };
            return Ok(format!("{} {js_op} {}", lhs.text, rhs.text));
        }

        if lhs.family == Family::Opaque || rhs.family == Family::Opaque || lhs.family != rhs.family
        {
            return Err(self.mismatch(format!(
                "cannot compare `{}` with `{}`",
                describe(&lhs),
                describe(&rhs)
            )));
        }
        if op.is_ordering() && lhs.family == Family::Bool {
            return Err(self.mismatch("booleans have no ordering".into()));
        }

        self.check_enum(&lhs, right)?;
        self.check_enum(&rhs, left)?;

        // Decimals travel as strings; compare them numerically.
        for side in [&mut lhs, &mut rhs] {
            if side
                .target
                .as_ref()
                .is_some_and(|t| t.domain_type == DomainType::Decimal)
            {
                side.text = format!("Number({})", side.text);
            }
        }

        let js_op = match op {
            CompareOp::Eq => "===",
            CompareOp::Ne => "!==",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        Ok(format!("{} {js_op} {}", lhs.text, rhs.text))
    }

    fn emit(&mut self, expr: &Expr) -> Result<String, RuleCompilationError> {
        match expr {
            Expr::Or(a, b) => Ok(format!("{} || {}", self.emit(a)?, self.emit(b)?)),
            Expr::And(a, b) => {
                let left = self.emit_operand_of_and(a)?;
                let right = self.emit_operand_of_and(b)?;
                Ok(format!("{left} && {right}"))
            }
            Expr::Not(inner) => Ok(format!("!({})", self.emit(inner)?)),
            Expr::Compare { left, op, right } => self.compare(left, *op, right),
            Expr::Truthy(path) => {
                let target = self.resolve(path)?;
                if target.domain_type != DomainType::Boolean {
                    return Err(self.mismatch(format!(
                        "`{path}` is {} and cannot be used as a condition on its own",
                        target.domain_type
                    )));
                }
                Ok(format!("{} === true", self.access(&target)))
            }
            Expr::Const(b) => Ok(b.to_string()),
        }
    }

    fn emit_operand_of_and(&mut self, expr: &Expr) -> Result<String, RuleCompilationError> {
        let text = self.emit(expr)?;
        Ok(if matches!(expr, Expr::Or(..)) {
            format!("({text})")
        } else {
            text
        })
    }

    fn predicate(&mut self) -> Result<Option<String>, RuleCompilationError> {
        match &self.rule.condition {
            Some(expr) => self.emit(expr).map(Some),
            None => Ok(None),
        }
    }

    fn incomplete(&self, needs: &'static str) -> RuleCompilationError {
        RuleCompilationError::Incomplete {
            rule: self.rule.name.clone(),
            kind: self.rule.kind.as_str(),
            needs,
        }
    }

    fn guard(&mut self) -> Result<(Guard, Option<String>), RuleCompilationError> {
        match self.rule.kind {
            RuleKind::Constraint => {
                let predicate = self
                    .predicate()?
                    .ok_or_else(|| self.incomplete("a condition"))?;
                let Some(RuleAction::Reject(message)) = &self.rule.action else {
                    return Err(self.incomplete("a reject action"));
                };
                let message = self.rule.message.clone().unwrap_or_else(|| message.clone());
                Ok((Guard::Reject { predicate }, Some(message)))
            }
            RuleKind::SideEffect => {
                let predicate = self.predicate()?;
                let Some(RuleAction::Invoke(target)) = &self.rule.action else {
                    return Err(self.incomplete("an invoke action"));
                };
                let unknown = || RuleCompilationError::UnknownTarget {
                    rule: self.rule.name.clone(),
                    integration: target.integration.clone(),
                    method: target.method.clone(),
                };
                let integration = self.model.integration(&target.integration).ok_or_else(unknown)?;
                let method = integration.method(&target.method).ok_or_else(unknown)?;

                let mut args = Vec::with_capacity(method.params.len());
                for (param, param_type) in &method.params {
                    let raw = target.args.get(param).cloned().unwrap_or_else(|| param.clone());
                    let path = FieldPath::parse(&raw).map_err(|_| {
                        RuleCompilationError::UnboundArgument {
                            rule: self.rule.name.clone(),
                            method: method.name.clone(),
                            param: param.clone(),
                        }
                    })?;
                    let resolved = match self.resolve(&path) {
                        Err(RuleCompilationError::UnresolvedPath { .. })
                            if !target.args.contains_key(param) =>
                        {
                            return Err(RuleCompilationError::UnboundArgument {
                                rule: self.rule.name.clone(),
                                method: method.name.clone(),
                                param: param.clone(),
                            })
                        }
                        other => other?,
                    };
                    let param_family = family(*param_type);
                    let arg_family = family(resolved.domain_type);
                    if param_family != arg_family && param_family != Family::Opaque {
                        return Err(self.mismatch(format!(
                            "argument `{raw}` ({}) does not fit parameter `{param}` ({param_type})",
                            resolved.domain_type
                        )));
                    }
                    args.push(InvokeArg {
                        param: param.clone(),
                        expression: self.access(&resolved),
                    });
                }
                Ok((
                    Guard::Invoke {
                        predicate,
                        integration: integration.name.clone(),
                        method: method.name.clone(),
                        args,
                    },
                    self.rule.message.clone(),
                ))
            }
            RuleKind::Permission => {
                let predicate = self.predicate()?;
                let capability = self
                    .rule
                    .capability
                    .clone()
                    .ok_or_else(|| self.incomplete("a capability"))?;
                let message = self
                    .rule
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Missing capability `{capability}`"));
                Ok((
                    Guard::Require {
                        predicate,
                        capability,
                    },
                    Some(message),
                ))
            }
        }
    }
}

fn describe(side: &Emitted<'_>) -> String {
    match &side.target {
        Some(t) => format!("{} ({})", t.field, t.domain_type),
        None => side.text.clone(),
    }
}

/// Compile one rule against its owning entity.
pub fn compile_rule(model: &Model, rule: &Rule) -> Result<RuleFragment, RuleCompilationError> {
    let owner = model
        .entity(&rule.entity)
        .ok_or_else(|| RuleCompilationError::UnknownEntity {
            rule: rule.name.clone(),
            entity: rule.entity.clone(),
        })?;
    let mut compiler = Compiler {
        model,
        owner,
        rule,
        binding: rule.trigger.binding(),
        related: Vec::new(),
    };
    let (guard, message) = compiler.guard()?;
    debug!(rule = %rule.name, entity = %owner.name, trigger = %rule.trigger, "compiled rule");
    Ok(RuleFragment {
        rule: rule.name.clone(),
        names: NameForms::of(&rule.name),
        entity: owner.name.clone(),
        trigger: rule.trigger,
        binding: compiler.binding,
        guard,
        message,
        related_entities: compiler.related,
    })
}
