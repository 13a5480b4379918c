use anyhow::Context;
use std::path::Path;

use super::types::ProjectSpec;

/// Read a project specification from disk.
///
/// `.yaml`/`.yml` files are parsed as YAML, anything else as JSON.
pub fn load_spec(path: impl AsRef<Path>) -> anyhow::Result<ProjectSpec> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read project spec: {}", path.display()))?;
    parse_spec(&content, is_yaml(path))
        .with_context(|| format!("Failed to parse project spec: {}", path.display()))
}

/// Parse a project specification from a string.
///
/// YAML rule actions are written as single-key maps (`action: { reject: ... }`)
/// in block or flow style, so enums are read through `singleton_map_recursive`
/// rather than serde_yaml's `!tag` encoding.
pub fn parse_spec(content: &str, yaml: bool) -> anyhow::Result<ProjectSpec> {
    let spec = if yaml {
        serde_yaml::with::singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(
            content,
        ))?
    } else {
        serde_json::from_str(content)?
    };
    Ok(spec)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::RuleAction;

    #[test]
    fn test_load_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("project.yaml");
        std::fs::write(
            &yaml,
            "name: Task Tracker\nentities:\n  - name: Task\n    fields:\n      - { name: title, type: string, required: true }\n",
        )
        .unwrap();
        let spec = load_spec(&yaml).unwrap();
        assert_eq!(spec.slug(), "task_tracker");
        assert_eq!(spec.entities[0].fields[0].domain_type, "string");
        assert!(spec.entities[0].fields[0].constraints.required);
        assert!(spec.entities[0].generate.service);
        assert!(!spec.entities[0].generate.auditor);

        let json = dir.path().join("project.json");
        std::fs::write(&json, r#"{"name": "Empty"}"#).unwrap();
        let spec = load_spec(&json).unwrap();
        assert!(spec.entities.is_empty());
    }

    #[test]
    fn test_parse_rule_actions() {
        let spec = parse_spec(
            r#"
name: X
rules:
  - { name: a, entity: T, trigger: before_create, kind: constraint, condition: "x == 1", action: { reject: "no" } }
  - name: b
    entity: T
    trigger: after_create
    kind: side_effect
    action: { invoke: { integration: email, method: send, args: { to: owner } } }
"#,
            true,
        )
        .unwrap();
        assert_eq!(spec.rules[0].action, Some(RuleAction::Reject("no".into())));
        let Some(RuleAction::Invoke(target)) = &spec.rules[1].action else {
            panic!("expected invoke action");
        };
        assert_eq!(target.args.get("to").map(String::as_str), Some("owner"));
    }

    #[test]
    fn test_block_style_rule_actions() {
        let spec = parse_spec(
            r#"
name: X
rules:
  - name: a
    entity: T
    trigger: before_create
    kind: constraint
    condition: "x == 1"
    action:
      reject: Completed tasks are locked
  - name: b
    entity: T
    trigger: after_update
    kind: side_effect
    action:
      invoke:
        integration: email
        method: send
        args:
          to: owner
"#,
            true,
        )
        .unwrap();
        assert_eq!(
            spec.rules[0].action,
            Some(RuleAction::Reject("Completed tasks are locked".into()))
        );
        let Some(RuleAction::Invoke(target)) = &spec.rules[1].action else {
            panic!("expected invoke action");
        };
        assert_eq!(target.integration, "email");
        assert_eq!(target.method, "send");
    }

    #[test]
    fn test_json_rule_actions() {
        let spec = parse_spec(
            r#"{"name": "X", "rules": [{"name": "a", "entity": "T", "trigger": "before_create",
                "kind": "constraint", "condition": "x == 1", "action": {"reject": "no"}}]}"#,
            false,
        )
        .unwrap();
        assert_eq!(spec.rules[0].action, Some(RuleAction::Reject("no".into())));
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = load_spec("/nonexistent/spec.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read project spec"));
    }
}
