//! # Naming Module
//!
//! Deterministic case transforms used to stamp every generated identifier.
//!
//! Every artifact that mentions an entity, field, rule or worker derives its
//! identifiers from the same [`NameForms`], so a `Task` entity is always
//! `Task` in type position, `task` in variable position, `task` in file names
//! and `tasks` for collections, no matter which template renders it.
//!
//! ## Word splitting
//!
//! A separator is inserted before an uppercase letter that follows a
//! non-uppercase character (`taskItem` → `task Item`, `a1B` → `a1 B`), then
//! whitespace, `_` and `-` split words. Runs of capitals stay together, so
//! `HTTPServer` is a single word. Words are lowercased before being recased,
//! which is what makes `to_pascal_case(&to_camel_case(s)) == to_pascal_case(s)`
//! hold for every input.
//!
//! ## Pluralization
//!
//! [`pluralize`] is a suffix heuristic, not a dictionary: irregular nouns such
//! as `person` come out as `persons`.

mod types;

pub use types::*;

/// The five canonical case forms of one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameForms {
    /// `TaskItem`
    pub upper_camel: String,
    /// `taskItem`
    pub lower_camel: String,
    /// `task-item`
    pub kebab: String,
    /// `task_item`
    pub snake: String,
    /// `taskItems` (plural of the lowerCamel form)
    pub plural: String,
}

impl NameForms {
    /// Derive all case forms from a raw identifier.
    pub fn of(raw: &str) -> Self {
        let lower_camel = to_camel_case(raw);
        NameForms {
            upper_camel: to_pascal_case(raw),
            kebab: to_kebab_case(raw),
            snake: to_snake_case(raw),
            plural: pluralize(&lower_camel),
            lower_camel,
        }
    }

    /// `SCREAMING_SNAKE` form, used for generated constants.
    pub fn constant(&self) -> String {
        self.snake.to_uppercase()
    }

    /// Kebab form of the plural, used for route segments (`/task-items`).
    pub fn plural_kebab(&self) -> String {
        to_kebab_case(&self.plural)
    }

    /// Snake form of the plural, used for storage table names.
    pub fn plural_snake(&self) -> String {
        to_snake_case(&self.plural)
    }
}

/// Split an identifier into lowercase words.
pub fn split_words(raw: &str) -> Vec<String> {
    let mut spaced = String::with_capacity(raw.len() + 4);
    let mut prev: Option<char> = None;
    for c in raw.chars() {
        if c.is_uppercase() {
            if let Some(p) = prev {
                if !p.is_uppercase() && !is_separator(p) {
                    spaced.push(' ');
                }
            }
        }
        spaced.push(c);
        prev = Some(c);
    }
    spaced
        .split(|c: char| is_separator(c))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == '_' || c == '-'
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// `task item` → `TaskItem`
pub fn to_pascal_case(raw: &str) -> String {
    split_words(raw).iter().map(|w| capitalize(w)).collect()
}

/// `task item` → `taskItem`
pub fn to_camel_case(raw: &str) -> String {
    split_words(raw)
        .iter()
        .enumerate()
        .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
        .collect()
}

/// `TaskItem` → `task-item`
pub fn to_kebab_case(raw: &str) -> String {
    split_words(raw).join("-")
}

/// `TaskItem` → `task_item`
pub fn to_snake_case(raw: &str) -> String {
    split_words(raw).join("_")
}

/// Suffix-based English pluralization.
///
/// ```rust
/// use worldbuilder::naming::pluralize;
///
/// assert_eq!(pluralize("category"), "categories");
/// assert_eq!(pluralize("box"), "boxes");
/// assert_eq!(pluralize("task"), "tasks");
/// ```
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    if word.len() > 1 && word.ends_with('y') {
        format!("{}ies", &word[..word.len() - 1])
    } else if word.ends_with('s') || word.ends_with('x') || word.ends_with('z') {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}

const TS_RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "implements", "import", "in", "instanceof", "interface", "let", "new", "null", "package",
    "private", "protected", "public", "return", "static", "super", "switch", "this", "throw",
    "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Make a case form safe to emit as a TypeScript identifier.
///
/// Reserved words gain a trailing underscore; a leading digit gains a
/// leading underscore.
pub fn ts_identifier(name: &str) -> String {
    let mut ident = if TS_RESERVED.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    };
    if ident.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

/// Single-quoted TypeScript string literal.
pub fn ts_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// TypeScript literal for a JSON value from a specification document.
pub fn ts_value_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => ts_string_literal(s),
        other => other.to_string(),
    }
}

/// TypeScript numeric literal; whole numbers lose the trailing `.0`.
pub fn ts_number_literal(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words_boundaries() {
        assert_eq!(split_words("taskItem"), vec!["task", "item"]);
        assert_eq!(split_words("Task Item"), vec!["task", "item"]);
        assert_eq!(split_words("task_item-list"), vec!["task", "item", "list"]);
        assert_eq!(split_words("HTTPServer"), vec!["httpserver"]);
        assert_eq!(split_words("a1B"), vec!["a1", "b"]);
        assert!(split_words("  __ ").is_empty());
    }

    #[test]
    fn test_case_forms() {
        let forms = NameForms::of("task item");
        assert_eq!(forms.upper_camel, "TaskItem");
        assert_eq!(forms.lower_camel, "taskItem");
        assert_eq!(forms.kebab, "task-item");
        assert_eq!(forms.snake, "task_item");
        assert_eq!(forms.plural, "taskItems");
        assert_eq!(forms.constant(), "TASK_ITEM");
        assert_eq!(forms.plural_kebab(), "task-items");
        assert_eq!(forms.plural_snake(), "task_items");
    }

    #[test]
    fn test_pascal_of_camel_converges() {
        let samples = [
            "task",
            "TaskItem",
            "task_item",
            "task-item list",
            "HTTPServer",
            "a1_b",
            "a._b",
            "x2Y3z",
            "already_camel",
            "__leading",
            "trailing__",
            "",
        ];
        for s in samples {
            assert_eq!(
                to_pascal_case(&to_camel_case(s)),
                to_pascal_case(s),
                "case family diverged for {s:?}"
            );
        }
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("task"), "tasks");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("status"), "statuses");
        assert_eq!(pluralize("quiz"), "quizes");
        assert_eq!(pluralize("y"), "ys");
        assert_eq!(pluralize(""), "");
        // known limitation, kept on purpose
        assert_eq!(pluralize("person"), "persons");
    }

    #[test]
    fn test_ts_identifier() {
        assert_eq!(ts_identifier("delete"), "delete_");
        assert_eq!(ts_identifier("title"), "title");
        assert_eq!(ts_identifier("1st"), "_1st");
    }

    #[test]
    fn test_ts_literals() {
        assert_eq!(ts_string_literal("it's"), r"'it\'s'");
        assert_eq!(ts_string_literal("a\\b\n"), r"'a\\b\n'");
        assert_eq!(ts_value_literal(&serde_json::json!("open")), "'open'");
        assert_eq!(ts_value_literal(&serde_json::json!(false)), "false");
        assert_eq!(ts_value_literal(&serde_json::json!(2.5)), "2.5");
        assert_eq!(ts_number_literal(3.0), "3");
        assert_eq!(ts_number_literal(-0.5), "-0.5");
    }
}
