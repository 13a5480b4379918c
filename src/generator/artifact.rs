use std::collections::BTreeMap;
use std::fmt;

/// Artifact kinds, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    Support,
    Entity,
    Integration,
    Enforcer,
    Auditor,
    Service,
    Controller,
    Worker,
    Module,
    Manifest,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Support => "support",
            ArtifactKind::Entity => "entity",
            ArtifactKind::Integration => "integration",
            ArtifactKind::Enforcer => "enforcer",
            ArtifactKind::Auditor => "auditor",
            ArtifactKind::Service => "service",
            ArtifactKind::Controller => "controller",
            ArtifactKind::Worker => "worker",
            ArtifactKind::Module => "module",
            ArtifactKind::Manifest => "manifest",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical name of an artifact: its kind plus the kebab-case name it is
/// filed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactRef {
    pub kind: ArtifactKind,
    pub name: String,
}

impl ArtifactRef {
    pub fn new(kind: ArtifactKind, name: impl Into<String>) -> Self {
        ArtifactRef {
            kind,
            name: name.into(),
        }
    }

    pub fn support(name: &str) -> Self {
        ArtifactRef::new(ArtifactKind::Support, name)
    }

    pub fn module() -> Self {
        ArtifactRef::new(ArtifactKind::Module, "app")
    }

    /// Path of the emitted file relative to the output root.
    pub fn path(&self) -> String {
        match self.kind {
            ArtifactKind::Support => format!("runtime/{}.ts", self.name),
            ArtifactKind::Entity => format!("entities/{}.entity.ts", self.name),
            ArtifactKind::Integration => format!("integrations/{}.integration.ts", self.name),
            ArtifactKind::Enforcer => format!("enforcers/{}.enforcer.ts", self.name),
            ArtifactKind::Auditor => format!("auditors/{}.auditor.ts", self.name),
            ArtifactKind::Service => format!("services/{}.service.ts", self.name),
            ArtifactKind::Controller => format!("controllers/{}.controller.ts", self.name),
            ArtifactKind::Worker => format!("workers/{}.worker.ts", self.name),
            ArtifactKind::Module => format!("{}.module.ts", self.name),
            ArtifactKind::Manifest => format!("{}.manifest.json", self.name),
        }
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImportSource {
    /// Third-party package, passed through verbatim.
    Package(String),
    /// Another generated artifact; resolved by the assembler.
    Artifact(ArtifactRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub source: ImportSource,
    pub symbols: Vec<String>,
    pub type_only: bool,
}

impl ImportSpec {
    pub fn package(name: &str, symbols: &[&str]) -> Self {
        ImportSpec {
            source: ImportSource::Package(name.to_string()),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            type_only: false,
        }
    }

    pub fn values(target: ArtifactRef, symbols: impl IntoIterator<Item = String>) -> Self {
        ImportSpec {
            source: ImportSource::Artifact(target),
            symbols: symbols.into_iter().collect(),
            type_only: false,
        }
    }

    pub fn types(target: ArtifactRef, symbols: impl IntoIterator<Item = String>) -> Self {
        ImportSpec {
            type_only: true,
            ..ImportSpec::values(target, symbols)
        }
    }

    pub fn artifact(&self) -> Option<&ArtifactRef> {
        match &self.source {
            ImportSource::Artifact(target) => Some(target),
            ImportSource::Package(_) => None,
        }
    }
}

/// One rendered file before import resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub reference: ArtifactRef,
    /// Rendered content without the import block.
    pub body: String,
    pub imports: Vec<ImportSpec>,
    /// Entity whose pipeline produced the artifact.
    pub owner: Option<String>,
}

impl GeneratedArtifact {
    pub fn path(&self) -> String {
        self.reference.path()
    }
}

/// Module specifier for importing `to` from the file at `from`, e.g.
/// `../entities/task.entity`.
pub fn relative_specifier(from: &str, to: &str) -> String {
    let from_dirs: Vec<&str> = from.split('/').collect();
    let from_dirs = &from_dirs[..from_dirs.len().saturating_sub(1)];
    let to_parts: Vec<&str> = to.split('/').collect();

    let common = from_dirs
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut spec = String::new();
    if common == from_dirs.len() {
        spec.push_str("./");
    } else {
        for _ in common..from_dirs.len() {
            spec.push_str("../");
        }
    }
    spec.push_str(&to_parts[common..].join("/"));
    spec.strip_suffix(".ts").map(str::to_string).unwrap_or(spec)
}

/// Render the import block of `from`, merging specs per source.
pub fn render_imports(from: &str, imports: &[ImportSpec]) -> String {
    let mut merged: BTreeMap<&ImportSource, (Vec<&str>, bool)> = BTreeMap::new();
    for import in imports {
        let entry = merged.entry(&import.source).or_insert((Vec::new(), true));
        entry.0.extend(import.symbols.iter().map(String::as_str));
        entry.1 &= import.type_only;
    }

    let mut out = String::new();
    for (source, (mut symbols, type_only)) in merged {
        symbols.sort_unstable();
        symbols.dedup();
        let specifier = match source {
            ImportSource::Package(name) => name.clone(),
            ImportSource::Artifact(target) => relative_specifier(from, &target.path()),
        };
        let keyword = if type_only { "import type" } else { "import" };
        out.push_str(&format!(
            "{keyword} {{ {} }} from '{specifier}';\n",
            symbols.join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(
            ArtifactRef::new(ArtifactKind::Entity, "task").path(),
            "entities/task.entity.ts"
        );
        assert_eq!(
            ArtifactRef::new(ArtifactKind::Enforcer, "hide-completed").path(),
            "enforcers/hide-completed.enforcer.ts"
        );
        assert_eq!(ArtifactRef::module().path(), "app.module.ts");
        assert_eq!(ArtifactRef::support("errors").path(), "runtime/errors.ts");
    }

    #[test]
    fn test_relative_specifier() {
        assert_eq!(
            relative_specifier("services/task.service.ts", "entities/task.entity.ts"),
            "../entities/task.entity"
        );
        assert_eq!(
            relative_specifier("app.module.ts", "services/task.service.ts"),
            "./services/task.service"
        );
        assert_eq!(
            relative_specifier("runtime/rules.ts", "runtime/errors.ts"),
            "./errors"
        );
    }

    #[test]
    fn test_render_imports_merges_and_orders() {
        let entity = ArtifactRef::new(ArtifactKind::Entity, "task");
        let imports = vec![
            ImportSpec::types(entity.clone(), ["Task".to_string()]),
            ImportSpec::values(entity, ["TaskSchema".to_string()]),
            ImportSpec::package("zod", &["z"]),
            ImportSpec::types(ArtifactRef::support("context"), ["CallerContext".to_string()]),
        ];
        assert_eq!(
            render_imports("services/task.service.ts", &imports),
            "import { z } from 'zod';\n\
             import type { CallerContext } from '../runtime/context';\n\
             import { Task, TaskSchema } from '../entities/task.entity';\n"
        );
    }
}
