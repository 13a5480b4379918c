//! Output assembly: import resolution, emission order and write-out.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, error, info};

use super::artifact::{render_imports, ArtifactKind, ArtifactRef, GeneratedArtifact};
use super::render::RenderError;

/// Name the manifest is filed under.
pub const MANIFEST_NAME: &str = "worldbuilder";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("{from} imports {to}, which failed to generate")]
    ImportsFailedArtifact { from: String, to: String },
    #[error("{from} imports {to}, which is not part of the tree")]
    UnresolvedImport { from: String, to: String },
    #[error("{path} is produced more than once")]
    DuplicatePath { path: String },
    #[error("destination {path} already exists (use --force to replace it)")]
    DestinationExists { path: String },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to write {path}: {message}")]
    Write { path: String, message: String },
}

fn write_error(path: &Path) -> impl FnOnce(io::Error) -> AssemblyError + '_ {
    move |e| AssemblyError::Write {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedFile {
    /// Path relative to the output root.
    pub path: String,
    pub kind: ArtifactKind,
    pub contents: String,
}

impl EmittedFile {
    pub fn sha256(&self) -> String {
        Sha256::digest(self.contents.as_bytes())
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

#[derive(Serialize)]
struct Manifest<'a> {
    generator: &'static str,
    version: &'static str,
    files: Vec<ManifestEntry<'a>>,
}

#[derive(Serialize)]
struct ManifestEntry<'a> {
    path: &'a str,
    kind: &'static str,
    sha256: String,
}

/// A consistent, ordered set of files ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTree {
    files: Vec<EmittedFile>,
}

impl FileTree {
    /// Files in emission order, manifest last.
    pub fn files(&self) -> &[EmittedFile] {
        &self.files
    }

    pub fn file(&self, path: &str) -> Option<&EmittedFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write the tree to `dest` all-or-nothing.
    ///
    /// The tree is staged in a temporary directory beside `dest` and renamed
    /// into place. An existing `dest` is refused unless `force` is set, in
    /// which case it is moved aside and restored if the swap fails. The
    /// staging directory is removed on every path out of this function except
    /// a failed restore, where it is kept so the previous tree is not lost.
    pub fn write_to(&self, dest: &Path, force: bool) -> Result<(), AssemblyError> {
        let exists = dest.exists();
        if exists && !force {
            return Err(AssemblyError::DestinationExists {
                path: dest.display().to_string(),
            });
        }

        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(write_error(parent))?;
        let staging = tempfile::Builder::new()
            .prefix(".worldbuilder-staging-")
            .tempdir_in(parent)
            .map_err(write_error(parent))?;

        let tree = staging.path().join("tree");
        for file in &self.files {
            let path = tree.join(&file.path);
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).map_err(write_error(dir))?;
            }
            fs::write(&path, &file.contents).map_err(write_error(&path))?;
        }
        debug!(staging = %staging.path().display(), files = self.files.len(), "tree staged");

        let backup = staging.path().join(BACKUP_DIR);
        if exists {
            fs::rename(dest, &backup).map_err(write_error(dest))?;
        }
        if let Err(e) = fs::rename(&tree, dest) {
            if exists {
                if let Err(restore) = fs::rename(&backup, dest) {
                    let kept = keep_backup(staging);
                    error!(
                        path = %dest.display(),
                        backup = %kept.display(),
                        error = %restore,
                        "failed to restore previous output, previous tree left in backup"
                    );
                }
            }
            return Err(write_error(dest)(e));
        }

        info!(path = %dest.display(), files = self.files.len(), "output written");
        Ok(())
    }
}

const BACKUP_DIR: &str = "previous";

/// Detach the staging directory from cleanup and return where the previous
/// tree now lives.
fn keep_backup(staging: tempfile::TempDir) -> PathBuf {
    staging.keep().join(BACKUP_DIR)
}

/// Check imports and lay out the final file tree.
///
/// `withheld` names the artifacts that failed or were withdrawn; importing
/// one of them, or any artifact not in `artifacts`, aborts assembly. All
/// problems are reported together.
pub fn assemble(
    artifacts: Vec<GeneratedArtifact>,
    withheld: &BTreeSet<ArtifactRef>,
    header: Option<&str>,
) -> Result<FileTree, Vec<AssemblyError>> {
    let mut errors = Vec::new();
    let mut by_path: BTreeMap<(ArtifactKind, String), GeneratedArtifact> = BTreeMap::new();
    for artifact in artifacts {
        let key = (artifact.reference.kind, artifact.path());
        if by_path.contains_key(&key) {
            errors.push(AssemblyError::DuplicatePath { path: key.1 });
            continue;
        }
        by_path.insert(key, artifact);
    }

    let present: BTreeSet<&ArtifactRef> = by_path.values().map(|a| &a.reference).collect();
    for artifact in by_path.values() {
        for target in artifact.imports.iter().filter_map(|i| i.artifact()) {
            if withheld.contains(target) {
                errors.push(AssemblyError::ImportsFailedArtifact {
                    from: artifact.path(),
                    to: target.path(),
                });
            } else if !present.contains(target) {
                errors.push(AssemblyError::UnresolvedImport {
                    from: artifact.path(),
                    to: target.path(),
                });
            }
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut files: Vec<EmittedFile> = by_path
        .into_values()
        .map(|artifact| {
            let path = artifact.path();
            let mut contents = String::new();
            if let Some(header) = header {
                contents.push_str(header.trim_end());
                contents.push('\n');
            }
            let imports = render_imports(&path, &artifact.imports);
            if !imports.is_empty() {
                contents.push_str(&imports);
                contents.push('\n');
            }
            contents.push_str(artifact.body.trim());
            contents.push('\n');
            EmittedFile {
                path,
                kind: artifact.reference.kind,
                contents,
            }
        })
        .collect();

    let manifest = Manifest {
        generator: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        files: files
            .iter()
            .map(|f| ManifestEntry {
                path: &f.path,
                kind: f.kind.as_str(),
                sha256: f.sha256(),
            })
            .collect(),
    };
    let manifest_json = serde_json::to_string_pretty(&manifest).map_err(|e| {
        vec![AssemblyError::Render(RenderError {
            artifact: ArtifactRef::new(ArtifactKind::Manifest, MANIFEST_NAME).path(),
            message: e.to_string(),
        })]
    })?;
    files.push(EmittedFile {
        path: ArtifactRef::new(ArtifactKind::Manifest, MANIFEST_NAME).path(),
        kind: ArtifactKind::Manifest,
        contents: manifest_json + "\n",
    });

    Ok(FileTree { files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::artifact::ImportSpec;

    fn artifact(kind: ArtifactKind, name: &str, imports: Vec<ImportSpec>) -> GeneratedArtifact {
        GeneratedArtifact {
            reference: ArtifactRef::new(kind, name),
            body: format!("\nexport const {} = 1;\n\n", name.replace('-', "_")),
            imports,
            owner: None,
        }
    }

    fn sample() -> Vec<GeneratedArtifact> {
        let task = ArtifactRef::new(ArtifactKind::Entity, "task");
        vec![
            artifact(
                ArtifactKind::Service,
                "task",
                vec![ImportSpec::types(task.clone(), ["Task".to_string()])],
            ),
            artifact(ArtifactKind::Entity, "task", vec![]),
            artifact(ArtifactKind::Support, "errors", vec![]),
        ]
    }

    #[test]
    fn test_emission_order_and_contents() {
        let tree = assemble(sample(), &BTreeSet::new(), Some("// generated")).unwrap();
        let paths: Vec<&str> = tree.files().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "runtime/errors.ts",
                "entities/task.entity.ts",
                "services/task.service.ts",
                "worldbuilder.manifest.json",
            ]
        );
        assert_eq!(
            tree.file("services/task.service.ts").unwrap().contents,
            "// generated\nimport type { Task } from '../entities/task.entity';\n\nexport const task = 1;\n"
        );
        assert_eq!(
            tree.file("runtime/errors.ts").unwrap().contents,
            "// generated\nexport const errors = 1;\n"
        );
    }

    #[test]
    fn test_manifest_lists_hashes() {
        let tree = assemble(sample(), &BTreeSet::new(), None).unwrap();
        let manifest: serde_json::Value =
            serde_json::from_str(&tree.file("worldbuilder.manifest.json").unwrap().contents)
                .unwrap();
        let files = manifest["files"].as_array().unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0]["path"], "runtime/errors.ts");
        assert_eq!(files[0]["kind"], "support");
        assert_eq!(
            files[0]["sha256"],
            tree.file("runtime/errors.ts").unwrap().sha256()
        );
        assert_eq!(files[0]["sha256"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_import_of_withheld_artifact_aborts() {
        let mut artifacts = sample();
        artifacts.retain(|a| a.reference.kind != ArtifactKind::Entity);
        let withheld: BTreeSet<ArtifactRef> = [ArtifactRef::new(ArtifactKind::Entity, "task")]
            .into_iter()
            .collect();
        let errors = assemble(artifacts, &withheld, None).unwrap_err();
        assert_eq!(
            errors,
            vec![AssemblyError::ImportsFailedArtifact {
                from: "services/task.service.ts".into(),
                to: "entities/task.entity.ts".into(),
            }]
        );
    }

    #[test]
    fn test_unresolved_and_duplicate_reported_together() {
        let mut artifacts = sample();
        artifacts.retain(|a| a.reference.kind != ArtifactKind::Entity);
        artifacts.push(artifact(ArtifactKind::Support, "errors", vec![]));
        let errors = assemble(artifacts, &BTreeSet::new(), None).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&AssemblyError::DuplicatePath {
            path: "runtime/errors.ts".into()
        }));
        assert!(errors.contains(&AssemblyError::UnresolvedImport {
            from: "services/task.service.ts".into(),
            to: "entities/task.entity.ts".into(),
        }));
    }

    #[test]
    fn test_write_to_stages_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let tree = assemble(sample(), &BTreeSet::new(), None).unwrap();

        tree.write_to(&dest, false).unwrap();
        assert!(dest.join("entities/task.entity.ts").is_file());
        assert!(dest.join("worldbuilder.manifest.json").is_file());

        let err = tree.write_to(&dest, false).unwrap_err();
        assert!(matches!(err, AssemblyError::DestinationExists { .. }));

        fs::write(dest.join("stale.ts"), "old").unwrap();
        tree.write_to(&dest, true).unwrap();
        assert!(!dest.join("stale.ts").exists());
        assert!(dest.join("services/task.service.ts").is_file());

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("out")]);
    }

    #[test]
    fn test_kept_backup_outlives_staging() {
        let dir = tempfile::tempdir().unwrap();
        let staging = tempfile::Builder::new()
            .prefix(".worldbuilder-staging-")
            .tempdir_in(dir.path())
            .unwrap();
        fs::create_dir(staging.path().join(BACKUP_DIR)).unwrap();
        fs::write(staging.path().join(BACKUP_DIR).join("task.entity.ts"), "old").unwrap();

        let backup = keep_backup(staging);
        assert!(backup.starts_with(dir.path()));
        assert_eq!(fs::read_to_string(backup.join("task.entity.ts")).unwrap(), "old");
    }
}
