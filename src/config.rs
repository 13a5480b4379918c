//! Generator configuration
//!
//! A `worldbuilder.toml` next to the project spec (or passed with `--config`)
//! tunes output location, parallelism, the broker probe baked into generated
//! workers and the domain type tables.
//!
//! ```toml
//! [output]
//! dir = "generated"
//!
//! [generation]
//! parallel = true
//! header = "// Generated by worldbuilder. Do not edit."
//!
//! [broker]
//! endpoint_env = "BROKER_URL"
//! probe_timeout_ms = 2000
//!
//! [types]
//! unsupported = ["json"]
//!
//! [types.storage]
//! decimal = "numeric(12,2)"
//! ```

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::naming::{DomainType, TypeTables};

/// File name looked up next to the project spec.
pub const CONFIG_FILE_NAME: &str = "worldbuilder.toml";

pub const ENV_PARALLEL: &str = "WORLDBUILDER_PARALLEL";
pub const ENV_OUTPUT_DIR: &str = "WORLDBUILDER_OUTPUT_DIR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub output: OutputConfig,
    pub generation: GenerationConfig,
    pub broker: BrokerConfig,
    pub types: TypesConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Destination directory; `--output` takes precedence.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Run entity pipelines on the rayon pool.
    pub parallel: bool,
    /// Line prepended to every generated source file.
    pub header: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            parallel: true,
            header: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Environment variable generated workers read the broker endpoint from.
    pub endpoint_env: String,
    pub probe_timeout_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            endpoint_env: "BROKER_URL".to_string(),
            probe_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypesConfig {
    /// Domain types the target cannot store.
    pub unsupported: Vec<String>,
    /// Domain type → storage token overrides.
    pub storage: BTreeMap<String, String>,
    /// Domain type → validation token overrides.
    pub validation: BTreeMap<String, String>,
}

impl GeneratorConfig {
    /// Build the type tables this configuration describes.
    ///
    /// Unknown domain type names are an error rather than being ignored.
    pub fn type_tables(&self) -> anyhow::Result<TypeTables> {
        let parse = |section: &str, raw: &str| {
            DomainType::parse(raw)
                .with_context(|| format!("[types{section}] names unknown domain type `{raw}`"))
        };
        let mut tables = TypeTables::standard();
        for (raw, token) in &self.types.storage {
            tables = tables.with_storage(parse(".storage", raw)?, token.clone());
        }
        for (raw, token) in &self.types.validation {
            tables = tables.with_validation(parse(".validation", raw)?, token.clone());
        }
        for raw in &self.types.unsupported {
            tables = tables.without_storage(parse("", raw)?);
        }
        Ok(tables)
    }

    /// Apply `WORLDBUILDER_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(
            std::env::var(ENV_PARALLEL).ok().as_deref(),
            std::env::var(ENV_OUTPUT_DIR).ok().as_deref(),
        )
    }

    fn apply_overrides(&mut self, parallel: Option<&str>, output: Option<&str>) -> anyhow::Result<()> {
        if let Some(raw) = parallel {
            self.generation.parallel = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => bail!("{ENV_PARALLEL} must be a boolean, got `{other}`"),
            };
        }
        if let Some(dir) = output.filter(|d| !d.trim().is_empty()) {
            self.output.dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }
}

/// Load configuration from a TOML file.
///
/// Returns `Ok(None)` when the file does not exist and an error when it exists
/// but cannot be read or parsed.
pub fn load_config(config_path: &Path) -> anyhow::Result<Option<GeneratorConfig>> {
    if !config_path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config: {}", config_path.display()))?;

    let config: GeneratorConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config: {}", config_path.display()))?;

    Ok(Some(config))
}

/// Look for `worldbuilder.toml` in the same directory as the project spec.
pub fn auto_detect_config_path(spec_path: &Path) -> Option<PathBuf> {
    let config_path = spec_path.parent()?.join(CONFIG_FILE_NAME);
    config_path.exists().then_some(config_path)
}

/// Resolve the config path
///
/// Priority:
/// 1. Explicitly provided path (via CLI)
/// 2. Auto-detected alongside spec
/// 3. None (defaults)
pub fn resolve_config_path(explicit_path: Option<&Path>, spec_path: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        warn!(path = %path.display(), "config file not found, falling back to auto-detection");
    }

    auto_detect_config_path(spec_path)
}

/// Resolve, load and env-override the configuration for one run.
pub fn load_effective_config(
    explicit_path: Option<&Path>,
    spec_path: &Path,
) -> anyhow::Result<GeneratorConfig> {
    let mut config = match resolve_config_path(explicit_path, spec_path) {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path)?.unwrap_or_default()
        }
        None => GeneratorConfig::default(),
    };
    config.apply_env()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert!(config.generation.parallel);
        assert_eq!(config.broker.endpoint_env, "BROKER_URL");
        assert_eq!(config.broker.probe_timeout_ms, 2000);
        assert_eq!(config.type_tables().unwrap(), TypeTables::standard());
    }

    #[test]
    fn test_load_and_type_tables() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("project.yaml");
        std::fs::write(&spec, "name: X\n").unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
[generation]
parallel = false
header = "// generated"

[types]
unsupported = ["json"]

[types.storage]
decimal = "numeric(12,2)"
"#,
        )
        .unwrap();

        let path = resolve_config_path(None, &spec).unwrap();
        let config = load_config(&path).unwrap().unwrap();
        assert!(!config.generation.parallel);
        assert_eq!(config.generation.header.as_deref(), Some("// generated"));
        assert_eq!(config.broker, BrokerConfig::default());

        let tables = config.type_tables().unwrap();
        assert_eq!(
            tables.storage_type(DomainType::Decimal, "price").unwrap(),
            "numeric(12,2)"
        );
        assert!(tables.storage_type(DomainType::Json, "payload").is_err());
    }

    #[test]
    fn test_unknown_type_in_config_is_an_error() {
        let mut config = GeneratorConfig::default();
        config.types.unsupported.push("money".into());
        assert!(config.type_tables().is_err());
    }

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join(CONFIG_FILE_NAME)).unwrap().is_none());
        assert!(auto_detect_config_path(&dir.path().join("spec.yaml")).is_none());
    }

    #[test]
    fn test_overrides() {
        let mut config = GeneratorConfig::default();
        config.apply_overrides(Some("off"), Some("out/app")).unwrap();
        assert!(!config.generation.parallel);
        assert_eq!(config.output.dir, Some(PathBuf::from("out/app")));
        assert!(config.apply_overrides(Some("maybe"), None).is_err());
    }
}
