use crate::constants;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f64,
    #[serde(default)]
    pub semantic: SemanticConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub allow_fallback: bool,
    #[serde(default)]
    pub profiles: BTreeMap<String, SemanticProfileOverrides>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemanticProfileOverrides {
    #[serde(default)]
    pub semantic_weight: Option<f64>,
    #[serde(default)]
    pub lexical_weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_max_file_size() -> u64 {
    constants::MAX_FILE_SIZE
}
fn default_max_workers() -> usize {
    constants::DEFAULT_MAX_WORKERS
}
fn default_languages() -> Vec<String> {
    vec![
        "rust".into(),
        "typescript".into(),
        "python".into(),
        "go".into(),
    ]
}
fn default_data_dir() -> String {
    format!("~/{}", constants::DEFAULT_DATA_DIR)
}
fn default_busy_timeout() -> u32 {
    5000
}
fn default_limit() -> usize {
    constants::DEFAULT_LIMIT
}
fn default_semantic_weight() -> f64 {
    constants::DEFAULT_SEMANTIC_WEIGHT
}
fn default_lexical_weight() -> f64 {
    constants::DEFAULT_LEXICAL_WEIGHT
}
fn default_embedding_provider() -> String {
    "local".into()
}
fn default_embedding_model() -> String {
    "nomic-embed-text-v1.5-q".into()
}
fn default_batch_size() -> usize {
    constants::DEFAULT_EMBED_BATCH_SIZE
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_workers: default_max_workers(),
            languages: default_languages(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            semantic_weight: default_semantic_weight(),
            lexical_weight: default_lexical_weight(),
            semantic: SemanticConfig::default(),
        }
    }
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            batch_size: default_batch_size(),
            allow_fallback: false,
            profiles: BTreeMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration with four-layer precedence:
    /// 1. Built-in defaults (lowest)
    /// 2. Global config: `~/.archivist/config.toml`
    /// 3. Project config: `<repo_root>/.archivist/config.toml`
    /// 4. Explicit `--config` file (highest)
    /// plus `ARCHIVIST_<SECTION>_<KEY>` environment overrides on top of all of
    /// the above. Only explicitly-set keys in a higher layer override lower
    /// ones.
    pub fn load(repo_root: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_file(repo_root, None)
    }

    pub fn load_with_file(
        repo_root: Option<&Path>,
        config_file: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut merged = toml::Value::Table(toml::map::Map::new());

        if let Some(home) = dirs::home_dir() {
            let global_path = home.join(constants::DEFAULT_DATA_DIR).join("config.toml");
            if global_path.exists() {
                merge_toml_values(&mut merged, &load_toml_value(&global_path)?);
            }
        }

        if let Some(root) = repo_root {
            let project_path = root.join(constants::PROJECT_CONFIG_FILE);
            if project_path.exists() {
                merge_toml_values(&mut merged, &load_toml_value(&project_path)?);
            }
        }

        if let Some(cf) = config_file {
            merge_toml_values(&mut merged, &load_toml_value(cf)?);
        }

        let config_str =
            toml::to_string(&merged).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let mut config: Config =
            toml::from_str(&config_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        apply_env_overrides(&mut config);
        config.storage.data_dir = expand_tilde(&config.storage.data_dir);

        Ok(config)
    }

    /// Resolve the data directory for a repository's indexed state.
    pub fn project_data_dir(&self, project_id: &str) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
            .join("data")
            .join(project_id)
    }

    /// Fusion weights after applying the active semantic profile's override,
    /// if any.
    pub fn effective_weights(&self, profile: Option<&str>) -> (f64, f64) {
        let overrides = profile.and_then(|p| self.search.semantic.profiles.get(p));
        let semantic = overrides
            .and_then(|o| o.semantic_weight)
            .unwrap_or(self.search.semantic_weight);
        let lexical = overrides
            .and_then(|o| o.lexical_weight)
            .unwrap_or(self.search.lexical_weight);
        (semantic, lexical)
    }
}

fn load_toml_value(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    content
        .parse::<toml::Value>()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Deep-merge `overlay` into `base`. Only keys present in `overlay` are
/// written; untouched keys in `base` are preserved.
fn merge_toml_values(base: &mut toml::Value, overlay: &toml::Value) {
    if let (toml::Value::Table(base_map), toml::Value::Table(overlay_map)) = (base, overlay) {
        for (key, overlay_val) in overlay_map {
            if let Some(base_val) = base_map.get_mut(key) {
                if base_val.is_table() && overlay_val.is_table() {
                    merge_toml_values(base_val, overlay_val);
                } else {
                    *base_val = overlay_val.clone();
                }
            } else {
                base_map.insert(key.clone(), overlay_val.clone());
            }
        }
    }
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(v) = std::env::var("ARCHIVIST_STORAGE_DATA_DIR") {
        config.storage.data_dir = v;
    }
    if let Ok(v) = std::env::var("ARCHIVIST_INDEX_MAX_FILE_SIZE")
        && let Ok(n) = v.parse()
    {
        config.index.max_file_size = n;
    }
    if let Ok(v) = std::env::var("ARCHIVIST_INDEX_MAX_WORKERS")
        && let Ok(n) = v.parse()
    {
        config.index.max_workers = n;
    }
    if let Ok(v) = std::env::var("ARCHIVIST_SEARCH_DEFAULT_LIMIT")
        && let Ok(n) = v.parse()
    {
        config.search.default_limit = n;
    }
    if let Ok(v) = std::env::var("ARCHIVIST_SEARCH_SEMANTIC_WEIGHT")
        && let Ok(n) = v.parse()
    {
        config.search.semantic_weight = n;
    }
    if let Ok(v) = std::env::var("ARCHIVIST_SEARCH_LEXICAL_WEIGHT")
        && let Ok(n) = v.parse()
    {
        config.search.lexical_weight = n;
    }
    if let Ok(v) = std::env::var("ARCHIVIST_LOGGING_LEVEL") {
        config.logging.level = v;
    }
}

fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~')
        && let Some(home) = dirs::home_dir()
    {
        return format!("{}{}", home.to_string_lossy(), rest);
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_populated_when_no_files_exist() {
        let dir = tempdir().unwrap();
        let config = Config::load(Some(dir.path())).unwrap();
        assert_eq!(config.search.default_limit, constants::DEFAULT_LIMIT);
        assert!((config.search.semantic_weight - 0.7).abs() < 1e-9);
    }

    #[test]
    fn project_config_overrides_global_defaults() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".archivist")).unwrap();
        std::fs::write(
            dir.path().join(".archivist/config.toml"),
            "[search]\ndefault_limit = 25\n",
        )
        .unwrap();

        let config = Config::load(Some(dir.path())).unwrap();
        assert_eq!(config.search.default_limit, 25);
        // Untouched fields still carry their defaults.
        assert!((config.search.semantic_weight - 0.7).abs() < 1e-9);
    }

    #[test]
    fn explicit_config_file_outranks_project_config() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".archivist")).unwrap();
        std::fs::write(
            dir.path().join(".archivist/config.toml"),
            "[search]\ndefault_limit = 25\n",
        )
        .unwrap();
        let explicit_path = dir.path().join("explicit.toml");
        std::fs::write(&explicit_path, "[search]\ndefault_limit = 99\n").unwrap();

        let config = Config::load_with_file(Some(dir.path()), Some(&explicit_path)).unwrap();
        assert_eq!(config.search.default_limit, 99);
    }

    #[test]
    fn env_override_outranks_all_files() {
        let dir = tempdir().unwrap();
        // SAFETY: tests run single-threaded per-process for env var mutation
        // in this module; no other test reads this key.
        unsafe {
            std::env::set_var("ARCHIVIST_SEARCH_DEFAULT_LIMIT", "7");
        }
        let config = Config::load(Some(dir.path())).unwrap();
        unsafe {
            std::env::remove_var("ARCHIVIST_SEARCH_DEFAULT_LIMIT");
        }
        assert_eq!(config.search.default_limit, 7);
    }

    #[test]
    fn effective_weights_falls_back_to_base_without_profile() {
        let config = Config::default();
        let (s, l) = config.effective_weights(None);
        assert!((s - 0.7).abs() < 1e-9);
        assert!((l - 0.3).abs() < 1e-9);
    }

    #[test]
    fn effective_weights_applies_profile_override() {
        let mut config = Config::default();
        config.search.semantic.profiles.insert(
            "high_recall".to_string(),
            SemanticProfileOverrides {
                semantic_weight: Some(0.5),
                lexical_weight: Some(0.5),
            },
        );
        let (s, l) = config.effective_weights(Some("high_recall"));
        assert!((s - 0.5).abs() < 1e-9);
        assert!((l - 0.5).abs() < 1e-9);
    }
}
