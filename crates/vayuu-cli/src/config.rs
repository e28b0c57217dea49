//! Application configuration
//!
//! Loaded from `<data_dir>/config.toml` (or `--config`), or from `VAYUU_*`
//! environment variables in development mode. CLI flags override both.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vayuu_storage::paths;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_MODEL: &str = "kimi-k2.5:cloud";
pub const DEFAULT_LOG_MAX_SIZE: u64 = 10 * 1024 * 1024;

const DEV_MODE_VARS: &[&str] = &["MODE", "APP_ENV", "ENV", "VAYUU_ENV"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Qdrant,
    /// Process-local index, lost on restart
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub enabled: bool,
    pub ollama_base_url: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub qdrant_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qdrant_api_key: Option<String>,
    pub collection: String,
    pub vector_backend: VectorBackend,
    /// Defaults to `<data_dir>/memory.redb`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ollama_base_url: vayuu_ai::embedding::DEFAULT_OLLAMA_URL.to_string(),
            embedding_model: vayuu_ai::embedding::DEFAULT_OLLAMA_MODEL.to_string(),
            embedding_dimension: vayuu_ai::embedding::DEFAULT_OLLAMA_DIMENSION,
            qdrant_url: vayuu_ai::vector::DEFAULT_QDRANT_URL.to_string(),
            qdrant_api_key: None,
            collection: vayuu_ai::vector::DEFAULT_COLLECTION.to_string(),
            vector_backend: VectorBackend::default(),
            database_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub telegram_token: String,
    /// Telegram username (without `@`) allowed to talk to the bot
    pub allowed_username: String,
    pub api_key: String,
    pub api_base_url: String,
    pub model: String,
    /// `openai`, `groq`, `ollama` or `custom`
    pub provider: String,
    pub agent_workdir: String,
    pub temperature: f32,
    pub max_iterations: usize,
    pub max_consecutive_errors: usize,
    pub stm_capacity: usize,
    pub context_tokens: usize,
    /// Deadline for one conversation turn
    pub ai_timeout_secs: u64,
    pub log_max_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
    pub log_level: String,
    pub memory: MemoryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telegram_token: String::new(),
            allowed_username: String::new(),
            api_key: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            provider: "custom".to_string(),
            agent_workdir: default_workdir().display().to_string(),
            temperature: 0.2,
            max_iterations: 20,
            max_consecutive_errors: 3,
            stm_capacity: vayuu_ai::DEFAULT_STM_CAPACITY,
            context_tokens: 500,
            ai_timeout_secs: 30,
            log_max_size_bytes: DEFAULT_LOG_MAX_SIZE,
            log_dir: None,
            log_level: "info".to_string(),
            memory: MemoryConfig::default(),
        }
    }
}

/// `<data_dir>/workspace`
pub fn default_workdir() -> PathBuf {
    paths::resolve_data_dir()
        .map(|dir| dir.join("workspace"))
        .unwrap_or_else(|_| PathBuf::from("workspace"))
}

/// Whether any of the development-mode variables says `development` or `dev`.
pub fn is_development_mode_with(get: impl Fn(&str) -> Option<String>) -> bool {
    DEV_MODE_VARS.iter().any(|name| {
        get(name).is_some_and(|value| {
            let value = value.trim();
            value.eq_ignore_ascii_case("development") || value.eq_ignore_ascii_case("dev")
        })
    })
}

pub fn is_development_mode() -> bool {
    is_development_mode_with(|name| std::env::var(name).ok())
}

pub(crate) fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}

impl AppConfig {
    /// Resolve the configuration for this process.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if is_development_mode() {
            tracing::debug!("Development mode: reading configuration from environment");
            return Ok(Self::from_env_with(|name| std::env::var(name).ok()));
        }
        let path = match config_path {
            Some(path) => path.to_path_buf(),
            None => paths::default_config_path()?,
        };
        Self::load_from_file(&path)
    }

    /// Defaults overlaid with the `VAYUU_*` variables that are set.
    pub fn from_env_with(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let read = |name: &str| get(name).filter(|value| !value.trim().is_empty());

        if let Some(v) = read("VAYUU_TELEGRAM_TOKEN") {
            config.telegram_token = v;
        }
        if let Some(v) = read("VAYUU_ALLOWED_USERNAME") {
            config.allowed_username = v;
        }
        if let Some(v) = read("VAYUU_API_KEY") {
            config.api_key = v;
        }
        if let Some(v) = read("VAYUU_API_BASE_URL") {
            config.api_base_url = v;
        }
        if let Some(v) = read("VAYUU_MODEL") {
            config.model = v;
        }
        if let Some(v) = read("VAYUU_PROVIDER") {
            config.provider = v;
        }
        if let Some(v) = read("VAYUU_AGENT_WORKDIR") {
            config.agent_workdir = v;
        }
        if let Some(v) = read("VAYUU_OLLAMA_BASE_URL") {
            config.memory.ollama_base_url = v;
        }
        if let Some(v) = read("VAYUU_OLLAMA_MODEL") {
            config.memory.embedding_model = v;
        }
        if let Some(v) = read("VAYUU_QDRANT_URL") {
            config.memory.qdrant_url = v;
        }
        if let Some(v) = read("VAYUU_LOG_LEVEL") {
            config.log_level = v;
        }
        config
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "Config file not found at {}. Run `vayuu setup` first.",
                path.display()
            );
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Write the config as TOML, readable by the owner only.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        restrict_permissions(&tmp, 0o600)?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to move config into {}", path.display()))?;
        Ok(())
    }

    /// Apply `--model` / `--workdir`.
    pub fn apply_overrides(&mut self, model: Option<String>, workdir: Option<String>) {
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            self.model = model;
        }
        if let Some(workdir) = workdir.filter(|w| !w.trim().is_empty()) {
            self.agent_workdir = workdir;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("telegram_token", &self.telegram_token),
            ("api_key", &self.api_key),
            ("api_base_url", &self.api_base_url),
            ("model", &self.model),
            ("agent_workdir", &self.agent_workdir),
            ("allowed_username", &self.allowed_username),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                bail!("{name} is required");
            }
        }
        if self.ai_timeout_secs == 0 {
            bail!("ai_timeout_secs must be greater than zero");
        }
        self.provider
            .parse::<vayuu_ai::LlmProvider>()
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        Ok(())
    }

    pub fn workdir(&self) -> PathBuf {
        paths::expand_home(self.agent_workdir.trim())
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log_dir
            .as_deref()
            .filter(|dir| !dir.trim().is_empty())
            .map(paths::expand_home)
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match self.memory.database_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Ok(paths::expand_home(path)),
            _ => paths::default_database_path(),
        }
    }

    /// Copy safe to print: tokens and keys are masked.
    pub fn masked(&self) -> Self {
        let mut config = self.clone();
        config.telegram_token = mask_secret(&self.telegram_token);
        config.api_key = mask_secret(&self.api_key);
        config.memory.qdrant_api_key = self.memory.qdrant_api_key.as_deref().map(mask_secret);
        config
    }
}

#[cfg(unix)]
pub fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
pub fn restrict_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn complete_config(workdir: &Path) -> AppConfig {
        AppConfig {
            telegram_token: "123456:ABCDEFGHIJ".to_string(),
            allowed_username: "alex".to_string(),
            api_key: "sk-test-key-123".to_string(),
            agent_workdir: workdir.display().to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "telegram_token = \"t\"\nmodel = \"llama3\"\n\n[memory]\nvector_backend = \"memory\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.telegram_token, "t");
        assert_eq!(config.model, "llama3");
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.ai_timeout_secs, 30);
        assert_eq!(config.memory.vector_backend, VectorBackend::Memory);
        assert_eq!(config.memory.embedding_dimension, 768);
        assert_eq!(config.memory.collection, "vayuu_memory");
    }

    #[test]
    fn test_missing_file_points_to_setup() {
        let dir = tempdir().unwrap();
        let err = AppConfig::load_from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("vayuu setup"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = complete_config(dir.path());

        config.save(&path).unwrap();
        assert_eq!(AppConfig::load_from_file(&path).unwrap(), config);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_validate_names_missing_field() {
        let dir = tempdir().unwrap();
        assert!(complete_config(dir.path()).validate().is_ok());

        let mut config = complete_config(dir.path());
        config.allowed_username = " ".to_string();
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "allowed_username is required"
        );

        let mut config = complete_config(dir.path());
        config.provider = "gemini".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_development_mode_detection() {
        let env = |pairs: &'static [(&'static str, &'static str)]| {
            let map: HashMap<&str, &str> = pairs.iter().copied().collect();
            move |name: &str| map.get(name).map(|v| v.to_string())
        };
        assert!(is_development_mode_with(env(&[("APP_ENV", "Development")])));
        assert!(is_development_mode_with(env(&[("VAYUU_ENV", "dev")])));
        assert!(!is_development_mode_with(env(&[("MODE", "production")])));
        assert!(!is_development_mode_with(env(&[])));
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("VAYUU_TELEGRAM_TOKEN", "tok"),
            ("VAYUU_MODEL", "qwen"),
            ("VAYUU_OLLAMA_MODEL", "mxbai-embed-large"),
            ("VAYUU_API_KEY", "  "),
        ]
        .into_iter()
        .collect();
        let config = AppConfig::from_env_with(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.telegram_token, "tok");
        assert_eq!(config.model, "qwen");
        assert_eq!(config.memory.embedding_model, "mxbai-embed-large");
        assert_eq!(config.api_key, "");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_overrides_and_home_expansion() {
        let mut config = AppConfig::default();
        config.apply_overrides(Some("gpt-4o".to_string()), Some("~/bot".to_string()));
        assert_eq!(config.model, "gpt-4o");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.workdir(), home.join("bot"));
        }

        config.apply_overrides(None, Some(String::new()));
        assert_eq!(config.agent_workdir, "~/bot");
    }

    #[test]
    fn test_masked_hides_secrets() {
        let dir = tempdir().unwrap();
        let masked = complete_config(dir.path()).masked();
        assert_eq!(masked.telegram_token, "1234****");
        assert_eq!(masked.api_key, "sk-t****");
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret(""), "");
    }
}
