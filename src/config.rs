//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.patisserie/config.toml` (user)
//! 3. `/etc/patisserie/config.toml` (system)
//! 4. built-in defaults
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.patisserie/secrets.toml` (user, must be 0600)
//! 2. `/etc/patisserie/secrets.toml` (system, must be 0600)

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::classifier::{RetrievalClassifier, StaticFewShotClassifier};
use crate::evaluate::Evaluator;
use crate::providers::{DEFAULT_TIMEOUT_SECS, groq, huggingface, mistral};
use crate::{PatisserieError, Result};

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub data: DataConfig,
}

/// Provider configurations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub groq: CompletionProviderConfig,
    #[serde(default)]
    pub mistral: CompletionProviderConfig,
    #[serde(default)]
    pub huggingface: HuggingFaceConfig,
    /// Embed locally instead of through HuggingFace (needs `local-inference`).
    #[serde(default)]
    pub local: Option<LocalConfig>,
}

/// Chat completion backend configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionProviderConfig {
    /// Model to use; the backend default when unset.
    #[serde(default)]
    pub model: Option<String>,
    /// API base URL; the public endpoint when unset.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl CompletionProviderConfig {
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(default)
    }
}

/// HuggingFace embedding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HuggingFaceConfig {
    /// Embedding model (default: paraphrase-multilingual-MiniLM-L12-v2).
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            embedding_model: default_embedding_model(),
            base_url: None,
        }
    }
}

fn default_embedding_model() -> String {
    huggingface::DEFAULT_MODEL.to_string()
}

/// Local inference configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalConfig {
    /// `paraphrase-multilingual-MiniLM-L12-v2` or `all-MiniLM-L6-v2`.
    #[serde(default = "default_local_model")]
    pub model: String,
    /// Directory for model downloads.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

fn default_local_model() -> String {
    "paraphrase-multilingual-MiniLM-L12-v2".to_string()
}

/// Classifier tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Neighbours retrieved per query (default: 5).
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Static few-shot examples per intent (default: 2).
    #[serde(default = "default_samples_per_intent")]
    pub samples_per_intent: usize,
    /// Seed for few-shot sampling; random when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            samples_per_intent: default_samples_per_intent(),
            seed: None,
        }
    }
}

fn default_top_k() -> usize {
    RetrievalClassifier::DEFAULT_TOP_K
}

fn default_samples_per_intent() -> usize {
    StaticFewShotClassifier::DEFAULT_SAMPLES_PER_INTENT
}

/// Evaluation pacing.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationConfig {
    /// Pause between classification calls in milliseconds (default: 200).
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

impl EvaluationConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

fn default_delay_ms() -> u64 {
    Evaluator::DEFAULT_DELAY.as_millis() as u64
}

/// HTTP client settings shared by all remote backends.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds (default: 60).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Dataset locations: JSON arrays of `{text, intent}` records.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_train_path")]
    pub train_path: PathBuf,
    #[serde(default = "default_test_path")]
    pub test_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            train_path: default_train_path(),
            test_path: default_test_path(),
        }
    }
}

fn default_train_path() -> PathBuf {
    PathBuf::from("data/train.json")
}

fn default_test_path() -> PathBuf {
    PathBuf::from("data/test.json")
}

/// Secrets configuration (API keys).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub groq: Option<ApiKeySecret>,
    #[serde(default)]
    pub mistral: Option<ApiKeySecret>,
    #[serde(default)]
    pub huggingface: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

/// Provider name → environment variable name mapping.
const PROVIDER_ENV_VARS: &[(&str, &str)] = &[
    ("groq", groq::API_KEY_ENV),
    ("mistral", mistral::API_KEY_ENV),
    ("huggingface", huggingface::API_KEY_ENV),
];

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist. Without one, the first existing
    /// standard file is used, and defaults apply when there is none.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => {
                debug!("no config file found; using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PatisserieError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            PatisserieError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(PatisserieError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".patisserie").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/patisserie/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.patisserie/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/patisserie/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists (providers may use env vars).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".patisserie").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/patisserie/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load a specific secrets file, refusing group/world-readable ones.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            PatisserieError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            PatisserieError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            PatisserieError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(PatisserieError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// Get API key for a provider, falling back to the corresponding environment variable.
    pub fn api_key(&self, provider: &str) -> Option<String> {
        let from_file = match provider {
            "groq" => self.groq.as_ref(),
            "mistral" => self.mistral.as_ref(),
            "huggingface" => self.huggingface.as_ref(),
            _ => None,
        }
        .map(|s| s.api_key.clone());

        from_file.or_else(|| {
            PROVIDER_ENV_VARS
                .iter()
                .find(|(name, _)| *name == provider)
                .and_then(|(_, env_var)| std::env::var(env_var).ok())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.classifier.top_k, 5);
        assert_eq!(config.classifier.samples_per_intent, 2);
        assert_eq!(config.classifier.seed, None);
        assert_eq!(config.evaluation.delay_ms, 200);
        assert_eq!(config.http.timeout_secs, 60);
        assert_eq!(
            config.providers.huggingface.embedding_model,
            "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2"
        );
        assert!(config.providers.local.is_none());
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [classifier]
            top_k = 3
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.classifier.top_k, 3);
        // Defaults preserved
        assert_eq!(config.classifier.samples_per_intent, 2);
        assert_eq!(config.evaluation.delay(), Duration::from_millis(200));
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [providers.groq]
            model = "llama-3.1-8b-instant"

            [providers.mistral]
            model = "mistral-small-latest"
            base_url = "http://localhost:8080"

            [providers.huggingface]
            embedding_model = "sentence-transformers/all-MiniLM-L6-v2"

            [classifier]
            top_k = 7
            samples_per_intent = 3
            seed = 42

            [evaluation]
            delay_ms = 0

            [http]
            timeout_secs = 10

            [data]
            train_path = "/srv/train.json"
            test_path = "/srv/test.json"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.providers.groq.model_or(groq::DEFAULT_MODEL),
            "llama-3.1-8b-instant"
        );
        assert_eq!(config.providers.groq.base_url, None);
        assert_eq!(
            config.providers.mistral.base_url.as_deref(),
            Some("http://localhost:8080")
        );
        assert_eq!(config.classifier.seed, Some(42));
        assert!(config.evaluation.delay().is_zero());
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.data.test_path, PathBuf::from("/srv/test.json"));
    }

    #[test]
    fn unset_model_falls_back_to_backend_default() {
        let config = Config::default();
        assert_eq!(
            config.providers.mistral.model_or(mistral::DEFAULT_MODEL),
            "open-mistral-nemo"
        );
    }

    #[test]
    fn parse_local_config() {
        let toml = r#"
            [providers.local]
            cache_dir = "/opt/models"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let local = config.providers.local.unwrap();
        assert_eq!(local.model, "paraphrase-multilingual-MiniLM-L12-v2");
        assert_eq!(local.cache_dir, Some(PathBuf::from("/opt/models")));
    }

    #[test]
    fn parse_secrets() {
        let toml = r#"
            [groq]
            api_key = "gsk-test-key"

            [huggingface]
            api_key = "hf-test-key"
        "#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.groq.as_ref().unwrap().api_key, "gsk-test-key");
        assert_eq!(secrets.huggingface.as_ref().unwrap().api_key, "hf-test-key");
        assert!(secrets.mistral.is_none());
    }

    #[test]
    fn api_key_from_secrets() {
        let secrets = Secrets {
            groq: Some(ApiKeySecret {
                api_key: "from-file".to_string(),
            }),
            ..Default::default()
        };
        assert_eq!(secrets.api_key("groq"), Some("from-file".to_string()));
        // Unknown provider returns None
        assert_eq!(secrets.api_key("nonexistent"), None);
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }

    #[test]
    fn load_explicit_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[evaluation]\ndelay_ms = 50").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.evaluation.delay_ms, 50);
    }

    #[test]
    fn malformed_config_is_a_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[classifier\ntop_k = ").unwrap();
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, PatisserieError::Configuration(_)));
    }

    #[cfg(unix)]
    #[test]
    fn insecure_secrets_file_is_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[groq]\napi_key = \"k\"").unwrap();
        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o644)).unwrap();
        let err = Secrets::load_from_file(file.path()).unwrap_err().to_string();
        assert!(err.contains("insecure permissions"));

        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o600)).unwrap();
        let secrets = Secrets::load_from_file(file.path()).unwrap();
        assert_eq!(secrets.api_key("groq"), Some("k".to_string()));
    }
}
