//! Configuration file schema.
//!
//! Every field has a default, so an empty `driftcheck.yaml` is valid and
//! running without any file behaves the same as running with one.

use globset::Glob;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File names searched for in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["driftcheck.yaml", ".driftcheck.yaml"];

/// Raised when a run cannot start (or must stop) because of its setup.
///
/// This is the only error that aborts an analysis.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// The reasoning service credential is not set.
    #[error("missing credential: environment variable {0} is not set")]
    MissingCredential(String),
    /// A setting is out of range or unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub hybrid: HybridConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub compression: CompressionConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Glob patterns for paths to skip when walking a tree
    #[serde(default)]
    pub excluded_paths: Vec<String>,
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a configuration from YAML text. Blank text yields the defaults.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Load from `explicit`, or from the first discovered file, or defaults.
    ///
    /// Returns the path that was read, if any.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => discover(Path::new(".")),
        };
        match path {
            Some(p) => {
                let config = Self::parse_file(&p)
                    .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", p.display(), e))?;
                validate(&config)?;
                Ok((config, Some(p)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();
        // Normalize to forward slashes so patterns work on every platform
        let normalized = path_str.replace('\\', "/");

        self.excluded_paths.iter().any(|pattern| {
            Glob::new(pattern)
                .map(|g| g.compile_matcher().is_match(normalized.as_str()))
                .unwrap_or(false)
        })
    }
}

/// Find a configuration file in `dir`, then in the user config directory.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
        .or_else(|| {
            directories::ProjectDirs::from("", "", "driftcheck")
                .map(|dirs| dirs.config_dir().join("driftcheck.yaml"))
                .filter(|p| p.is_file())
        })
}

/// Function Matcher settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchingConfig {
    /// Minimum similarity for a non-exact pairing (default: 0.5)
    #[serde(default = "default_match_threshold")]
    pub threshold: f64,
}

fn default_match_threshold() -> f64 {
    0.5
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: default_match_threshold(),
        }
    }
}

/// Verification bar for comparison results.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerificationConfig {
    /// A pair is verified when its confidence reaches this value (default: 80)
    #[serde(default = "default_verification_threshold")]
    pub threshold: u32,
}

fn default_verification_threshold() -> u32 {
    80
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            threshold: default_verification_threshold(),
        }
    }
}

/// Escalation bands of the hybrid comparator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HybridConfig {
    /// Below this similarity a pair is a complete mismatch (default: 0.2)
    #[serde(default = "default_very_low")]
    pub very_low: f64,
    /// Below this name similarity a pair is a complete mismatch (default: 0.3)
    #[serde(default = "default_name_floor")]
    pub name_floor: f64,
    /// Similarity trusted on its own when parameters agree (default: 0.85)
    #[serde(default = "default_high")]
    pub high: f64,
    /// Similarity at which the blend favors the similarity signal (default: 0.6)
    #[serde(default = "default_medium")]
    pub medium: f64,
    /// Similarity under which a confident deep comparison is discounted (default: 0.3)
    #[serde(default = "default_disagreement_similarity")]
    pub disagreement_similarity: f64,
    /// Deep comparison confidence above which the discount applies (default: 80)
    #[serde(default = "default_disagreement_confidence")]
    pub disagreement_confidence: u32,
    /// Multiplier applied when the two signals disagree (default: 0.9)
    #[serde(default = "default_disagreement_discount")]
    pub disagreement_discount: f64,
}

fn default_very_low() -> f64 {
    0.2
}

fn default_name_floor() -> f64 {
    0.3
}

fn default_high() -> f64 {
    0.85
}

fn default_medium() -> f64 {
    0.6
}

fn default_disagreement_similarity() -> f64 {
    0.3
}

fn default_disagreement_confidence() -> u32 {
    80
}

fn default_disagreement_discount() -> f64 {
    0.9
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            very_low: default_very_low(),
            name_floor: default_name_floor(),
            high: default_high(),
            medium: default_medium(),
            disagreement_similarity: default_disagreement_similarity(),
            disagreement_confidence: default_disagreement_confidence(),
            disagreement_discount: default_disagreement_discount(),
        }
    }
}

/// Remote reasoning service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReasoningConfig {
    /// Service provider; only "gemini" is built in
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_reasoning_url")]
    pub base_url: String,
    /// Environment variable holding the API key
    #[serde(default = "default_reasoning_key_env")]
    pub api_key_env: String,
    /// Per-request timeout in milliseconds (default: 30000)
    #[serde(default = "default_reasoning_timeout")]
    pub timeout_ms: u64,
    /// Retries after the first attempt (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First backoff delay in milliseconds, doubled per retry (default: 1000)
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_reasoning_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_reasoning_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_reasoning_timeout() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    1000
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_reasoning_url(),
            api_key_env: default_reasoning_key_env(),
            timeout_ms: default_reasoning_timeout(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay(),
        }
    }
}

impl ReasoningConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, ConfigurationError> {
        read_key(&self.api_key_env)
            .ok_or_else(|| ConfigurationError::MissingCredential(self.api_key_env.clone()))
    }
}

/// Optional prompt compression settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompressionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_compression_url")]
    pub endpoint: String,
    #[serde(default = "default_compression_key_env")]
    pub api_key_env: String,
    /// 0.0 keeps everything, 1.0 compresses hardest (default: 0.8)
    #[serde(default = "default_aggressiveness")]
    pub aggressiveness: f64,
    #[serde(default = "default_capability_timeout")]
    pub timeout_ms: u64,
}

fn default_compression_url() -> String {
    "https://api.thetokencompany.com/v1/compress".to_string()
}

fn default_compression_key_env() -> String {
    "TTC_API_KEY".to_string()
}

fn default_aggressiveness() -> f64 {
    0.8
}

fn default_capability_timeout() -> u64 {
    10_000
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_compression_url(),
            api_key_env: default_compression_key_env(),
            aggressiveness: default_aggressiveness(),
            timeout_ms: default_capability_timeout(),
        }
    }
}

impl CompressionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn api_key(&self) -> Option<String> {
        read_key(&self.api_key_env)
    }
}

/// Optional embedding signal settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub enabled: bool,
    /// OpenAI-compatible embeddings endpoint
    #[serde(default = "default_embedding_url")]
    pub endpoint: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_capability_timeout")]
    pub timeout_ms: u64,
}

fn default_embedding_url() -> String {
    "https://api.openai.com/v1/embeddings".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_embedding_url(),
            model: default_embedding_model(),
            api_key_env: default_embedding_key_env(),
            timeout_ms: default_capability_timeout(),
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn api_key(&self) -> Option<String> {
        read_key(&self.api_key_env)
    }
}

fn read_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|k| !k.trim().is_empty())
}

/// Validate a configuration for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    let unit = |name: &str, value: f64| -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&value) {
            anyhow::bail!("{} must be within [0, 1], got {}", name, value);
        }
        Ok(())
    };

    unit("matching.threshold", config.matching.threshold)?;
    unit("hybrid.very_low", config.hybrid.very_low)?;
    unit("hybrid.name_floor", config.hybrid.name_floor)?;
    unit("hybrid.high", config.hybrid.high)?;
    unit("hybrid.medium", config.hybrid.medium)?;
    unit("hybrid.disagreement_similarity", config.hybrid.disagreement_similarity)?;
    unit("hybrid.disagreement_discount", config.hybrid.disagreement_discount)?;
    unit("compression.aggressiveness", config.compression.aggressiveness)?;

    if config.verification.threshold > 100 {
        anyhow::bail!(
            "verification.threshold must be within [0, 100], got {}",
            config.verification.threshold
        );
    }
    if config.hybrid.disagreement_confidence > 100 {
        anyhow::bail!(
            "hybrid.disagreement_confidence must be within [0, 100], got {}",
            config.hybrid.disagreement_confidence
        );
    }

    let h = &config.hybrid;
    if !(h.very_low <= h.medium && h.medium <= h.high) {
        anyhow::bail!(
            "hybrid bands must satisfy very_low <= medium <= high (got {} / {} / {})",
            h.very_low,
            h.medium,
            h.high
        );
    }

    if config.reasoning.provider != "gemini" {
        anyhow::bail!(
            "unknown reasoning provider {:?}, must be 'gemini'",
            config.reasoning.provider
        );
    }
    if config.reasoning.timeout_ms == 0 {
        anyhow::bail!("reasoning.timeout_ms must be greater than zero");
    }

    for pattern in &config.excluded_paths {
        Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.matching.threshold, 0.5);
        assert_eq!(config.verification.threshold, 80);
        assert_eq!(config.hybrid.disagreement_discount, 0.9);
        assert_eq!(config.reasoning.max_retries, 3);
        assert_eq!(config.reasoning.api_key_env, "GEMINI_API_KEY");
        assert!(!config.embedding.enabled);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_partial_sections() {
        let yaml = r#"
verification:
  threshold: 70
hybrid:
  high: 0.9
excluded_paths:
  - "**/generated/**"
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.verification.threshold, 70);
        assert_eq!(config.hybrid.high, 0.9);
        assert_eq!(config.hybrid.medium, 0.6);
        assert!(config.is_path_excluded(Path::new("src/generated/api.py")));
        assert!(!config.is_path_excluded(Path::new("src/api.py")));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = Config::default();
        config.matching.threshold = 1.5;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.verification.threshold = 120;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_band_ordering() {
        let mut config = Config::default();
        config.hybrid.medium = 0.9;
        config.hybrid.high = 0.8;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("very_low <= medium <= high"));
    }

    #[test]
    fn test_validate_bad_glob() {
        let config = Config {
            excluded_paths: vec!["src/[".to_string()],
            ..Config::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_template_is_valid() {
        let config = Config::parse(include_str!("templates/driftcheck.yaml")).unwrap();
        assert!(validate(&config).is_ok());
        assert_eq!(config.verification.threshold, 80);
    }

    #[test]
    fn test_missing_credential() {
        let reasoning = ReasoningConfig {
            api_key_env: "DRIFTCHECK_TEST_UNSET_KEY".to_string(),
            ..ReasoningConfig::default()
        };
        assert_eq!(
            reasoning.api_key(),
            Err(ConfigurationError::MissingCredential(
                "DRIFTCHECK_TEST_UNSET_KEY".to_string()
            ))
        );
    }

    #[test]
    fn test_discover_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DEFAULT_CONFIG_NAMES
            .iter()
            .all(|n| !dir.path().join(n).exists()));
        std::fs::write(dir.path().join(".driftcheck.yaml"), "matching:\n  threshold: 0.6\n").unwrap();
        let found = discover(dir.path()).unwrap();
        assert!(found.ends_with(".driftcheck.yaml"));
        let config = Config::parse_file(&found).unwrap();
        assert_eq!(config.matching.threshold, 0.6);
    }
}
