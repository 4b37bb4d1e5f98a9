//! Configuration settings for Gjenlyd.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub cache: CacheSettings,
}


/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.gjenlyd".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target chunk size in characters.
    pub target_size: usize,
    /// Overlap between adjacent chunks in characters.
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            target_size: 4000,
            overlap: 400,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Hybrid retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Weight given to the dense (vector) ranking; the lexical ranking
    /// receives `1.0 - fusion_weight`.
    pub fusion_weight: f32,
    /// Default number of chunks returned per query.
    pub top_k_default: usize,
    /// Expand returned chunks with their sequence-order neighbors.
    pub context_expansion: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            fusion_weight: 0.5,
            top_k_default: 5,
            context_expansion: false,
        }
    }
}

/// Cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Path to the durable cache tier (SQLite).
    pub sqlite_path: String,
    /// Time-to-live for cached embeddings, in seconds.
    pub ttl_embedding_seconds: u64,
    /// Time-to-live for cached query artifacts, in seconds.
    pub ttl_query_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.gjenlyd/cache.db".to_string(),
            ttl_embedding_seconds: 86_400,
            ttl_query_seconds: 3_600,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::GjenlydError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject option combinations the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.chunking.overlap >= self.chunking.target_size {
            return Err(crate::error::GjenlydError::Config(format!(
                "chunking.overlap ({}) must be smaller than chunking.target_size ({})",
                self.chunking.overlap, self.chunking.target_size
            )));
        }
        if !(0.0..=1.0).contains(&self.retrieval.fusion_weight) {
            return Err(crate::error::GjenlydError::Config(format!(
                "retrieval.fusion_weight ({}) must be within [0.0, 1.0]",
                self.retrieval.fusion_weight
            )));
        }
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gjenlyd")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded durable cache path.
    pub fn cache_path(&self) -> PathBuf {
        Self::expand_path(&self.cache.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.chunking.target_size, 4000);
        assert_eq!(settings.chunking.overlap, 400);
        assert!((settings.retrieval.fusion_weight - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_validate_rejects_degenerate_overlap() {
        let mut settings = Settings::default();
        settings.chunking.overlap = settings.chunking.target_size;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_roundtrip_toml() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.cache.ttl_embedding_seconds, 86_400);
        assert_eq!(parsed.embedding.model, "text-embedding-3-small");
    }
}
