//! Configuration module for Gjenlyd.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    CacheSettings, ChunkingSettings, EmbeddingSettings, GeneralSettings, RetrievalSettings,
    Settings,
};
