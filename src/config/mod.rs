//! Configuration module for Pensum.

mod settings;

pub use settings::{
    EmbeddingSettings, GeneralSettings, LlmSettings, SearchSettings, SessionSettings, Settings,
    VectorStoreSettings,
};
