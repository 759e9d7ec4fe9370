//! Core utilities and types shared across all Mycotax crates

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    load_config, save_config, ChainedConfig, ClassifierConfig, ConfigMap, HeadKind,
};
pub use error::{MycotaxError, MycotaxResult};

// Re-export core types
pub use types::{Rank, RankSet, LEVELS, PRED_BATCH_SIZE, UNKNOWN_STR};

/// Version information for the Mycotax project
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
