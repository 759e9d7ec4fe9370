/// Core types shared across all Mycotax modules
pub mod taxonomy;

// Re-export commonly used types at module level
pub use taxonomy::{Rank, RankSet, LEVELS, PRED_BATCH_SIZE, UNKNOWN_STR};
