pub mod encoder;
pub mod hierarchy;
pub mod lineage;

// Re-export commonly used types
pub use encoder::TaxonEncoder;
pub use hierarchy::TaxonHierarchy;
pub use lineage::{is_complete, parse_unite_lineage};
