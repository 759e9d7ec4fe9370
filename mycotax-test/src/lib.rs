//! Test utilities for the Mycotax workspace
//!
//! Shared fixtures so the core, bio and model tests agree on the same toy
//! taxonomies and FASTA snippets.
//!
//! # Features
//!
//! - **Test Environment**: Temporary directories with automatic cleanup
//! - **Fixtures**: Toy taxonomies and UNITE-style sequences
//! - **Tensors**: Hand-set weights for deterministic layer tests
//! - **Assertions**: Probability and lineage consistency checks

pub mod assertions;
pub mod environment;
pub mod fixtures;
pub mod tensors;

// Re-export commonly used items
pub use environment::{TestConfig, TestEnvironment};
pub use fixtures::{
    create_test_fasta, generate_sequences, infer_sum_hierarchy, labelled_sequences, toy_encoder,
    toy_hierarchy, TestSequence,
};
pub use tensors::{random_var_builder, var_builder};

// Re-export test dependencies for convenience
pub use anyhow::{Context, Result};
pub use tempfile;

/// Initialize test logging (safe to call from every test)
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("MYCOTAX_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Run a test inside a fresh temporary environment
///
/// # Example
/// ```rust
/// use mycotax_test::with_test_env;
///
/// with_test_env(|env| {
///     let fasta = env.write_file("query.fasta", ">q1\nACGT\n")?;
///     assert!(fasta.exists());
///     Ok(())
/// })
/// .unwrap();
/// ```
pub fn with_test_env<F, R>(f: F) -> Result<R>
where
    F: FnOnce(&TestEnvironment) -> Result<R>,
{
    let env = TestEnvironment::new()?;
    f(&env)
}
