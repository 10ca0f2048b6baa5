// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod error;
pub mod market;
pub mod metrics;
pub mod oracle;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod sources;
pub mod summarizer;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::error::ServiceError;
pub use crate::pipeline::{FinancialDataPipeline, ResultBundle};

/// Short stable identifier for a question, so logs never carry raw user
/// text. First six bytes of the SHA-256, hex-encoded.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
