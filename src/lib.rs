//! Tool-use agent core: a Conversation Engine that drives an LLM through a
//! tool-use loop to edit repositories and answer questions, plus an
//! Investigation Scheduler that runs the same engine headlessly against
//! incoming alerts.

pub mod agent;
pub mod config;
pub mod errors;
pub mod fs;
pub mod ingress;
pub mod investigation;
pub mod providers;

/// Re-exports for fuzz targets. Not part of the public API.
#[doc(hidden)]
pub mod fuzz_api {
    /// Wrapper around `ingress::validate_webhook_signature` for fuzz targets.
    pub fn validate_webhook_signature(secret: &str, signature: &str, body: &[u8]) -> bool {
        crate::ingress::validate_webhook_signature(secret, signature, body)
    }
}
