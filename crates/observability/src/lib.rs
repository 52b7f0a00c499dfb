//! Tracing and logging setup shared by every binary embedding the engine.

use depotscore_infra::{EngineConfig, LogFormat};

/// Initialize process-wide tracing in the requested format.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(format: LogFormat) {
    tracing::init(format);
}

/// Initialize tracing from an engine configuration.
pub fn init_from(config: &EngineConfig) {
    tracing::init(config.log_format);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
