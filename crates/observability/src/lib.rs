//! Tracing/logging setup shared by every binary of the workspace.

/// Initialize process-wide logging with the default filter.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(None);
}

/// Initialize process-wide logging with an explicit filter (e.g. from config).
///
/// `RUST_LOG` still takes precedence when set.
pub fn init_with_filter(filter: &str) {
    tracing::init(Some(filter));
}

/// Tracing configuration (filters, layers).
pub mod tracing;
