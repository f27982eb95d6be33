//! `crm-session` — the per-session context that owns the role authority, the
//! signed-in profile, and the active tenant.
//!
//! Components receive a [`Session`] instead of reaching for globals.

pub mod config;
pub mod error;
pub mod session;

pub use config::SessionConfig;
pub use error::SessionError;
pub use session::Session;
