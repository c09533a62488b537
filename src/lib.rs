/// Account moderation service
///
/// Role moderation (restrict, ban), an append-only audit ledger and a
/// three-strikes escalation policy over a SQLite account store.

pub mod account;
pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod moderation;
pub mod query;
pub mod server;

pub use context::AppContext;
pub use error::{ModError, ModResult};
