//! `taskboard-client`: optimistic client cache for the taskboard API.
//!
//! [`SyncEngine`] keeps an in-memory mirror of projects, tasks and team
//! members. Intents mutate the mirror first, then reach the server either
//! immediately or after a per-key debounce window; failures roll the
//! affected slice back. The transport is the [`TaskboardApi`] trait;
//! [`HttpApi`] is the reqwest implementation.

pub mod api;
pub mod busy;
pub mod debounce;
pub mod engine;
pub mod http;
pub mod state;

pub use api::{ApiError, TaskboardApi};
pub use engine::{SyncConfig, SyncEngine, SyncError};
pub use http::{HttpApi, normalize_base_url};
pub use state::CacheState;
