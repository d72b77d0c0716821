//! Authentication module for managing user sessions.
//!
//! This module provides:
//! - `TokenStorage`: durable key/value backends (file, OS keychain, memory)
//! - `SessionStore`: the access token, refresh token, and user id as one unit
//! - `AuthManager`: login, logout, and coalesced token refresh
//!
//! Sessions survive restarts; a restored session is validated lazily by the
//! first API call that uses it.

pub mod manager;
pub mod session;
pub mod storage;
pub mod store;

pub use manager::{AuthManager, AuthState};
pub use session::{Credentials, Session};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, TokenStorage};
pub use store::SessionStore;
