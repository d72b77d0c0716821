//! Core library for Tallybook, a personal finance tracker client.
//!
//! The remote API owns all business logic; this crate owns the client side
//! of it:
//!
//! - `auth`: durable token storage, the session store, and the
//!   `AuthManager` that logs in, logs out, and refreshes access tokens
//! - `api`: the authenticated request pipeline and the typed `FinanceApi`
//! - `models`: categories, transactions, budgets, summaries
//! - `navigation`: client routes and the login guard
//! - `config`: persisted application configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod navigation;
pub mod utils;

pub use api::{ApiError, AuthenticatedClient, FinanceApi, RequestDescriptor};
pub use auth::{AuthManager, AuthState, Credentials, Session, SessionStore};
pub use config::Config;
pub use navigation::Route;
