//! Authenticated API client for the Newsdesk content platform.
//!
//! The platform's UI layers issue every backend call through
//! [`ApiClient::send`] and receive either an unwrapped payload or a
//! classified [`ApiError`]. Everything in between is this crate's job:
//! attaching the bearer credential, unwrapping the backend's
//! `{status, code, message, data}` envelopes, coordinating an
//! at-most-one-concurrent token refresh shared by all in-flight calls,
//! retrying each failed call at most once, degrading to anonymous
//! access on public endpoints, and forcing a logout when the session is
//! beyond saving.
//!
//! ```no_run
//! use std::sync::Arc;
//! use newsdesk_client::{
//!     ApiClient, ClientConfig, MemoryCredentialStore, NoopNavigator, RequestDescriptor,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ApiClient::new(
//!     ClientConfig::from_env()?,
//!     Arc::new(MemoryCredentialStore::new()),
//!     Arc::new(NoopNavigator),
//! )?;
//!
//! let article = client.send(RequestDescriptor::get("/news/42")).await?;
//! println!("{}", article.into_json());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod navigation;
pub mod request;

pub use auth::{Credential, CredentialStore, MemoryCredentialStore, RefreshCoordinator};
pub use client::ApiClient;
pub use config::ClientConfig;
pub use endpoints::is_anonymous_tolerant;
pub use envelope::Payload;
pub use error::{ApiError, NetworkErrorKind, Result, FORBIDDEN_FALLBACK_MESSAGE};
pub use navigation::{NoopNavigator, SessionNavigator};
pub use request::RequestDescriptor;
