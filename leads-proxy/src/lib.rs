//! # leads-proxy
//!
//! A mock OAuth front for a small customers/leads dataset.
//!
//! The server issues opaque bearer tokens from `/oauth/token`, checks them on
//! every data route, and serves those routes from a pluggable data backend:
//! either seeded in-memory collections or a MockAPI-style remote store that
//! requests are forwarded to.
//!
//! ## Features
//!
//! - **Token endpoint**: `client_credentials`, `authorization_code`, `password`
//!   and `refresh_token` grants, optional client id/secret check
//! - **Bearer middleware**: lazy expiry with eviction, no background sweep
//! - **Data backends**: in-memory (filter, sort, paginate, `X-Total-Count`) or
//!   remote pass-through with status and body relayed on failure
//! - **Reset**: `/__reset?key=...` wipes and republishes the seed dataset
//!
//! ## Example
//!
//! ```rust,no_run
//! use leads_proxy::{LeadsProxyServer, ProxyConfig};
//!
//! # async fn example() -> leads_proxy::Result<()> {
//! let config = ProxyConfig::memory().with_reset_key("letmein");
//! let server = LeadsProxyServer::builder().config(config).build()?;
//!
//! let app = server.router();
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await.unwrap();
//! axum::serve(listener, app).await.unwrap();
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod reset;
pub mod seed;
pub mod server;
pub mod store;
pub mod token;

pub use backend::{DataBackend, MemoryBackend, RemoteBackend, Resource};
pub use config::{BackendKind, ProxyConfig};
pub use error::{Error, Result};
pub use server::{LeadsProxyServer, LeadsProxyServerBuilder};
pub use store::{Clock, ManualClock, MemoryTokenStore, SystemClock, TokenStore};
pub use token::{GrantType, TokenManager};
