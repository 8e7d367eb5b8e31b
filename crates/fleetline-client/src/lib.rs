#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Session-aware HTTP client for the Fleetline device-management API.
//!
//! The centrepiece is [`ApiClient`]: every request carries the current
//! bearer token, and an unauthorized response triggers exactly one token
//! refresh no matter how many requests fail concurrently. The first failure
//! leads the refresh; the rest queue behind it and replay once the outcome
//! is known.
//!
//! Layout:
//! - `session.rs`: the single-flight refresh state (token slot, in-progress
//!   flag, waiter queue)
//! - `http.rs`: `ApiClient` and the retry-after-refresh request path
//! - `credentials.rs`: persisted token storage
//! - `auth.rs` / `devices.rs`: typed service wrappers
//! - `store.rs`: cached profile of the signed-in user
//! - `config.rs` / `error.rs`: connection settings and the error taxonomy

pub mod auth;
pub mod config;
pub mod credentials;
pub mod devices;
pub mod error;
pub mod http;
pub mod session;
pub mod store;

pub use auth::AuthService;
pub use config::ClientConfig;
pub use credentials::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use devices::DeviceService;
pub use error::{ClientError, ClientResult, RefreshError};
pub use http::ApiClient;
pub use session::{RefreshTicket, SessionManager};
pub use store::UserStore;
