//! # API Module
//!
//! HTTP endpoints of the short-lived local server that receives the Google
//! OAuth redirect during `musync auth`.
//!
//! - [`callback`] completes the PKCE flow: it exchanges the authorization code
//!   for a token and stores it in the shared state the auth command waits on.
//! - [`health`] reports status and version.
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use musync::api::{callback, health};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
