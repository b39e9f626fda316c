//! # CLI Module
//!
//! Command implementations behind the `musync` binary. Each command handles
//! user interaction (spinners, progress bars, tables, colored messages) and
//! delegates the actual work to the library modules.
//!
//! ## Commands
//!
//! - [`auth`] - Runs the Google OAuth 2.0 PKCE flow and stores the token
//! - [`update`] - Discovers new tracks on the user's home and downloads them
//! - [`download`] - Downloads an explicit list of tracks
//! - [`list_cache`] - Shows the tracks a library has already processed
//!
//! ## Layers
//!
//! ```text
//! CLI Layer (User Interface)
//!     ↓
//! Download Layer (queue, executor, yt-dlp)   Discovery (YouTube Data API)
//!     ↓                                          ↓
//! Management Layer (track cache, token)
//! ```
//!
//! ## Usage
//!
//! ```bash
//! musync auth
//! musync library --dir ~/Music update --limit 20
//! musync library --dir ~/Music download dQw4w9WgXcQ
//! musync library --dir ~/Music cache --search queen
//! ```
//!
//! A running batch stops after the current track on Ctrl+C or SIGTERM; the
//! summary then lists how many tracks remain for the next run.

mod auth;
mod cache;
mod library;
mod progress;
mod review;

pub use auth::auth;
pub use cache::list_cache;
pub use library::UpdateOptions;
pub use library::download;
pub use library::update;
pub use progress::TerminalObserver;
pub use progress::print_summary;
