//! Jokes Server - HTTP gateway for the joke store
//!
//! Exposes joke-store operations over HTTP. Reads are public; listing,
//! adding and deleting require a bearer token the accounts service accepts
//! as admin.
//!
//! # Example
//!
//! ```rust,ignore
//! use jokes_server::{cli, server};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = cli::load_config(&cli::command().get_matches())?;
//! server::serve(&config, server::shutdown_signal()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod accounts;
pub mod cli;
pub mod error;
pub mod logging;
pub mod routes;
pub mod server;

pub use accounts::AccountsClient;
pub use error::{handle_rejection, ApiError, Operation};
pub use routes::{routes, AppState, JokeQuery, MAX_BODY_BYTES};
pub use server::{bind, serve, shutdown_signal, ServerError};
