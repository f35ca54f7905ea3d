//! Jokes Core - joke-store command protocol
//!
//! Everything between an HTTP handler and the external joke-store binary:
//! - Sanitizes untrusted joke fields before they become process arguments
//! - Maps operations deterministically onto joke-store argument vectors
//! - Runs the store and classifies the result under one success policy
//! - Validates the store's JSON output structurally
//! - Defines the delegated authorization seam
//!
//! # Example
//!
//! ```rust,ignore
//! use jokes_core::{JokeService, JokeStoreInvoker, MaxStringLength};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let invoker = JokeStoreInvoker::new("/opt/jokes/bin", "/var/lib/jokes.db");
//! let service = JokeService::new(Arc::new(invoker), "280".parse()?);
//!
//! let joke = service.get_joke(Some("en")).await?;
//! println!("{}: {}", joke.lang, joke.text);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod auth;
pub mod config;
pub mod error;
pub mod invoker;
pub mod sanitize;
pub mod service;
pub mod types;
pub mod validation;

// Re-exports for convenience
pub use auth::{bearer_token, AuthDecision, AuthError, Authorizer, BEARER_PREFIX};
pub use config::{AccountsConfig, GatewayConfig, LogFormat, RawConfig, StoreConfig};
pub use error::{ConfigError, ExecutionError, ServiceError};
pub use invoker::{ArchShim, CommandInvoker, JokeStoreInvoker, SuccessPolicy, ERROR_SENTINEL};
pub use sanitize::{sanitize, sanitize_joke, MaxStringLength};
pub use service::{JokeService, StoreCommand};
pub use types::{CommandResult, Joke, JokeCollection, JokeDraft};
pub use validation::{
    is_joke, is_jokes, validate_draft, validate_joke, validate_jokes, ShapeMismatch,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
