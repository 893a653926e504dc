//! Tailfeed Testing Infrastructure
//!
//! Shared fixtures for exercising the client core without a real remote
//! store: entity builders with deterministic defaults, and a scriptable
//! in-memory remote implementing every collaborator trait.
//!
//! # Usage
//!
//! Add this to your crate's `Cargo.toml` dev-dependencies:
//! ```toml
//! [dev-dependencies]
//! tailfeed-testkit = { path = "../tailfeed-testkit" }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod factories;
pub mod mock_remote;

pub use factories::{fresh_post_id, mixed_page, unknown_entity, ParlayBuilder, PostBuilder};
pub use mock_remote::{MockRemote, RemoteCall, RemoteOp};
