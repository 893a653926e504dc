//! Remote-store effect interfaces
//!
//! Pure trait definitions for the collaborator operations the core consumes.
//! This module defines **what** the remote store can be asked; handlers
//! define **how** — production handlers live with the embedding app's
//! transport layer, deterministic ones in `tailfeed-testkit`.
//!
//! The core never constructs a transport, parses a wire format, or retries
//! on its own; everything observable about the remote store flows through
//! these traits.

pub mod remote;

pub use remote::{InteractionQueryEffects, InteractionWriteEffects, SocialGraphEffects};
