//! Tailfeed Core - Entity Model and Effect Interfaces
//!
//! Leaf crate of the Tailfeed client core. It provides:
//!
//! - Identifiers: [`PostId`], [`UserId`]
//! - Entity model: [`FeedEntity`] and the shared [`Interactions`] capability
//!   block behind `as_interactable`
//! - Reactive primitive: [`Shared`] cells with poll-based [`ChangeTicket`]s
//! - Effect interfaces: the remote-store traits the rest of the system
//!   consumes ([`effects`])
//! - Error types: [`EntityError`], [`RemoteStoreError`]
//!
//! # Architecture
//!
//! This crate is pure: no runtime, no transport, no application logic. The
//! headless client core (`tailfeed-app`) composes these types into the
//! interaction store, change bus, and hydration coordinator; deterministic
//! handlers live in `tailfeed-testkit`.

pub mod effects;
pub mod entity;
pub mod error;
pub mod identifiers;
pub mod reactive;

// Re-export primary types
pub use effects::{InteractionQueryEffects, InteractionWriteEffects, SocialGraphEffects};
pub use entity::{
    FeedEntity, InteractionKind, InteractionSnapshot, Interactions, ParlayPick, ParlayRecord,
    PostRecord,
};
pub use error::{EntityError, RemoteStoreError};
pub use identifiers::{PostId, UserId};
pub use reactive::{ChangeTicket, Shared};
