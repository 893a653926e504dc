//! # View State Module
//!
//! Headless state for the screens a frontend renders from this core. These
//! types own no pixels: they hold shared entity cells, load phases, and
//! derived counts, and the frontend polls their change tickets to decide
//! what to re-render.

pub mod feed;
pub mod profile;

pub use feed::{FeedPage, PageLoadPhase};
pub use profile::{ProfileStats, ProfileStatsView};
