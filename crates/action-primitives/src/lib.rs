//! Frame-aware element interaction
//!
//! This crate turns selector candidates into reliable page actions:
//! - Context resolution across the main document and every frame, polled until a deadline
//! - A two-phase visibility gate sharing one deadline
//! - Click, type and dropdown selection with bounded retries
//!
//! Everything talks to the browser through [`PagePort`]; [`CdpPage`] is the live implementation.

pub mod errors;
mod locator;
pub mod matching;
pub mod ports;
mod primitives;
mod retry;
pub mod types;
mod waiting;

pub use errors::*;
pub use locator::*;
pub use matching::{normalize, select_match, ItemMatch, MatchTier};
pub use ports::{CdpPage, PagePort};
pub use primitives::*;
pub use retry::with_retries;
pub use types::*;
pub use waiting::*;
