//! Reply-thread reconstruction and live merging for one channel view.
//!
//! [`assemble`] turns a fetched batch into a [`ThreadForest`]; a
//! [`ThreadStore`] keeps that forest up to date as messages are sent,
//! pushed, edited and removed; [`LiveMerger`] maps gateway events onto the
//! store. Nothing here does I/O.

pub mod assembler;
pub mod forest;
pub mod merger;
pub mod store;

pub use assembler::{assemble, chronological};
pub use forest::{ThreadForest, ThreadNode, Walk};
pub use merger::{LiveMerger, MergeOutcome, MergeStats};
pub use store::{InsertOutcome, ThreadStore};
