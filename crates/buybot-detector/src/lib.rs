//! Swap classification.
//!
//! Decides whether a pool swap bought the tracked token with the pool's base
//! asset, and extracts the raw amounts of a buy.

pub mod classifier;

pub use classifier::{classify, Classification, NotABuyReason};
