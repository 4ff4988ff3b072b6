//! Integration tests for buybot.
//!
//! These tests drive the pipeline against in-process fakes:
//! - Pool discovery and subscription on resync
//! - Reconnection after a lost chain connection
//! - Swap to alert, end to end

pub mod common;
