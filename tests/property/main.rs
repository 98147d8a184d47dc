//! Property-based tests for the packfile engine.
//!
//! Run with: `cargo test --test property`
