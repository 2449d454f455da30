//! Core types and trait definitions for the Meld identity-resolution engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod collision;
pub mod contact;
pub mod error;
pub mod event;
pub mod fact;
pub mod identifier;
pub mod mention;
pub mod merge;
pub mod person;
pub mod report;
pub mod store;
pub mod suggestion;

pub use error::{Error, Result};
