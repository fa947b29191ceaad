//! Core types for the Anagrafe patient registry.
//!
//! This crate is deliberately free of terminal and database dependencies.
//! The record store is a plain in-memory structure; persistence is layered on
//! top through the [`persistence::KeyValueStore`] trait, and rendering through
//! the view model in [`view`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod fiscal_code;
pub mod patient;
pub mod persistence;
pub mod registry;
pub mod store;
pub mod view;

pub use error::{Error, PersistenceError, Result};
