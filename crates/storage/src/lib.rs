//! Storage abstraction and implementations for Resman.
//!
//! This crate provides a trait-based storage interface with a JSON file
//! reference implementation and an in-memory store that publishes changes.

#![warn(missing_docs)]

pub mod trait_;
pub mod guard;
pub mod json_storage;
pub mod memory;

pub use trait_::{Storage, StorageError, Result};
pub use json_storage::JsonStorage;
pub use memory::{MemoryStore, DEFAULT_CHANNEL_CAPACITY};
