//! Task persistence and scheduling.
//!
//! [`Store`] is the durable, thread-safe task collection; [`Manager`] layers
//! the scheduling policy and the task lifecycle operations on top of it.

mod manager;
mod store;

pub use manager::Manager;
pub use store::{Store, StoreMetadata};
