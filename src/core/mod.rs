//! Core domain model: tasks and their attempt history.

pub mod task;

pub use task::{Iteration, Task, TaskStatus};
