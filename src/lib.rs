pub mod agent;
pub mod config;
pub mod core;
pub mod error;
pub mod hooks;
pub mod log;
pub mod state;

pub use core::{Iteration, Task, TaskStatus};
pub use error::{Error, Result};
pub use state::{Manager, Store};
