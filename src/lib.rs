pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod io;
pub mod storage;
pub mod telemetry;

pub use application::Pocketbook;
pub use domain::*;
pub use storage::{MemoryStore, SqliteStore};
