// Application layer - use cases over the domain and the stores:
// authentication, per-account ledger sessions, and the facade tying them
// together for front ends.

mod auth;
pub mod error;
mod locks;
mod pocketbook;
mod service;

pub use auth::*;
pub use error::*;
pub use pocketbook::*;
pub use service::*;
