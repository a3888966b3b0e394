//! Configuration loading and schema definitions
//!
//! Engine settings shared by the engine crate and the CLI.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
