//! # graft configuration
//!
//! Type-safe configuration for the translation engine: authorization
//! placement settings and statement shape settings.
//!
//! ## Features
//!
//! - TOML and JSON support, picked by file extension
//! - Every field has a default; an empty file is a valid configuration
//! - Validation of values serde cannot check on its own
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use graft_config::ConfigLoader;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("graft.toml")?;
//!     println!("root variable: {}", config.query.root_variable);
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod loader;

pub use config::*;
pub use error::*;
pub use loader::*;
