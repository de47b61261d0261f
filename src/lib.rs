//! Book Reader Bridge
//!
//! Instant JSON annotation schema, book resource links, and the command and
//! event channel that drives an embedded PDF view.

pub mod bridge;
pub mod config;
pub mod error;
pub mod instant;
pub mod resource;

pub use bridge::{Bridge, ViewHandle};
pub use config::Config;
pub use error::{BridgeError, Result};
