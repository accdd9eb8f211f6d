//! Libris application library
//!
//! The books module, the browser client, and the bootstrap that wires them
//! onto the libris kernel.

pub mod bootstrap;
pub mod client;
pub mod modules;

pub use bootstrap::Application;
