pub mod chain;
pub mod config;
pub mod document;
pub mod error;
pub mod io;
pub mod paths;
pub mod stage;
pub mod store;

pub use error::{Result, SpecliftError};
