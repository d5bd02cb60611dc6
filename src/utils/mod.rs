//! Utility functions shared by the index and the binary.
//!
//! ## Modules
//!
//! - [`app_data`] - Loading the index configuration from the config directory
//! - [`encoding`] - Varints and the run coder used by the record stream
//! - [`progress`] - Progress bars that become no-ops without the `progress` feature

pub mod app_data;
pub mod encoding;
pub mod progress;

pub use app_data::*;
pub use encoding::*;
