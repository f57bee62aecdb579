//! Built-in channel drivers.

pub mod json;

pub use json::{JsonDriver, JsonDriverConfig};
