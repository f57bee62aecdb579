//! Process-wide tracing setup.

pub mod subscriber;

pub use subscriber::LogFormat;

/// Install the global subscriber using `RUST_LOG` and `LOG_FORMAT`.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    subscriber::init(LogFormat::from_env());
}
