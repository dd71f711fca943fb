//! Logging setup for applications embedding isoscope.

/// Installs the `env_logger` backend.
///
/// Filtering follows `RUST_LOG`. Calling this more than once, or after
/// another logger was installed, is harmless.
pub fn init_logging() {
    let _ = env_logger::try_init();
    log::debug!("isoscope logging initialized");
}
