/// Intercept messages using the `log` crate and print them to STDERR. The default filter is
/// `info`; set `RUST_LOG` to override, like `RUST_LOG=road_network=debug`.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn setup() {
    use env_logger::{Builder, Env};
    let _ = Builder::from_env(Env::default().default_filter_or("info")).try_init();
}
