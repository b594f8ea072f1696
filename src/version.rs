// Crate identity baked in at compile time

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

/// "speedlog 0.1.0", logged at startup.
pub fn banner() -> String {
    format!("{NAME} {VERSION}")
}
