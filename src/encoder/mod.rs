//! Animated WebP encoding.

mod api;
mod config;

pub use api::encode;
pub use config::EncodeConfig;
