pub mod bridge;
pub mod bridge_settings;
pub mod hexbytes;
pub mod wire;

pub use bridge_settings::*;
