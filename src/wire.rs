pub mod bus;
pub mod hal;
pub mod simulated;
pub mod status;

pub use bus::*;
pub use hal::*;
pub use simulated::*;
pub use status::*;
