pub mod command;
pub mod console;
pub mod dispatcher;
pub mod engine;
pub mod script;
pub mod session;

pub use command::*;
pub use console::*;
pub use dispatcher::*;
pub use engine::*;
pub use session::*;
