//! Data model shared by every layer.

pub mod memory;
pub mod outputs;
pub mod routing;
pub mod state;
pub mod tool;

pub use memory::*;
pub use outputs::*;
pub use routing::*;
pub use state::*;
pub use tool::*;
