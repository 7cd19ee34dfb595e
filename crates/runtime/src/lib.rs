pub mod animation;
pub mod frame;
pub mod rotation;

pub use animation::*;
pub use frame::*;
pub use rotation::*;
