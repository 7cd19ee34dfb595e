pub mod bounds;
pub mod hash;
pub mod math;
pub mod rng;

// Foundation crate: small, well-tested primitives only.
pub use bounds::*;
pub use hash::*;
pub use rng::*;
