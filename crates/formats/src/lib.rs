pub mod error;
pub mod geojson;
pub mod topology;
pub mod world;

pub use error::*;
pub use geojson::*;
pub use topology::*;
pub use world::*;
