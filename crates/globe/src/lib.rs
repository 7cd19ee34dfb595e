pub mod countries;
pub mod dataset;
pub mod render;
pub mod scene;
pub mod speckle;
pub mod view;

pub use countries::*;
pub use dataset::*;
pub use render::*;
pub use scene::*;
pub use speckle::*;
pub use view::*;
