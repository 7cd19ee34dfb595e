//! Batch photo upload for gallery fields.
//!
//! Files are converted (HEIC → JPEG) and uploaded one at a time, then appended
//! to a document's gallery array in a single mutation. The asset store, the
//! document patcher and the HEIC converter are collaborators behind traits so
//! any conforming backend can be plugged in.

pub mod collab;
pub mod content_lake;
pub mod file;
pub mod gallery;
pub mod heic;
pub mod widget;

pub use collab::*;
pub use content_lake::*;
pub use file::*;
pub use gallery::*;
pub use heic::*;
pub use widget::*;
