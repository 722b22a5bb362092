/// Footprint Core Library - mesh loading, planar slicing and sheet layout
///
/// This library provides the headless part of the layout tool: reading STL,
/// OBJ and PLY meshes, cutting them with a plane, arranging the resulting
/// outlines on a printable sheet and exporting the arrangement.

pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod item;
pub mod loader;
pub mod pdf;
pub mod session;
pub mod sheet;
pub mod slice;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use config::{LayoutConfig, PageSize};
pub use error::{ConfigError, ExportError, LoadError, MeshError, SliceError};
pub use export::ExportReport;
pub use geometry::{Mesh, Triangle};
pub use item::{PlaceableItem, Rect};
pub use session::{LoadOutcome, Session};
pub use sheet::Sheet;
pub use slice::{Plane, SliceResult};
pub use transform::{DisplayScale, Transform};
