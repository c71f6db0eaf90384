pub mod cursor;
pub mod header;
pub mod memory;
pub mod value;

pub use cursor::{Coordinate, EmptyCursor, PointCursor, PointCursorExt, PtColor, PtGeometry};
pub use header::{CloudHeader, FullCloudAccess};
pub use memory::{BufferCloud, BufferCursor, BufferHeader, BufferPoint};
pub use value::{GenericValue, ValueError};
