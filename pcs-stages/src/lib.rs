pub mod attribute_filter;
pub mod chunked;
pub mod error;
pub mod header_alias;
pub mod limit;
pub mod passthrough;
pub mod reproject;
pub mod roi;
pub mod select_set;
pub mod select_value;

pub use attribute_filter::AttributeFilter;
pub use chunked::{Chunk, ChunkedCursor};
pub use error::SetupError;
pub use header_alias::AliasHeader;
pub use limit::PointLimit;
pub use passthrough::PassThrough;
pub use reproject::CrsConversion;
pub use roi::RoiSelector;
pub use select_set::{AttributeSetSelector, SetMode};
pub use select_value::{AttributeSelector, Comparator};
