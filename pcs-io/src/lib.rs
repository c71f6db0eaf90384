pub mod error;
pub mod reader;
pub mod writer;

pub use error::{OpenError, WriteError};
pub use reader::{open_point_cloud, ReaderStatus};
pub use writer::{write_las, write_pcd, PcdDataStorage};
