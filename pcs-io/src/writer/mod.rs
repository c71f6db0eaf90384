pub mod las;
pub mod pcd;

pub use las::write_las;
pub use pcd::{write_pcd, PcdDataStorage};
