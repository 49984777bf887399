//! Working directories, disks and staging of produced files

pub mod disks;
pub mod stager;
pub mod temp;

pub use disks::DiskRegistry;
pub use stager::{StagedOutput, Stager};
pub use temp::TemporaryDirectories;
