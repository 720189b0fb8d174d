//! Path-safety validation and filesystem name handling.

pub mod filename;
pub mod path;

pub use filename::truncate_for_filesystem;
pub use path::clean;
