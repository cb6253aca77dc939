pub mod client;
pub mod scanner;
pub mod types;

pub use client::{BuildApi, ConcourseClient};
pub use scanner::{BuildScanner, ScanReport};
