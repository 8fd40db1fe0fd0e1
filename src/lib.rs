pub mod constants;
pub mod error;
pub mod generate;
pub mod record;
pub mod sort;
pub mod utils;

// Re-export main types for easier access
pub use error::{Error, Result};
pub use generate::{generate_file, GenerateConfig, GenerateStats, Generator};
pub use record::Record;
pub use sort::{sort_file, SortConfig, SortProcessor, SortStats};
