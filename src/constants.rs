pub const BYTES_PER_KB: usize = 1024;
pub const BYTES_PER_MB: usize = 1024 * 1024;

pub const DEFAULT_CHUNK_SIZE_MB: usize = 2048;
pub const DEFAULT_IO_BUFFER_SIZE_KB: usize = 64;
pub const MERGE_OUTPUT_BUFFER_SIZE_KB: usize = 256;

pub const CHUNK_FILE_PREFIX: &str = "chunk_";
pub const CHUNK_FILE_EXTENSION: &str = ".tmp";
pub const TEMP_DIR_PREFIX: &str = "linesort_";

pub const RECORD_SEPARATOR: &str = ". ";

pub const DEFAULT_OUTPUT_FILE_NAME: &str = "generated.txt";
pub const DEFAULT_TARGET_BYTES: u64 = 20 * 1024 * 1024 * 1024;
pub const DEFAULT_LINES_PER_BATCH: usize = 1000;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 512;
pub const FALLBACK_PRODUCER_COUNT: usize = 4;

pub const REUSE_ONE_IN: u32 = 500;
pub const MIN_TEXT_LENGTH: usize = 3;
pub const MAX_TEXT_LENGTH: usize = 64;
pub const MAX_RANDOM_NUMBER: i64 = 1_000_000;

pub const PROGRESS_STEPS: u64 = 20;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_USAGE: u8 = 1;
pub const EXIT_INPUT_MISSING: u8 = 2;
pub const EXIT_IO_ERROR: u8 = 3;
pub const EXIT_CANCELLED: u8 = 4;
pub const EXIT_UNEXPECTED: u8 = 99;
