mod block_cache;
mod file_reader;
mod memory_reader;
mod range_reader;
mod s3_reader;

pub use block_cache::{BlockCache, CacheStats, DEFAULT_BLOCK_SIZE, DEFAULT_CACHE_CAPACITY};
pub use file_reader::FileRangeReader;
pub use memory_reader::MemoryReader;
pub use range_reader::RangeReader;
pub use s3_reader::{create_s3_client, ObjectRef, S3RangeReader};
