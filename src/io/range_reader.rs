use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;

/// Random-access byte source that TIFF directories are decoded from.
///
/// The decoder only ever issues positioned reads, so implementations can sit
/// on top of a local file, an in-memory buffer or an object store. A reader
/// is shared (behind an `Arc`) by every [`Image`](crate::Image) produced from
/// the same file; whether concurrent reads are safe is up to the
/// implementation.
#[async_trait]
pub trait RangeReader: Send + Sync {
    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// A range that runs past the end of the resource is an error; partial
    /// data is never returned.
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    /// Total size of the resource in bytes.
    fn size(&self) -> u64;

    /// Identifier for logging, e.g. a path or `s3://bucket/key`.
    fn identifier(&self) -> &str;
}

#[async_trait]
impl<R: RangeReader + ?Sized> RangeReader for Arc<R> {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        (**self).read_exact_at(offset, len).await
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    fn identifier(&self) -> &str {
        (**self).identifier()
    }
}

/// Check that `len` bytes at `offset` lie within a resource of `size` bytes.
pub(crate) fn check_range(offset: u64, len: usize, size: u64) -> Result<(), IoError> {
    let in_bounds = offset
        .checked_add(len as u64)
        .is_some_and(|end| end <= size);
    if in_bounds {
        Ok(())
    } else {
        Err(IoError::RangeOutOfBounds {
            offset,
            requested: len as u64,
            size,
        })
    }
}
