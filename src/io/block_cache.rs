use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use lru::LruCache;
use tokio::sync::{Mutex, Notify, RwLock};

use super::range_reader::check_range;
use super::RangeReader;
use crate::error::IoError;

/// Default block size: 256KB.
pub const DEFAULT_BLOCK_SIZE: usize = 256 * 1024;

/// Default cache capacity in blocks (25.6MB at the default block size).
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Hit/miss counters of a [`BlockCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Block lookups served from memory
    pub hits: u64,
    /// Blocks fetched from the underlying reader
    pub fetches: u64,
}

/// Fixed-size block cache in front of another [`RangeReader`].
///
/// Directory decoding reads a header, then each entry table, then scattered
/// out-of-line values; against remote storage each of those would be a
/// round trip. The cache rounds every read out to whole blocks, keeps the
/// most recently used ones, and lets concurrent misses on one block share a
/// single fetch.
pub struct BlockCache<R> {
    inner: Arc<R>,
    block_size: usize,
    blocks: RwLock<LruCache<u64, Bytes>>,
    pending: Mutex<HashMap<u64, Arc<Notify>>>,
    hits: AtomicU64,
    fetches: AtomicU64,
}

impl<R: RangeReader> BlockCache<R> {
    /// Wrap `inner` with the default block size and capacity.
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_BLOCK_SIZE, DEFAULT_CACHE_CAPACITY)
    }

    /// Wrap `inner` caching at most `capacity` blocks of `block_size` bytes.
    ///
    /// Zero values are raised to 1.
    pub fn with_capacity(inner: R, block_size: usize, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(inner),
            block_size: block_size.max(1),
            blocks: RwLock::new(LruCache::new(capacity)),
            pending: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    /// Snapshot of the hit/fetch counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    async fn block(&self, index: u64) -> Result<Bytes, IoError> {
        loop {
            if let Some(block) = self.blocks.write().await.get(&index) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(block.clone());
            }

            let mut pending = self.pending.lock().await;
            let Some(notify) = pending.get(&index).cloned() else {
                pending.insert(index, Arc::new(Notify::new()));
                drop(pending);
                return self.fetch(index).await;
            };

            // Another task is fetching this block. Registering before the
            // lock is released guarantees its wakeup reaches us.
            let notified = notify.notified();
            drop(pending);
            notified.await;
        }
    }

    async fn fetch(&self, index: u64) -> Result<Bytes, IoError> {
        let result = self.fetch_from_inner(index).await;

        let mut blocks = self.blocks.write().await;
        let mut pending = self.pending.lock().await;
        if let Ok(block) = &result {
            blocks.put(index, block.clone());
        }
        if let Some(notify) = pending.remove(&index) {
            notify.notify_waiters();
        }

        result
    }

    async fn fetch_from_inner(&self, index: u64) -> Result<Bytes, IoError> {
        let start = index * self.block_size as u64;
        let size = self.inner.size();
        let len = size.saturating_sub(start).min(self.block_size as u64) as usize;
        if len == 0 {
            return Err(IoError::RangeOutOfBounds {
                offset: start,
                requested: self.block_size as u64,
                size,
            });
        }

        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.inner.read_exact_at(start, len).await
    }
}

#[async_trait]
impl<R: RangeReader + 'static> RangeReader for BlockCache<R> {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.inner.size())?;
        if len == 0 {
            return Ok(Bytes::new());
        }

        let block_size = self.block_size as u64;
        let end = offset + len as u64;
        let first = offset / block_size;
        let last = (end - 1) / block_size;

        if first == last {
            let block = self.block(first).await?;
            let start = (offset - first * block_size) as usize;
            return Ok(block.slice(start..start + len));
        }

        let mut out = BytesMut::with_capacity(len);
        for index in first..=last {
            let block = self.block(index).await?;
            let block_start = index * block_size;
            let from = offset.saturating_sub(block_start) as usize;
            let to = ((end - block_start) as usize).min(block.len());
            out.extend_from_slice(&block[from..to]);
        }

        Ok(out.freeze())
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn identifier(&self) -> &str {
        self.inner.identifier()
    }
}
