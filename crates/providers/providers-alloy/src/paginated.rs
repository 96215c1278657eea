//! Range pagination with fixed subdivision on oversized responses.

use crate::{ChainDataProvider, LogFilter, ProviderError, ProviderResult};
use async_trait::async_trait;
use quarry_types::{BlockRange, BlockRecord, RawLog, TransactionRecord};
use std::future::Future;
use tracing::{debug, trace};

/// The default number of blocks requested per page.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// A [`ChainDataProvider`] that splits requests into pages.
///
/// Each request is cut into pages of at most `page_size` blocks which are
/// fetched one after the other. A page rejected with
/// [`ProviderError::RangeTooLarge`] is halved and both halves are retried in
/// order, down to single blocks; a single block that is still too large
/// fails the request. Every other error is returned as is.
#[derive(Debug, Clone)]
pub struct PaginatedProvider<P> {
    inner: P,
    page_size: u64,
}

impl<P> PaginatedProvider<P> {
    /// Wraps `inner`, requesting at most `page_size` blocks at a time.
    ///
    /// A page size of zero is treated as one.
    pub const fn new(inner: P, page_size: u64) -> Self {
        Self { inner, page_size: if page_size == 0 { 1 } else { page_size } }
    }

    /// Returns the page size.
    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Returns the wrapped provider.
    pub const fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: ChainDataProvider> PaginatedProvider<P> {
    async fn paginate<T, F, Fut>(&self, range: BlockRange, fetch: F) -> ProviderResult<Vec<T>>
    where
        T: Send,
        F: Fn(BlockRange) -> Fut + Send + Sync,
        Fut: Future<Output = ProviderResult<Vec<T>>> + Send,
    {
        let mut items = Vec::new();
        for page in range.chunks(self.page_size) {
            // Windows are popped from the back, so the upper half of a split
            // page is pushed first.
            let mut pending = vec![page];
            while let Some(window) = pending.pop() {
                match fetch(window).await {
                    Ok(fetched) => {
                        let count = fetched.len();
                        trace!(target: "provider", %window, count, "Fetched window");
                        items.extend(fetched);
                    }
                    Err(ProviderError::RangeTooLarge { .. }) => {
                        let Some((lower, upper)) = window.halve() else {
                            return Err(ProviderError::RangeTooLarge { range: window });
                        };
                        debug!(
                            target: "provider",
                            %window,
                            %lower,
                            %upper,
                            "Range too large, splitting"
                        );
                        pending.push(upper);
                        pending.push(lower);
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl<P: ChainDataProvider> ChainDataProvider for PaginatedProvider<P> {
    async fn chain_id(&self) -> ProviderResult<u64> {
        self.inner.chain_id().await
    }

    async fn latest_block_number(&self) -> ProviderResult<u64> {
        self.inner.latest_block_number().await
    }

    async fn blocks(&self, range: BlockRange) -> ProviderResult<Vec<BlockRecord>> {
        self.paginate(range, |window| self.inner.blocks(window)).await
    }

    async fn transactions(&self, range: BlockRange) -> ProviderResult<Vec<TransactionRecord>> {
        self.paginate(range, |window| self.inner.transactions(window)).await
    }

    async fn logs(&self, range: BlockRange, filter: LogFilter) -> ProviderResult<Vec<RawLog>> {
        self.paginate(range, |window| self.inner.logs(window, filter)).await
    }
}
