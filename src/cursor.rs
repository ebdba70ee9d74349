//! Lazy, single-pass cursor over query results.

use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::{self, Stream};

use crate::codec;
use crate::driver::{Document, DriverError, QueryBatch, StorageDriver};
use crate::error::{ArangodanticError, Result};
use crate::record::Record;
use crate::translate::{translate, FaultContext};

/// `Open -> Exhausted | Closed`; neither end state reopens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Open,
    Exhausted,
    Closed,
}

/// Typed view over a query's batches.
///
/// Batches beyond the first are fetched on demand. Draining the cursor or
/// calling [`close`](Cursor::close) releases the server-side cursor; dropping
/// an open cursor schedules the release on the current tokio runtime.
pub struct Cursor<R> {
    driver: Arc<dyn StorageDriver>,
    collection: String,
    cursor_id: Option<String>,
    buffer: VecDeque<Document>,
    has_more: bool,
    count: Option<u64>,
    full_count: Option<u64>,
    state: CursorState,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Cursor<R> {
    pub(crate) fn new(driver: Arc<dyn StorageDriver>, collection: String, batch: QueryBatch) -> Self {
        let has_more = batch.has_more && batch.cursor_id.is_some();
        let state = if batch.documents.is_empty() && !has_more {
            CursorState::Exhausted
        } else {
            CursorState::Open
        };
        Cursor {
            driver,
            collection,
            cursor_id: batch.cursor_id.filter(|_| has_more),
            buffer: batch.documents.into(),
            has_more,
            count: batch.count,
            full_count: batch.full_count,
            state,
            _record: PhantomData,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Number of documents in the result, when requested with `with_count`.
    pub fn count(&self) -> Result<u64> {
        self.count.ok_or_else(|| {
            ArangodanticError::Cursor("count was not requested; use FindOptions::with_count".into())
        })
    }

    /// Number of matches ignoring limit and offset, when requested with `with_full_count`.
    pub fn full_count(&self) -> Result<u64> {
        self.full_count.ok_or_else(|| {
            ArangodanticError::Cursor(
                "full count was not requested; use FindOptions::with_full_count".into(),
            )
        })
    }

    fn fault(&self, err: DriverError) -> ArangodanticError {
        translate(err, FaultContext::new(R::TYPE_NAME, &self.collection))
    }

    /// The next record, or `None` once the cursor is exhausted or closed.
    pub async fn next(&mut self) -> Result<Option<R>> {
        loop {
            if self.state != CursorState::Open {
                return Ok(None);
            }
            if let Some(document) = self.buffer.pop_front() {
                return codec::decode(document).map(Some);
            }
            let cursor_id = match (&self.cursor_id, self.has_more) {
                (Some(id), true) => id.clone(),
                _ => {
                    self.state = CursorState::Exhausted;
                    self.cursor_id = None;
                    return Ok(None);
                }
            };

            tracing::debug!(collection = %self.collection, cursor = %cursor_id, "fetching next batch");
            let batch = self
                .driver
                .next_batch(&cursor_id)
                .await
                .map_err(|err| self.fault(err))?;
            self.has_more = batch.has_more;
            self.cursor_id = batch.cursor_id.filter(|_| batch.has_more);
            self.buffer.extend(batch.documents);
        }
    }

    /// Drain the remaining records in storage order.
    pub async fn to_list(&mut self) -> Result<Vec<R>> {
        let mut records = Vec::with_capacity(self.buffer.len());
        loop {
            match self.next().await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => return Ok(records),
                Err(err) => {
                    if let Err(close_err) = self.close(true).await {
                        tracing::warn!(collection = %self.collection, error = %close_err, "failed to close cursor");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Close the cursor, releasing the server-side resource.
    ///
    /// Returns whether a server-side cursor was closed. A cursor the server no
    /// longer knows fails with `CursorNotFound` unless `ignore_missing`.
    pub async fn close(&mut self, ignore_missing: bool) -> Result<bool> {
        self.state = CursorState::Closed;
        self.buffer.clear();
        self.has_more = false;
        let Some(cursor_id) = self.cursor_id.take() else {
            return Ok(false);
        };

        match self.driver.close_cursor(&cursor_id).await {
            Ok(()) => Ok(true),
            Err(err) => match self.fault(err) {
                ArangodanticError::CursorNotFound(_) if ignore_missing => Ok(false),
                other => Err(other),
            },
        }
    }

    /// Consume the cursor as a `Stream` of records.
    pub fn into_stream(self) -> impl Stream<Item = Result<R>> {
        stream::try_unfold(self, |mut cursor| async move {
            let next = cursor.next().await?;
            Ok::<_, ArangodanticError>(next.map(|record| (record, cursor)))
        })
    }
}

impl<R> Drop for Cursor<R> {
    fn drop(&mut self) {
        if self.state != CursorState::Open {
            return;
        }
        let Some(cursor_id) = self.cursor_id.take() else {
            return;
        };
        let driver = self.driver.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(err) = driver.close_cursor(&cursor_id).await {
                        tracing::warn!(cursor = %cursor_id, error = %err, "failed to close dropped cursor");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(cursor = %cursor_id, "cursor dropped outside a tokio runtime; not closed");
            }
        }
    }
}

impl<R> fmt::Debug for Cursor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("collection", &self.collection)
            .field("cursor_id", &self.cursor_id)
            .field("buffered", &self.buffer.len())
            .field("state", &self.state)
            .finish()
    }
}
