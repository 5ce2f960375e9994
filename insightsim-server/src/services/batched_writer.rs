//! Batched merge writer
//!
//! Buffers samples and commits them through the merge rule in fixed-size
//! transactions. A failed flush leaves earlier batches committed.

use insightsim_common::db::Sample;
use insightsim_common::Result;
use sqlx::SqlitePool;
use tracing::trace;

use crate::services::merger;

pub struct BatchedWriter {
    pool: SqlitePool,
    batch_size: usize,
    buffer: Vec<Sample>,
    /// Rows inserted or overwritten by committed batches
    applied: u64,
    batches: u64,
}

impl BatchedWriter {
    pub fn new(pool: SqlitePool, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            pool,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            applied: 0,
            batches: 0,
        }
    }

    /// Buffer one sample, committing the batch once it is full
    pub async fn write(&mut self, sample: Sample) -> Result<()> {
        self.buffer.push(sample);
        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Commit buffered samples in one transaction
    ///
    /// Returns the rows applied by this flush.
    pub async fn flush(&mut self) -> Result<u64> {
        if self.buffer.is_empty() {
            return Ok(0);
        }
        let batch = std::mem::take(&mut self.buffer);

        let mut tx = self.pool.begin().await?;
        let applied = merger::merge_samples(&mut tx, &batch).await?;
        tx.commit().await?;

        self.applied += applied;
        self.batches += 1;
        trace!(rows = batch.len(), applied, batch = self.batches, "Committed batch");

        self.buffer = batch;
        self.buffer.clear();
        Ok(applied)
    }

    /// Flush the remainder and return the total rows applied
    pub async fn close(mut self) -> Result<u64> {
        self.flush().await?;
        Ok(self.applied)
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Committed batch count
    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
