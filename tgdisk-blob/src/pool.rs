use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

use crate::{JobId, TransferError, TransferResult};

/// One upload or download pass: a bounded task group with index-addressed results.
///
/// At most `workers` operations run at once; [`TransferJob::submit`] waits for a
/// free permit. Each task reports `(index, result)` and the job writes the value
/// into slot `index`, so completion order never decides final order. The first
/// failure is kept; later ones are logged. Failed jobs still join every task
/// they scheduled. Dropping a job aborts whatever is still running.
pub struct TransferJob<T> {
    id: JobId,
    gate: Arc<Semaphore>,
    // Set by a failing task before it releases its permit
    tripped: Arc<AtomicBool>,
    tasks: JoinSet<(usize, TransferResult<T>)>,
    slots: Vec<Option<T>>,
    failure: Option<TransferError>,
}

impl<T: Send + 'static> TransferJob<T> {
    pub fn new(id: JobId, workers: usize) -> Self {
        Self {
            id,
            gate: Arc::new(Semaphore::new(workers.max(1))),
            tripped: Arc::new(AtomicBool::new(false)),
            tasks: JoinSet::new(),
            slots: Vec::new(),
            failure: None,
        }
    }

    /// True once any task has failed, even if its result is not joined yet
    pub fn has_failed(&self) -> bool {
        self.failure.is_some() || self.tripped.load(Ordering::Acquire)
    }

    /// Schedule `operation` into the next slot, waiting for a free permit.
    ///
    /// Returns the slot index, or `None` without scheduling anything if the job
    /// has already failed.
    pub async fn submit<F>(&mut self, operation: F) -> TransferResult<Option<usize>>
    where
        F: Future<Output = TransferResult<T>> + Send + 'static,
    {
        let permit = Arc::clone(&self.gate)
            .acquire_owned()
            .await
            .map_err(|_| TransferError::worker("admission gate closed"))?;

        self.reap();
        if self.has_failed() {
            return Ok(None);
        }

        let index = self.slots.len();
        self.slots.push(None);
        let tripped = Arc::clone(&self.tripped);
        self.tasks.spawn(async move {
            let result = operation.await;
            if result.is_err() {
                tripped.store(true, Ordering::Release);
            }
            drop(permit);
            (index, result)
        });
        Ok(Some(index))
    }

    /// Wait until slot `index` is filled and take its value.
    ///
    /// If any task of the job fails first, the remaining tasks are joined and
    /// the first failure is returned.
    pub async fn wait_for(&mut self, index: usize) -> TransferResult<T> {
        loop {
            if self.has_failed() {
                return Err(self.finish_failed().await);
            }
            if let Some(value) = self.slots.get_mut(index).and_then(Option::take) {
                return Ok(value);
            }
            if !self.join_next().await {
                return Err(TransferError::worker(format!(
                    "{}: slot {} was never filled",
                    self.id, index
                )));
            }
        }
    }

    /// Join every outstanding task and return the slot values in index order.
    pub async fn join(mut self) -> TransferResult<Vec<T>> {
        self.drain().await;
        if let Some(error) = self.failure.take() {
            return Err(error);
        }

        let id = self.id;
        self.slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    TransferError::worker(format!(
                        "{}: slot {} finished without a result",
                        id, index
                    ))
                })
            })
            .collect()
    }

    /// Join every outstanding task, discarding results.
    pub async fn drain(&mut self) {
        while self.join_next().await {}
    }

    async fn finish_failed(&mut self) -> TransferError {
        self.drain().await;
        self.failure.take().unwrap_or_else(|| {
            TransferError::worker(format!("{}: failure already reported", self.id))
        })
    }

    async fn join_next(&mut self) -> bool {
        match self.tasks.join_next().await {
            Some(joined) => {
                self.record(joined);
                true
            }
            None => false,
        }
    }

    /// Record finished tasks without waiting
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            self.record(joined);
        }
    }

    fn record(&mut self, joined: Result<(usize, TransferResult<T>), JoinError>) {
        match joined {
            Ok((index, Ok(value))) => {
                debug!(job = %self.id, slot = index, "transfer finished");
                if let Some(slot) = self.slots.get_mut(index) {
                    *slot = Some(value);
                }
            }
            Ok((index, Err(error))) => {
                debug!(job = %self.id, slot = index, "transfer failed");
                self.fail(error);
            }
            Err(join_error) => {
                self.fail(TransferError::worker(format!("task {}", join_error)));
            }
        }
    }

    fn fail(&mut self, error: TransferError) {
        if self.failure.is_none() {
            warn!(job = %self.id, error = %error, "transfer job failed");
            self.failure = Some(error);
        } else {
            warn!(job = %self.id, error = %error, "additional failure after job already failed");
        }
    }
}
