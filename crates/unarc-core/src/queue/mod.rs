//! Bounded job queue serviced by persistent worker threads.

pub mod job;

use std::sync::Mutex;
use std::thread::JoinHandle;

use crate::ExtractError;
use crate::Result;
use crate::processor;

pub use job::Job;
pub use job::Notifier;
pub use job::Response;

/// A stopped-or-running extraction queue.
///
/// Jobs are delivered FIFO to whichever worker frees up first; there is
/// no priority, no preemption, and no per-job timeout. Callers that want
/// to abandon work stop submitting and call [`Queue::stop`], which still
/// lets in-flight jobs finish naturally.
#[derive(Debug, Default)]
pub struct Queue {
    state: Mutex<Option<Running>>,
}

#[derive(Debug)]
struct Running {
    tx: crossbeam_channel::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl Queue {
    /// Creates a queue in the stopped state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `workers` persistent worker threads over a job channel
    /// holding at most `buffer` pending jobs.
    ///
    /// # Errors
    ///
    /// [`ExtractError::QueueRunning`] if the queue is already running.
    pub fn start(&self, workers: usize, buffer: usize) -> Result<()> {
        let mut state = lock(&self.state);
        if state.is_some() {
            return Err(ExtractError::QueueRunning);
        }

        let workers = workers.max(1);
        let (tx, rx) = crossbeam_channel::bounded::<Job>(buffer.max(1));
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let rx = rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("unarc-worker-{id}"))
                .spawn(move || {
                    while let Ok(extract_job) = rx.recv() {
                        processor::run(extract_job, rx.len());
                    }
                })?;
            handles.push(handle);
        }

        tracing::debug!(workers, buffer, "extraction queue started");
        *state = Some(Running {
            tx,
            workers: handles,
        });
        Ok(())
    }

    /// Submits one job and returns the number of jobs still waiting in
    /// the channel behind it.
    ///
    /// Blocks when the channel buffer is full. The state lock is released
    /// before the send, so a blocked submitter never wedges [`stop`],
    /// [`is_running`], or other submitters.
    ///
    /// [`stop`]: Queue::stop
    /// [`is_running`]: Queue::is_running
    ///
    /// # Errors
    ///
    /// [`ExtractError::QueueStopped`] if the queue is not running.
    pub fn submit(&self, extract_job: Job) -> Result<usize> {
        let tx = {
            let state = lock(&self.state);
            let running = state.as_ref().ok_or(ExtractError::QueueStopped)?;
            running.tx.clone()
        };
        tx.send(extract_job)
            .map_err(|_| ExtractError::QueueStopped)?;
        Ok(tx.len())
    }

    /// Stops the queue: closes the submission channel, then blocks until
    /// every worker has finished its current job and exited.
    ///
    /// # Errors
    ///
    /// [`ExtractError::QueueStopped`] if the queue was not running.
    pub fn stop(&self) -> Result<()> {
        let running = lock(&self.state)
            .take()
            .ok_or(ExtractError::QueueStopped)?;

        // Dropping the sender lets each worker drain remaining jobs and
        // fall out of its receive loop.
        drop(running.tx);
        for handle in running.workers {
            if handle.join().is_err() {
                tracing::error!("extraction worker panicked");
            }
        }
        tracing::debug!("extraction queue stopped");
        Ok(())
    }

    /// True while workers are running.
    pub fn is_running(&self) -> bool {
        lock(&self.state).is_some()
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Lock that survives a poisoned mutex. A worker panic must not wedge
/// the queue's control surface.
fn lock(state: &Mutex<Option<Running>>) -> std::sync::MutexGuard<'_, Option<Running>> {
    state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
