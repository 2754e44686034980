use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::error::{Result, TensorError};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// An in-order work queue executed by a dedicated host thread.
///
/// `enqueue` returns as soon as the job is queued; `synchronize` blocks until
/// every job queued before it has run. This mirrors the semantics of an
/// accelerator stream.
#[derive(Debug)]
pub struct HostStream {
    name: String,
    sender: Option<mpsc::Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl HostStream {
    /// Spawn the worker thread backing a new stream.
    pub fn new(name: &str) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for job in receiver {
                    job();
                }
            })
            .map_err(|e| TensorError::Device(format!("failed to spawn stream worker: {e}")))?;
        debug!(stream = name, "host stream started");
        Ok(HostStream {
            name: name.to_string(),
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue `job` behind all previously enqueued work.
    pub fn enqueue<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .as_ref()
            .ok_or_else(|| self.terminated())?
            .send(Box::new(job))
            .map_err(|_| self.terminated())
    }

    /// Block until all previously enqueued jobs have completed.
    pub fn synchronize(&self) -> Result<()> {
        let (done_tx, done_rx) = mpsc::sync_channel(1);
        self.enqueue(move || {
            let _ = done_tx.send(());
        })?;
        done_rx.recv().map_err(|_| self.terminated())
    }

    fn terminated(&self) -> TensorError {
        TensorError::Device(format!("host stream '{}' worker terminated", self.name))
    }
}

impl Drop for HostStream {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain the queue and exit.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
