use super::constants::THREAD_NAME_PREFIX;

use crossbeam_channel::Sender;
use std::{io, thread};

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PoolName {
    Scheduler,
    Worker,
}

impl PoolName {
    pub(crate) fn thread_name(&self, id: &str, n: usize) -> String {
        match self {
            PoolName::Scheduler => format!("{THREAD_NAME_PREFIX}-scheduler-{id}"),
            PoolName::Worker => format!("{THREAD_NAME_PREFIX}-worker-{id}-{n}"),
        }
    }
}

/// Spawns a detached thread named after the pool.
pub(crate) fn spawn<F>(name: PoolName, id: &str, n: usize, f: F) -> io::Result<()>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.thread_name(id, n))
        .spawn(f)
        .map(|_handle| ())
}

/// A dedicated thread running one job at a time.
///
/// At most one job waits while another is running. Dropping the worker lets
/// the thread finish the job it is running and the one queued, then exit.
/// Dropping never blocks on the thread.
pub(crate) struct Worker {
    sender: Sender<Job>,
}

impl Worker {
    pub(crate) fn new(id: &str, n: usize) -> io::Result<Self> {
        let (sender, receiver) = crossbeam_channel::bounded::<Job>(1);
        spawn(PoolName::Worker, id, n, move || {
            // Ends when the sender is gone.
            for job in receiver.iter() {
                job();
            }
        })?;
        Ok(Self { sender })
    }

    /// A worker whose thread is gone.
    #[cfg(test)]
    pub(crate) fn gone() -> Self {
        let (sender, _) = crossbeam_channel::bounded::<Job>(1);
        Self { sender }
    }

    /// Hands a job to the worker without blocking. Returns the job back if
    /// the thread is gone or already has a job waiting.
    pub(crate) fn execute(&self, job: Job) -> Result<(), Job> {
        self.sender.try_send(job).map_err(|e| e.into_inner())
    }
}
