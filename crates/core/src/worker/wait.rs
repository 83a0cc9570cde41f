use std::future::Future;

use futures_util::FutureExt;
use tokio::task::JoinHandle;

use crate::Error;

/// Background work spawned while handling an event.
///
/// The host either awaits it with [`WaitUntil::settle`] or keeps it around;
/// dropping it detaches the tasks without waiting for them.
#[derive(Debug, Default)]
#[must_use = "background work should be settled or tracked by the host"]
pub struct WaitUntil {
    tasks: Vec<(&'static str, JoinHandle<Result<(), Error>>)>,
}

impl WaitUntil {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work` and keep it until settled.
    pub fn spawn<F>(&mut self, label: &'static str, work: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.tasks.push((label, tokio::spawn(work)));
    }

    /// Keep a task that was already spawned elsewhere.
    pub fn push(&mut self, label: &'static str, handle: JoinHandle<Result<(), Error>>) {
        self.tasks.push((label, handle));
    }

    pub fn extend(&mut self, other: WaitUntil) {
        self.tasks.extend(other.tasks);
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|(label, _)| *label).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// True when no task is still running.
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|(_, task)| task.is_finished())
    }

    /// Drop tasks that have already finished, logging any failure, and
    /// return how many were removed. Running tasks are kept.
    pub fn reap(&mut self) -> usize {
        let before = self.tasks.len();

        self.tasks.retain_mut(|(label, task)| {
            if !task.is_finished() {
                return true;
            }
            match task.now_or_never() {
                Some(Ok(Ok(()))) => {}
                Some(Ok(Err(err))) => tracing::warn!(task = *label, error = %err, "background task failed"),
                Some(Err(err)) => tracing::warn!(task = *label, error = %err, "background task panicked"),
                None => return true,
            }
            false
        });

        before - self.tasks.len()
    }

    /// Wait for every task. All tasks run to completion; the first failure is
    /// returned.
    pub async fn settle(self) -> Result<(), Error> {
        let mut first = None;

        for (label, task) in self.tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(Error::Task(format!("{label}: {e}"))),
            };

            if let Err(err) = result {
                tracing::warn!(task = label, error = %err, "background task failed");
                first.get_or_insert(err);
            }
        }

        first.map_or(Ok(()), Err)
    }
}
