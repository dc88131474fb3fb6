//! Single-writer, multi-reader execution queue.
//!
//! A dispatcher thread takes jobs in submission order. Shared jobs go to a
//! fixed set of reader threads and may overlap each other. An exclusive job
//! waits for every pending shared job to finish and then runs on the
//! dispatcher itself, so nothing submitted after it starts until it returns.

use std::sync::mpsc::{channel, SendError, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use tracing::warn;

use crate::StoreError;

/// A job receives `Ok(())` when it is scheduled, or the reason it never will be.
type Task = Box<dyn FnOnce(Result<(), StoreError>) + Send + 'static>;

/// How a job may overlap with others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Runs concurrently with other shared jobs.
    Shared,
    /// Runs alone, after everything submitted before it.
    Exclusive,
}

struct Job {
    access: Access,
    task: Task,
}

/// Count of shared jobs in flight, with a wakeup for the dispatcher.
struct ReaderGate {
    active: Mutex<usize>,
    idle: Condvar,
}

impl ReaderGate {
    fn new() -> Self {
        ReaderGate {
            active: Mutex::new(0),
            idle: Condvar::new(),
        }
    }

    fn enter(&self) {
        if let Ok(mut active) = self.active.lock() {
            *active += 1;
        }
    }

    fn leave(&self) {
        if let Ok(mut active) = self.active.lock() {
            *active = active.saturating_sub(1);
            if *active == 0 {
                self.idle.notify_all();
            }
        }
    }

    fn wait_idle(&self) {
        let Ok(mut active) = self.active.lock() else {
            return;
        };
        while *active > 0 {
            active = match self.idle.wait(active) {
                Ok(guard) => guard,
                Err(_) => return,
            };
        }
    }
}

/// Leaves the gate when dropped, so a panicking reader never wedges writers.
struct ReaderPass(Arc<ReaderGate>);

impl Drop for ReaderPass {
    fn drop(&mut self) {
        self.0.leave();
    }
}

/// Reader threads per queue unless configured otherwise.
pub const DEFAULT_READERS: usize = 4;

type ReadJob = (Task, ReaderPass);

/// Start `count` reader threads sharing one job channel. `None` when not a
/// single thread could be started.
fn spawn_readers(label: &str, count: usize) -> Option<Sender<ReadJob>> {
    let (tx, rx) = channel::<ReadJob>();
    let rx = Arc::new(Mutex::new(rx));
    let mut started = 0;

    for n in 0..count {
        let rx = rx.clone();
        let reader = thread::Builder::new()
            .name(format!("{label}-read-{n}"))
            .spawn(move || loop {
                let next = match rx.lock() {
                    Ok(rx) => rx.recv(),
                    Err(_) => return,
                };
                let Ok((task, pass)) = next else {
                    return;
                };
                task(Ok(()));
                drop(pass);
            });
        match reader {
            Ok(_) => started += 1,
            Err(err) => warn!(queue = %label, error = %err, "failed to spawn reader thread"),
        }
    }

    (started > 0).then_some(tx)
}

/// Hand a shared job to the reader pool, or run it here when no reader is left.
fn run_shared(readers: Option<&Sender<ReadJob>>, task: Task, pass: ReaderPass) {
    let (task, _pass) = match readers {
        Some(readers) => match readers.send((task, pass)) {
            Ok(()) => return,
            Err(SendError(job)) => job,
        },
        None => (task, pass),
    };
    task(Ok(()));
}

pub struct AccessQueue {
    label: String,
    jobs: Mutex<Option<Sender<Job>>>,
}

impl AccessQueue {
    /// Start a queue with [`DEFAULT_READERS`] reader threads.
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_readers(label, DEFAULT_READERS)
    }

    /// Start a queue whose threads are named after `label`, running shared
    /// jobs on at most `readers` threads at once.
    pub fn with_readers(label: impl Into<String>, readers: usize) -> Self {
        let label = label.into();
        let (tx, rx) = channel::<Job>();
        let gate = Arc::new(ReaderGate::new());
        let readers = spawn_readers(&label, readers);

        let spawned = thread::Builder::new()
            .name(format!("{label}-dispatch"))
            .spawn(move || {
                for job in rx {
                    match job.access {
                        Access::Shared => {
                            gate.enter();
                            let pass = ReaderPass(gate.clone());
                            run_shared(readers.as_ref(), job.task, pass);
                        }
                        Access::Exclusive => {
                            gate.wait_idle();
                            (job.task)(Ok(()));
                        }
                    }
                }
            });

        let jobs = match spawned {
            Ok(_) => Some(tx),
            Err(err) => {
                warn!(queue = %label, error = %err, "failed to spawn queue dispatcher");
                None
            }
        };

        AccessQueue {
            label,
            jobs: Mutex::new(jobs),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Submit a job. A job the queue cannot accept runs immediately on the
    /// caller's thread with [`StoreError::Unavailable`].
    pub fn submit<F>(&self, access: Access, task: F)
    where
        F: FnOnce(Result<(), StoreError>) + Send + 'static,
    {
        let closed = || StoreError::Unavailable(format!("{} queue closed", self.label));
        let Ok(jobs) = self.jobs.lock() else {
            task(Err(StoreError::Unavailable(format!(
                "{} queue poisoned",
                self.label
            ))));
            return;
        };
        let Some(sender) = jobs.as_ref() else {
            drop(jobs);
            task(Err(closed()));
            return;
        };
        let sent = sender.send(Job {
            access,
            task: Box::new(task),
        });
        drop(jobs);
        if let Err(rejected) = sent {
            (rejected.0.task)(Err(closed()));
        }
    }

    pub fn shared<F>(&self, task: F)
    where
        F: FnOnce(Result<(), StoreError>) + Send + 'static,
    {
        self.submit(Access::Shared, task)
    }

    pub fn exclusive<F>(&self, task: F)
    where
        F: FnOnce(Result<(), StoreError>) + Send + 'static,
    {
        self.submit(Access::Exclusive, task)
    }

    /// Stop accepting jobs. Jobs already submitted still run.
    pub fn close(&self) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.take();
        }
    }
}

impl Drop for AccessQueue {
    fn drop(&mut self) {
        self.close();
    }
}
