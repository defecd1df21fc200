//! Scoped Timer Tasks
//!
//! A [`ScopedTask`] owns a spawned tokio task together with a [`Gate`]. The
//! task performs its side effects through [`Gate::run`]; stopping the task
//! closes the gate under its lock before aborting, so once `stop()` returns
//! no further side effect can happen, even if the task was in the middle of
//! an await.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;

/// Open/closed switch guarding a task's side effects
#[derive(Debug)]
pub struct Gate {
    open: Mutex<bool>,
}

impl Gate {
    fn new() -> Self {
        Self {
            open: Mutex::new(true),
        }
    }

    /// Run `effect` while holding the gate, unless it is closed
    pub fn run<R>(&self, effect: impl FnOnce() -> R) -> Option<R> {
        let open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if *open { Some(effect()) } else { None }
    }

    /// Close the gate. Blocks until an effect in progress completes.
    ///
    /// This is a `std::sync::Mutex`, so calling it from async code can hold
    /// a runtime worker for as long as that effect runs. Effects must stay
    /// short and synchronous: a state update and a channel send, never an
    /// await or I/O.
    pub fn close(&self) {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Spawned task that is stopped when its handle is dropped
#[derive(Debug)]
pub struct ScopedTask {
    gate: Arc<Gate>,
    handle: Option<JoinHandle<()>>,
}

impl ScopedTask {
    /// Spawn `body` on the current runtime
    pub fn spawn<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Arc<Gate>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let gate = Arc::new(Gate::new());
        let fut = body(gate.clone());
        Self {
            gate,
            handle: Some(tokio::spawn(fut)),
        }
    }

    /// Close the gate and abort the task. Idempotent.
    pub fn stop(&mut self) {
        self.gate.close();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether the task may still produce effects
    pub fn is_running(&self) -> bool {
        self.gate.is_open() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ScopedTask {
    fn drop(&mut self) {
        self.stop();
    }
}
