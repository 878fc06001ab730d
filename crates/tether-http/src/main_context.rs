//! A single-threaded completion queue.
//!
//! Requests run wherever the runtime schedules them; their completions are
//! posted here and executed, in order, by whoever drives the context.

use tokio::sync::mpsc;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// The receiving end of the queue. Not `Clone`: exactly one owner runs jobs.
pub struct MainContext {
  rx: mpsc::UnboundedReceiver<Job>,
}

/// Posts jobs onto a [`MainContext`].
///
/// Cheap to clone. The context's [`run`](MainContext::run) loop ends once
/// every handle has been dropped.
#[derive(Clone)]
pub struct MainHandle {
  tx: mpsc::UnboundedSender<Job>,
}

impl MainContext {
  #[allow(clippy::new_ret_no_self)]
  pub fn new() -> (MainContext, MainHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MainContext { rx }, MainHandle { tx })
  }

  /// Execute jobs in FIFO order on the calling task until every
  /// [`MainHandle`] is gone and the queue is empty.
  pub async fn run(mut self) {
    while let Some(job) = self.rx.recv().await {
      job();
    }
  }

  /// Execute the jobs that are already queued without waiting for more.
  /// Returns how many ran.
  ///
  /// For callers that own their own event loop and drain the context once
  /// per iteration.
  pub fn run_pending(&mut self) -> usize {
    let mut ran = 0;
    while let Ok(job) = self.rx.try_recv() {
      job();
      ran += 1;
    }
    ran
  }
}

impl MainHandle {
  /// Queue `job`. Returns `false`, dropping the job, if the context is gone.
  pub fn post(&self, job: impl FnOnce() + Send + 'static) -> bool {
    self.tx.send(Box::new(job)).is_ok()
  }
}
