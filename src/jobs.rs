//! Background job system: submit prioritized work, poll completion by id.
//!
//! Work runs on rayon's thread pool via `rayon::spawn`. Submissions land in
//! a shared priority queue and each spawned runner executes the most urgent
//! pending job, so low-priority work queued first cannot starve urgent work
//! queued later. Results are type-erased and reclaimed exactly once by
//! [`JobSystem::poll`].
//!
//! The control loop never blocks on a job: completion is observed, not
//! awaited.
//!
//! ```ignore
//! let jobs = JobSystem::new();
//! let id = jobs.submit(1, move || expensive_generation());
//!
//! // each frame:
//! if let Some(result) = jobs.poll::<GeneratedVoxels>(id) {
//!     // consume result
//! }
//! ```

use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use web_time::Instant;

/// Unique identifier for a submitted job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JobId(u64);

impl JobId {
  fn next() -> Self {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    Self(COUNTER.fetch_add(1, Ordering::Relaxed))
  }
}

/// A queued unit of work. Lower `priority` values run first; equal
/// priorities run in submission order.
struct PendingJob {
  priority: u32,
  sequence: u64,
  run: Box<dyn FnOnce() + Send>,
}

impl PartialEq for PendingJob {
  fn eq(&self, other: &Self) -> bool {
    self.priority == other.priority && self.sequence == other.sequence
  }
}

impl Eq for PendingJob {}

impl PartialOrd for PendingJob {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for PendingJob {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    // BinaryHeap is a max-heap: invert so the smallest (priority, sequence)
    // pair is popped first
    other
      .priority
      .cmp(&self.priority)
      .then(other.sequence.cmp(&self.sequence))
  }
}

/// Type-erased result container.
struct JobResult {
  data: Box<dyn std::any::Any + Send>,
  /// Raw execution time in microseconds.
  elapsed_us: u64,
}

#[derive(Default)]
struct Shared {
  queue: Mutex<BinaryHeap<PendingJob>>,
  results: Mutex<HashMap<JobId, JobResult>>,
  pending: Mutex<HashSet<JobId>>,
  sequence: AtomicU64,
}

/// Prioritized fire-and-forget executor over rayon's thread pool.
pub struct JobSystem {
  shared: Arc<Shared>,
}

impl JobSystem {
  pub fn new() -> Self {
    Self {
      shared: Arc::new(Shared::default()),
    }
  }

  /// Submit work (non-blocking). Lower `priority` values run first.
  ///
  /// Returns a [`JobId`] to poll for the result.
  pub fn submit<F, T>(&self, priority: u32, work: F) -> JobId
  where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
  {
    let job_id = JobId::next();
    let sequence = self.shared.sequence.fetch_add(1, Ordering::Relaxed);

    self.shared.pending.lock().unwrap().insert(job_id);

    let shared = Arc::clone(&self.shared);
    let run = Box::new(move || {
      let start = Instant::now();
      let result = work();
      let elapsed_us = start.elapsed().as_micros() as u64;

      shared.results.lock().unwrap().insert(
        job_id,
        JobResult {
          data: Box::new(result),
          elapsed_us,
        },
      );
      shared.pending.lock().unwrap().remove(&job_id);
    });

    self.shared.queue.lock().unwrap().push(PendingJob {
      priority,
      sequence,
      run,
    });

    // one runner per submission; each runner drains the most urgent job
    let shared = Arc::clone(&self.shared);
    rayon::spawn(move || {
      let job = shared.queue.lock().unwrap().pop();
      if let Some(job) = job {
        (job.run)();
      }
    });

    job_id
  }

  /// Poll for a job's result (non-blocking, consumes the result).
  ///
  /// Returns `None` while the job is still running, and for unknown or
  /// already-consumed ids.
  pub fn poll<T: 'static>(&self, job_id: JobId) -> Option<T> {
    self.poll_timed(job_id).map(|(result, _)| result)
  }

  /// Like [`Self::poll`], but also reports the job's execution time in
  /// microseconds.
  pub fn poll_timed<T: 'static>(&self, job_id: JobId) -> Option<(T, u64)> {
    let mut results = self.shared.results.lock().unwrap();
    let result = results.remove(&job_id)?;
    result
      .data
      .downcast::<T>()
      .ok()
      .map(|data| (*data, result.elapsed_us))
  }

  /// True while the job is queued or running.
  pub fn is_pending(&self, job_id: JobId) -> bool {
    self.shared.pending.lock().unwrap().contains(&job_id)
  }

  /// Number of jobs queued or running.
  pub fn pending_count(&self) -> usize {
    self.shared.pending.lock().unwrap().len()
  }
}

impl Default for JobSystem {
  fn default() -> Self {
    Self::new()
  }
}

impl Clone for JobSystem {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

#[cfg(test)]
#[path = "jobs_test.rs"]
mod jobs_test;
