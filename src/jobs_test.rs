use super::*;

fn poll_until<T: 'static>(jobs: &JobSystem, id: JobId) -> Option<T> {
  for _ in 0..5000 {
    if let Some(result) = jobs.poll::<T>(id) {
      return Some(result);
    }
    std::thread::sleep(std::time::Duration::from_millis(1));
  }
  None
}

#[test]
fn submit_and_poll() {
  let jobs = JobSystem::new();
  let id = jobs.submit(1, || 42i32);

  assert_eq!(poll_until::<i32>(&jobs, id), Some(42));
  // results are consumed exactly once
  assert_eq!(jobs.poll::<i32>(id), None);
  assert!(!jobs.is_pending(id));
}

#[test]
fn timed_poll_reports_duration() {
  let jobs = JobSystem::new();
  let id = jobs.submit(1, || {
    std::thread::sleep(std::time::Duration::from_millis(5));
    "done"
  });

  let mut timed = None;
  for _ in 0..5000 {
    if let Some(result) = jobs.poll_timed::<&str>(id) {
      timed = Some(result);
      break;
    }
    std::thread::sleep(std::time::Duration::from_millis(1));
  }

  let (result, elapsed_us) = timed.expect("job completed");
  assert_eq!(result, "done");
  assert!(elapsed_us >= 5_000, "elapsed {elapsed_us}us below sleep time");
}

#[test]
fn poll_with_wrong_type_returns_none() {
  let jobs = JobSystem::new();
  let id = jobs.submit(1, || "text");

  // wait for completion, then mis-typed poll consumes nothing useful
  while jobs.is_pending(id) {
    std::thread::sleep(std::time::Duration::from_millis(1));
  }
  assert!(jobs.poll::<i32>(id).is_none());
}

#[test]
fn many_jobs_complete() {
  let jobs = JobSystem::new();
  let ids: Vec<_> = (0..32).map(|i| jobs.submit(1, move || i * 2)).collect();

  for (i, id) in ids.into_iter().enumerate() {
    assert_eq!(poll_until::<usize>(&jobs, id), Some(i * 2));
  }
  assert_eq!(jobs.pending_count(), 0);
}

/// Queue order: lowest priority value first, submission order as tiebreak.
#[test]
fn queue_pops_urgent_jobs_first() {
  let mut heap = BinaryHeap::new();
  for (priority, sequence) in [(5u32, 0u64), (1, 1), (5, 2), (0, 3), (1, 4)] {
    heap.push(PendingJob {
      priority,
      sequence,
      run: Box::new(|| {}),
    });
  }

  let popped: Vec<_> =
    std::iter::from_fn(|| heap.pop().map(|job| (job.priority, job.sequence))).collect();
  assert_eq!(popped, vec![(0, 3), (1, 1), (1, 4), (5, 0), (5, 2)]);
}

/// Cloned handles share the same queue and results.
#[test]
fn clones_share_state() {
  let jobs = JobSystem::new();
  let clone = jobs.clone();

  let id = clone.submit(1, || 7u64);
  assert_eq!(poll_until::<u64>(&jobs, id), Some(7));
}
