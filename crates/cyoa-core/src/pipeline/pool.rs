//! Bounded worker pool with in-order delivery of results.
//!
//! Workers pull jobs from a shared queue and send `(index, result)` back over
//! a channel. The calling thread buffers early arrivals and hands results to
//! `commit` strictly in job order, so whatever `commit` does (naming files,
//! building text) is single-threaded and independent of completion order.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Mutex;

use crate::control::AbortToken;
use crate::error::CyoaError;

/// Run `work` over `jobs` on up to `workers` threads and feed each result to
/// `commit` in job order.
///
/// Stops early when `abort` trips or `commit` fails; results not yet
/// committed are dropped.
pub fn run_ordered<J, R, W, C>(
    jobs: Vec<J>,
    workers: usize,
    abort: &AbortToken,
    work: W,
    mut commit: C,
) -> Result<(), CyoaError>
where
    J: Send,
    R: Send,
    W: Fn(J) -> R + Sync,
    C: FnMut(usize, R) -> Result<(), CyoaError>,
{
    let count = jobs.len();
    if count == 0 {
        return Ok(());
    }
    let queue: Mutex<VecDeque<(usize, J)>> = Mutex::new(jobs.into_iter().enumerate().collect());
    let stop = AtomicBool::new(false);
    let num_workers = workers.clamp(1, count);

    let committed = std::thread::scope(|s| -> Result<usize, CyoaError> {
        let (tx, rx) = mpsc::channel();
        for _ in 0..num_workers {
            let tx = tx.clone();
            let (queue, stop, work) = (&queue, &stop, &work);
            s.spawn(move || loop {
                if stop.load(Ordering::Relaxed) || abort.is_aborted() {
                    break;
                }
                let next = queue.lock().map(|mut q| q.pop_front()).unwrap_or(None);
                let Some((index, job)) = next else {
                    break;
                };
                if tx.send((index, work(job))).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        let mut pending = BTreeMap::new();
        let mut next = 0usize;
        for (index, result) in rx {
            pending.insert(index, result);
            while let Some(result) = pending.remove(&next) {
                if let Err(e) = commit(next, result) {
                    stop.store(true, Ordering::Relaxed);
                    return Err(e);
                }
                next += 1;
            }
        }
        Ok(next)
    })?;

    abort.check()?;
    if committed < count {
        return Err(CyoaError::Aborted);
    }
    Ok(())
}
