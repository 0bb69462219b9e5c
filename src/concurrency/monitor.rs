//! Termination detection for a running pool.
//!
//! The orchestrating thread polls the excess of source and sink. The source
//! only ever receives flow after saturation and the sink never sends any, so
//! `|excess(source)|` shrinks and `excess(sink)` grows monotonically. Reading
//! the source first therefore makes `|source| == sink` a sound completion
//! test even though the two reads are not atomic together: equality at the
//! second read implies every other node holds zero excess.

use std::thread::ScopedJoinHandle;
use std::time::{Duration, Instant};

use crossbeam_utils::Backoff;

use super::worker::Pool;
use crate::{
    error::{FlowError, Result},
    graph::Graph,
};

/// Busy-polls until the flow is complete, returning the number of polls.
///
/// Fails with [`FlowError::WorkerExited`] if any worker thread finishes before
/// completion: workers only return after cancellation, so an early exit is a
/// defect and the flow value can no longer be trusted.
pub(crate) fn await_completion<T>(
    graph: &Graph,
    pool: &Pool,
    handles: &[ScopedJoinHandle<'_, T>],
    source: usize,
    sink: usize,
    report_interval: Duration,
) -> Result<u64> {
    let backoff = Backoff::new();
    let mut polls = 0u64;
    let mut last_report = Instant::now();

    loop {
        polls += 1;
        let source_excess = graph.excess(source)?;
        let sink_excess = graph.excess(sink)?;
        if source_excess.abs() == sink_excess {
            tracing::debug!(polls, flow = sink_excess, "flow complete");
            return Ok(polls);
        }

        if let Some(worker) = handles.iter().position(ScopedJoinHandle::is_finished) {
            tracing::warn!(worker, source_excess, sink_excess, "worker exited before completion");
            return Err(FlowError::WorkerExited { worker });
        }

        if last_report.elapsed() >= report_interval {
            tracing::trace!(
                source_excess,
                sink_excess,
                queues = ?pool.queue_lengths(),
                "waiting for completion"
            );
            last_report = Instant::now();
        }

        backoff.snooze();
    }
}
