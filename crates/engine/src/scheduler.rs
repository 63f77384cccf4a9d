//! Group-by-group execution with bounded concurrency.
//!
//! Invocations are cut into contiguous groups of at most `width` members.
//! A group starts all of its members at once and is finished only when every
//! member is terminal; the next group starts after that. Peak concurrency is
//! therefore exactly `width`, at the cost of idle slots while a group's
//! slowest member finishes.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info};

use crate::invocation::InvocationSpec;
use crate::runner::{Executor, InvocationOutcome};

/// Index ranges of the groups for `len` items at `width`.
///
/// Yields `ceil(len / width)` ranges; group `i` holds
/// `min(width, len - i * width)` items.
pub fn partition(len: usize, width: NonZeroUsize) -> Vec<Range<usize>> {
    let width = width.get();
    (0..len)
        .step_by(width)
        .map(|start| start..(start + width).min(len))
        .collect()
}

/// What the scheduler observed while draining a run.
#[derive(Debug, Clone)]
pub struct ScheduleReport {
    pub group_count: usize,
    /// One outcome per invocation, in input order.
    pub outcomes: Vec<InvocationOutcome>,
}

impl ScheduleReport {
    /// Number of invocations per terminal status.
    pub fn status_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &self.outcomes {
            *counts.entry(outcome.status()).or_insert(0) += 1;
        }
        counts
    }
}

/// Drives invocations through an [`Executor`] one group at a time.
pub struct BatchScheduler {
    executor: Arc<dyn Executor>,
    width: NonZeroUsize,
}

impl BatchScheduler {
    pub fn new(executor: Arc<dyn Executor>, width: NonZeroUsize) -> Self {
        Self { executor, width }
    }

    pub fn width(&self) -> NonZeroUsize {
        self.width
    }

    pub async fn run(&self, specs: &[InvocationSpec]) -> ScheduleReport {
        let groups = partition(specs.len(), self.width);
        let group_count = groups.len();
        let mut outcomes = Vec::with_capacity(specs.len());

        for (group_index, range) in groups.into_iter().enumerate() {
            let group = &specs[range];
            let started = Instant::now();
            debug!(group = group_index, size = group.len(), "starting group");

            // Barrier over the whole group: join, not select.
            let group_outcomes = join_all(group.iter().map(|spec| self.executor.execute(spec))).await;

            info!(
                group = group_index + 1,
                of = group_count,
                size = group.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "group complete"
            );
            outcomes.extend(group_outcomes);
        }

        ScheduleReport { group_count, outcomes }
    }
}
