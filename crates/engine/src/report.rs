//! Run summaries handed back to tool callers.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::invocation::RunContext;
use crate::scheduler::ScheduleReport;
use crate::sink::SinkPaths;

/// Where one item's output went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSinks {
    pub item: String,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

/// Final report of a run, returned to the caller.
///
/// Lists sink locations only; reading and judging the output is up to the
/// caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub mode: String,
    pub total_invocations: usize,
    pub group_count: usize,
    pub concurrency: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub items: Vec<ItemSinks>,
}

impl RunSummary {
    /// Build the summary in the caller's item order.
    pub fn collect(
        ctx: &RunContext,
        schedule: &ScheduleReport,
        concurrency: usize,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let items = ctx
            .specs
            .iter()
            .map(|spec| {
                let SinkPaths { stdout, stderr } = spec.sinks.clone();
                ItemSinks {
                    item: spec.item.clone(),
                    stdout,
                    stderr,
                }
            })
            .collect();

        Self {
            run_id: ctx.run_id.clone(),
            run_dir: ctx.run_dir().to_path_buf(),
            mode: ctx.mode.clone(),
            total_invocations: ctx.specs.len(),
            group_count: schedule.group_count,
            concurrency,
            started_at,
            elapsed_ms: elapsed.as_millis() as u64,
            items,
        }
    }

    /// Text form for tool results: a header line followed by pretty JSON.
    pub fn render(&self) -> String {
        let header = format!(
            "Run {} finished: {} invocation(s) in {} group(s) of up to {} ({} ms). Output in {}",
            self.run_id,
            self.total_invocations,
            self.group_count,
            self.concurrency,
            self.elapsed_ms,
            self.run_dir.display(),
        );
        match serde_json::to_string_pretty(self) {
            Ok(json) => format!("{header}\n\n{json}"),
            Err(_) => header,
        }
    }
}
