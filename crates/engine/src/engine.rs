//! The engine facade behind `run_shell` and `run_agent`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use fanout_core::{AgentConfig, AgentKind, EngineConfig};

use crate::error::EngineError;
use crate::invocation::{Invocation, InvocationSpec, RunContext};
use crate::report::RunSummary;
use crate::runner::{Executor, ProcessRunner};
use crate::scheduler::BatchScheduler;
use crate::sink::SinkAllocator;
use crate::template::{expand, ExpansionMode};

/// Entry point for fan-out runs.
///
/// Each call to [`Engine::run_shell`] or [`Engine::run_agent`] is one run:
/// a fresh run id and directory, one invocation per item, groups of
/// `concurrency` driven to completion, and a [`RunSummary`] at the end.
pub struct Engine {
    config: EngineConfig,
    agents: AgentConfig,
    executor: Arc<dyn Executor>,
}

impl Engine {
    /// Engine that runs real processes in `working_directory`.
    pub fn new(config: EngineConfig, agents: AgentConfig, working_directory: PathBuf) -> Self {
        let runner = ProcessRunner::new(working_directory).with_kill_grace(config.kill_grace);
        Self::with_executor(config, agents, Arc::new(runner))
    }

    pub fn with_executor(config: EngineConfig, agents: AgentConfig, executor: Arc<dyn Executor>) -> Self {
        Self {
            config,
            agents,
            executor,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Agents `run_agent` accepts.
    pub fn enabled_agents(&self) -> &[AgentKind] {
        &self.agents.enabled
    }

    /// Run `command_template` through the shell once per item.
    pub async fn run_shell(&self, items: &[String], command_template: &str) -> Result<RunSummary, EngineError> {
        let ctx = self.plan("shell".to_string(), items, self.config.shell_timeout, |item| {
            Invocation::Shell(expand(command_template, item, ExpansionMode::Shell))
        });
        self.execute(ctx).await
    }

    /// Run `agent` once per item with the item substituted into `prompt_template`.
    pub async fn run_agent(
        &self,
        items: &[String],
        prompt_template: &str,
        agent: AgentKind,
    ) -> Result<RunSummary, EngineError> {
        if !self.agents.is_enabled(agent) {
            return Err(EngineError::AgentDisabled(agent));
        }
        let ctx = self.plan(format!("agent:{agent}"), items, self.config.agent_timeout, |item| {
            let prompt = expand(prompt_template, item, ExpansionMode::Prompt);
            Invocation::agent(agent, &self.agents, prompt)
        });
        self.execute(ctx).await
    }

    fn plan<F>(&self, mode: String, items: &[String], deadline: Option<Duration>, build: F) -> RunContext
    where
        F: Fn(&str) -> Invocation,
    {
        let run_id = Uuid::new_v4().to_string();
        let sinks = SinkAllocator::new(&self.config.results_dir, &run_id);
        let specs = items
            .iter()
            .enumerate()
            .map(|(index, item)| InvocationSpec {
                index,
                item: item.clone(),
                invocation: build(item),
                sinks: sinks.paths_for(item),
                deadline,
            })
            .collect();
        RunContext {
            run_id,
            sinks,
            mode,
            specs,
        }
    }

    async fn execute(&self, ctx: RunContext) -> Result<RunSummary, EngineError> {
        ctx.sinks.prepare().await.map_err(|source| EngineError::RunDir {
            path: ctx.run_dir().to_path_buf(),
            source,
        })?;

        let started_at = Utc::now();
        let clock = Instant::now();
        info!(
            run_id = %ctx.run_id,
            mode = %ctx.mode,
            items = ctx.specs.len(),
            concurrency = self.config.concurrency.get(),
            run_dir = %ctx.run_dir().display(),
            "run started"
        );

        let scheduler = BatchScheduler::new(self.executor.clone(), self.config.concurrency);
        let schedule = scheduler.run(&ctx.specs).await;

        let summary = RunSummary::collect(
            &ctx,
            &schedule,
            scheduler.width().get(),
            started_at,
            clock.elapsed(),
        );
        info!(
            run_id = %summary.run_id,
            invocations = summary.total_invocations,
            groups = summary.group_count,
            outcomes = ?schedule.status_counts(),
            elapsed_ms = summary.elapsed_ms,
            "run finished"
        );
        Ok(summary)
    }
}
