//! What gets executed for each item, and the plan of a whole run.

use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use fanout_core::{AgentConfig, AgentKind};
use tokio::process::Command;

use crate::sink::{SinkAllocator, SinkPaths};

/// A concrete command ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// A command line run through `sh -c`.
    Shell(String),
    /// An argv executed directly, without a shell.
    Program { program: String, args: Vec<String> },
}

impl Invocation {
    /// Argv for an agent: program, fixed flags, extra args, then the prompt.
    pub fn agent(agent: AgentKind, agents: &AgentConfig, prompt: String) -> Self {
        let mut args: Vec<String> = agent.fixed_flags().iter().map(|f| f.to_string()).collect();
        args.extend(agents.extra_args_for(agent));
        if let Some(flag) = agent.prompt_flag() {
            args.push(flag.to_string());
        }
        args.push(prompt);
        Invocation::Program {
            program: agent.program().to_string(),
            args,
        }
    }

    /// Build the process command: no stdin, both output streams piped.
    pub(crate) fn command(&self) -> Command {
        let mut cmd = match self {
            Invocation::Shell(line) => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(line);
                cmd
            }
            Invocation::Program { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Shell(line) => write!(f, "sh -c {line}"),
            Invocation::Program { program, args } => {
                write!(f, "{program}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
        }
    }
}

/// One item's invocation inside a run.
#[derive(Debug, Clone)]
pub struct InvocationSpec {
    /// Position of the item in the caller's list.
    pub index: usize,
    pub item: String,
    pub invocation: Invocation,
    pub sinks: SinkPaths,
    pub deadline: Option<Duration>,
}

/// Identity and work of one run.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: String,
    /// Owns the run directory every spec's sinks live in.
    pub sinks: SinkAllocator,
    /// `shell` or `agent:<name>`.
    pub mode: String,
    pub specs: Vec<InvocationSpec>,
}

impl RunContext {
    pub fn run_dir(&self) -> &Path {
        self.sinks.run_dir()
    }
}
