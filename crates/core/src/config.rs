use std::collections::BTreeMap;
use std::env;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::AgentKind;
use crate::error::ConfigError;

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_KILL_GRACE_SECS: u64 = 5;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Key/value source the config is read from. The process environment in
/// production, a map in tests.
struct Source<F: Fn(&str) -> Option<String>> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Source<F> {
    fn opt(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn u64_or(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        match self.opt(key) {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::invalid(key, &v, "expected a non-negative integer")),
            None => Ok(default),
        }
    }

    /// Seconds; `0` means "no deadline".
    fn secs_opt(&self, key: &str, default: u64) -> Result<Option<Duration>, ConfigError> {
        let secs = self.u64_or(key, default)?;
        Ok((secs > 0).then(|| Duration::from_secs(secs)))
    }

    fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.opt(key) {
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::invalid(key, &v, "expected true/false")),
            },
            None => Ok(default),
        }
    }

    fn args(&self, key: &str) -> Vec<String> {
        self.opt(key)
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Parse a batch width. Zero and non-integers are rejected here so a run can
/// never start with an unusable width.
pub fn parse_concurrency(key: &str, value: &str) -> Result<NonZeroUsize, ConfigError> {
    let n: usize = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, value, "expected a positive integer"))?;
    NonZeroUsize::new(n).ok_or_else(|| ConfigError::invalid(key, value, "must be at least 1"))
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub agents: AgentConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_opt)
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let src = Source { lookup };
        Ok(Self {
            server: ServerConfig::from_source(&src),
            engine: EngineConfig::from_source(&src)?,
            agents: AgentConfig::from_source(&src)?,
        })
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  server:  name={}", self.server.name);
        tracing::info!(
            "  engine:  results_dir={}, concurrency={}, shell_timeout={:?}, agent_timeout={:?}, kill_grace={:?}",
            self.engine.results_dir.display(),
            self.engine.concurrency,
            self.engine.shell_timeout,
            self.engine.agent_timeout,
            self.engine.kill_grace,
        );
        let enabled: Vec<&str> = self.agents.enabled.iter().map(|a| a.name()).collect();
        tracing::info!(
            "  agents:  enabled=[{}], global_extra_args={:?}",
            enabled.join(", "),
            self.agents.global_extra_args,
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
}

impl ServerConfig {
    fn from_source<F: Fn(&str) -> Option<String>>(src: &Source<F>) -> Self {
        Self {
            name: src.or("FANOUT_SERVER_NAME", "fanout-mcp"),
        }
    }
}

// ── Engine ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root under which one directory per run is created.
    pub results_dir: PathBuf,
    /// Batch width: the number of processes a group runs at once.
    pub concurrency: NonZeroUsize,
    /// Per-item deadline for shell runs.
    pub shell_timeout: Option<Duration>,
    /// Per-item deadline for agent runs.
    pub agent_timeout: Option<Duration>,
    /// Time between SIGTERM and SIGKILL once a deadline fires.
    pub kill_grace: Duration,
}

impl EngineConfig {
    fn from_source<F: Fn(&str) -> Option<String>>(src: &Source<F>) -> Result<Self, ConfigError> {
        let results_dir = src
            .opt("FANOUT_RESULTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("fanout-results"));
        let concurrency = match src.opt("FANOUT_CONCURRENCY") {
            Some(v) => parse_concurrency("FANOUT_CONCURRENCY", &v)?,
            None => NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN),
        };
        Ok(Self {
            results_dir,
            concurrency,
            shell_timeout: src.secs_opt("FANOUT_SHELL_TIMEOUT_SECS", 0)?,
            agent_timeout: src.secs_opt("FANOUT_AGENT_TIMEOUT_SECS", DEFAULT_AGENT_TIMEOUT_SECS)?,
            kill_grace: Duration::from_secs(
                src.u64_or("FANOUT_KILL_GRACE_SECS", DEFAULT_KILL_GRACE_SECS)?,
            ),
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            results_dir: env::temp_dir().join("fanout-results"),
            concurrency: NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN),
            shell_timeout: None,
            agent_timeout: Some(Duration::from_secs(DEFAULT_AGENT_TIMEOUT_SECS)),
            kill_grace: Duration::from_secs(DEFAULT_KILL_GRACE_SECS),
        }
    }
}

// ── Agents ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agents selectable by `run_agent`, in declaration order.
    pub enabled: Vec<AgentKind>,
    /// Appended to every agent invocation.
    pub global_extra_args: Vec<String>,
    /// Appended after the global args for one agent.
    pub extra_args: BTreeMap<AgentKind, Vec<String>>,
}

impl AgentConfig {
    fn from_source<F: Fn(&str) -> Option<String>>(src: &Source<F>) -> Result<Self, ConfigError> {
        let mut enabled = Vec::new();
        let mut extra_args = BTreeMap::new();
        for agent in AgentKind::ALL {
            let token = agent.env_token();
            if src.bool_or(&format!("FANOUT_{token}_ENABLED"), true)? {
                enabled.push(agent);
            }
            let args = src.args(&format!("FANOUT_{token}_EXTRA_ARGS"));
            if !args.is_empty() {
                extra_args.insert(agent, args);
            }
        }
        Ok(Self {
            enabled,
            global_extra_args: src.args("FANOUT_AGENT_EXTRA_ARGS"),
            extra_args,
        })
    }

    /// Every agent enabled, no extra args.
    pub fn all_enabled() -> Self {
        Self {
            enabled: AgentKind::ALL.to_vec(),
            ..Self::default()
        }
    }

    pub fn is_enabled(&self, agent: AgentKind) -> bool {
        self.enabled.contains(&agent)
    }

    /// Global extra args followed by the agent's own.
    pub fn extra_args_for(&self, agent: AgentKind) -> Vec<String> {
        let mut args = self.global_extra_args.clone();
        if let Some(own) = self.extra_args.get(&agent) {
            args.extend(own.iter().cloned());
        }
        args
    }
}
