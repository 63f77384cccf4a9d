use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The agent CLIs a fan-out run can drive.
///
/// Each variant knows its executable, the flags that put it into a
/// non-interactive, auto-approving mode, and how the prompt is handed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Claude,
    Codex,
    Gemini,
    Opencode,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Claude,
        AgentKind::Codex,
        AgentKind::Gemini,
        AgentKind::Opencode,
    ];

    /// Selector name used in tool arguments.
    pub fn name(self) -> &'static str {
        match self {
            AgentKind::Claude => "claude",
            AgentKind::Codex => "codex",
            AgentKind::Gemini => "gemini",
            AgentKind::Opencode => "opencode",
        }
    }

    /// Executable looked up on `PATH`.
    pub fn program(self) -> &'static str {
        self.name()
    }

    /// Flags baked into every invocation of this agent.
    pub fn fixed_flags(self) -> &'static [&'static str] {
        match self {
            AgentKind::Claude => &["--print", "--dangerously-skip-permissions"],
            AgentKind::Codex => &["exec", "--full-auto", "--skip-git-repo-check"],
            AgentKind::Gemini => &["--yolo"],
            AgentKind::Opencode => &["run"],
        }
    }

    /// Flag that must directly precede the prompt, if the prompt is not positional.
    pub fn prompt_flag(self) -> Option<&'static str> {
        match self {
            AgentKind::Gemini => Some("--prompt"),
            _ => None,
        }
    }

    /// Upper-case token used in env keys (`FANOUT_<TOKEN>_EXTRA_ARGS`).
    pub fn env_token(self) -> &'static str {
        match self {
            AgentKind::Claude => "CLAUDE",
            AgentKind::Codex => "CODEX",
            AgentKind::Gemini => "GEMINI",
            AgentKind::Opencode => "OPENCODE",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AgentKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        AgentKind::ALL
            .into_iter()
            .find(|agent| agent.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownAgent(s.to_string()))
    }
}
