//! Deployment hook phases the orchestrator reacts to

use serde::{Deserialize, Serialize};

/// Hook execution phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookPhase {
    /// After installation completes successfully
    PostInstall,

    /// Before upgrade begins
    PreUpgrade,
    /// After upgrade completes successfully
    PostUpgrade,

    /// Before uninstall begins
    PreDelete,
}

impl HookPhase {
    pub fn all() -> &'static [HookPhase] {
        &[
            HookPhase::PostInstall,
            HookPhase::PreUpgrade,
            HookPhase::PostUpgrade,
            HookPhase::PreDelete,
        ]
    }

    /// Is this a "pre" phase (before the operation)?
    pub fn is_pre(&self) -> bool {
        matches!(self, HookPhase::PreUpgrade | HookPhase::PreDelete)
    }

    /// Is this a "post" phase (after the operation)?
    pub fn is_post(&self) -> bool {
        matches!(self, HookPhase::PostInstall | HookPhase::PostUpgrade)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::PostInstall => "post-install",
            HookPhase::PreUpgrade => "pre-upgrade",
            HookPhase::PostUpgrade => "post-upgrade",
            HookPhase::PreDelete => "pre-delete",
        }
    }
}

impl std::fmt::Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HookPhase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        HookPhase::all()
            .iter()
            .copied()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = HookPhase::all().iter().map(|p| p.as_str()).collect();
                format!("unknown hook phase '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}
