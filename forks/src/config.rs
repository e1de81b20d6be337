//! Fork activation thresholds and node-local overrides.

use {
    crate::error::{ForkError, Result},
    serde::{Deserialize, Serialize},
    std::collections::BTreeMap,
    tessera_ledger_types::Fork,
};

/// A fork treated as active from a fixed height regardless of signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualActivation {
    pub fork: Fork,
    pub height: u64,
}

/// Activation rule for one fork.
///
/// A fork activates at height `h` once at least `blocks_required` of the
/// `blocks_to_check` headers before `h` signal it, provided `h - 1` lies in
/// the signaling period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkRule {
    pub fork: Fork,
    pub blocks_required: u64,
    pub blocks_to_check: u64,
    /// First height (inclusive) whose successor may activate the fork.
    pub signaling_start: u64,
    /// Last height (inclusive) of the signaling period.
    pub signaling_end: u64,
}

impl ForkRule {
    pub fn for_fork(fork: Fork) -> Self {
        Self {
            fork,
            blocks_required: fork.blocks_required(),
            blocks_to_check: fork.blocks_to_check(),
            signaling_start: 0,
            signaling_end: u64::MAX,
        }
    }

    pub fn in_signaling_period(&self, height: u64) -> bool {
        (self.signaling_start..=self.signaling_end).contains(&height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkConfig {
    /// Rules overriding the per-fork defaults. A later rule for the same
    /// fork wins.
    pub rules: Vec<ForkRule>,

    pub manually_activated: Vec<ManualActivation>,

    /// Forks this node signals in the headers it proposes.
    pub signaled_forks: Vec<Fork>,
}

impl Default for ForkConfig {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            manually_activated: Vec::new(),
            signaled_forks: Fork::ALL.to_vec(),
        }
    }
}

impl ForkConfig {
    /// Short windows so activation can be exercised in a few blocks.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        let rules = Fork::ALL
            .into_iter()
            .map(|fork| ForkRule {
                fork,
                blocks_required: 3,
                blocks_to_check: 4,
                signaling_start: 0,
                signaling_end: u64::MAX,
            })
            .collect();
        Self {
            rules,
            ..Self::default()
        }
    }

    pub fn rule(&self, fork: Fork) -> ForkRule {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.fork == fork)
            .copied()
            .unwrap_or_else(|| ForkRule::for_fork(fork))
    }

    /// Height from which `fork` is manually activated, if configured.
    pub fn manual_activation(&self, fork: Fork) -> Option<u64> {
        self.manually_activated
            .iter()
            .rev()
            .find(|m| m.fork == fork)
            .map(|m| m.height)
    }

    /// Rules for every known fork, defaults filled in.
    pub fn resolved_rules(&self) -> BTreeMap<Fork, ForkRule> {
        Fork::ALL.into_iter().map(|f| (f, self.rule(f))).collect()
    }

    pub fn validate(&self) -> Result<()> {
        for fork in Fork::ALL {
            let rule = self.rule(fork);
            if rule.blocks_required == 0 || rule.blocks_to_check == 0 {
                return Err(ForkError::EmptyRule(fork));
            }
            if rule.blocks_required > rule.blocks_to_check {
                return Err(ForkError::RequirementExceedsWindow {
                    fork,
                    required: rule.blocks_required,
                    window: rule.blocks_to_check,
                });
            }
            if rule.signaling_start > rule.signaling_end {
                return Err(ForkError::InvertedPeriod {
                    fork,
                    start: rule.signaling_start,
                    end: rule.signaling_end,
                });
            }
        }
        Ok(())
    }
}
