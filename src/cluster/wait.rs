//! Blocking wait for a free job slot

use super::{ClusterError, ClusterResult, JobStatusProvider};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// How long and how often to poll the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitPolicy {
    /// Seconds between polls
    pub poll_interval_secs: u64,
    pub max_polls: u32,
    /// A new job may start only while fewer than this many are active
    pub max_active: usize,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            max_polls: 120,
            max_active: 4,
        }
    }
}

impl WaitPolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Block until `run` has left the queue and a slot is free
///
/// Returns the number of polls spent waiting.
pub fn wait_for_slot(
    provider: &dyn JobStatusProvider,
    run: &str,
    policy: &WaitPolicy,
) -> ClusterResult<u32> {
    wait_for_slot_with(provider, run, policy, std::thread::sleep)
}

/// [`wait_for_slot`] with an injectable sleep
pub fn wait_for_slot_with(
    provider: &dyn JobStatusProvider,
    run: &str,
    policy: &WaitPolicy,
    mut sleep: impl FnMut(Duration),
) -> ClusterResult<u32> {
    let mut polls = 0;
    loop {
        let active = provider.active_runs()?;
        let running = active.iter().any(|r| r == run);
        if !running && active.len() < policy.max_active {
            info!(run, active = active.len(), "slot free");
            return Ok(polls);
        }
        if polls >= policy.max_polls {
            return Err(ClusterError::WaitTimeout {
                run: run.to_string(),
                polls,
            });
        }
        polls += 1;
        info!(run, running, active = active.len(), poll = polls, "waiting for job slot");
        sleep(policy.poll_interval());
    }
}
