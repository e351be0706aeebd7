//! Suppression window for self-inflicted filesystem events
//!
//! While the sync engine writes into the workspace (downloads, pulls) every
//! watcher event would bounce straight back as an upload. The gate is closed
//! for the duration of such writes and re-opens only after a cool-down, since
//! the OS delivers the resulting notifications after the write returns.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

#[derive(Debug, Default)]
struct GateState {
    suppressed: bool,
    /// Bumped on every disable so stale re-enable timers become no-ops
    epoch: u64,
}

/// Process-wide intake gate
#[derive(Debug)]
pub struct SuppressionGate {
    state: Mutex<GateState>,
    reenable_delay: Duration,
}

impl SuppressionGate {
    pub fn new(reenable_delay: Duration) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            reenable_delay,
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.state.lock().suppressed
    }

    /// Drop all events from now on
    pub fn disable(&self) {
        let mut state = self.state.lock();
        state.suppressed = true;
        state.epoch += 1;
        debug!("Watcher suppressed");
    }

    /// Accept events again after the cool-down
    ///
    /// Returns false (and schedules nothing) when the gate is open.
    pub fn enable(self: &Arc<Self>, runtime: &Handle) -> bool {
        let epoch = {
            let state = self.state.lock();
            if !state.suppressed {
                return false;
            }
            state.epoch
        };

        let gate = Arc::clone(self);
        runtime.spawn(async move {
            tokio::time::sleep(gate.reenable_delay).await;
            gate.reopen(epoch);
        });
        true
    }

    fn reopen(&self, epoch: u64) {
        let mut state = self.state.lock();
        // A disable() after the enable() keeps the gate closed
        if state.epoch == epoch && state.suppressed {
            state.suppressed = false;
            debug!("Watcher re-enabled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> Arc<SuppressionGate> {
        Arc::new(SuppressionGate::new(Duration::from_millis(2000)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_is_delayed() {
        let gate = gate();
        gate.disable();
        assert!(gate.is_suppressed());

        assert!(gate.enable(&Handle::current()));
        assert!(gate.is_suppressed());

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert!(gate.is_suppressed());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!gate.is_suppressed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_without_disable_is_noop() {
        let gate = gate();
        assert!(!gate.enable(&Handle::current()));
        assert!(!gate.is_suppressed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_cancels_pending_reenable() {
        let gate = gate();
        gate.disable();
        gate.enable(&Handle::current());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        gate.disable();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(gate.is_suppressed(), "stale timer must not reopen the gate");

        gate.enable(&Handle::current());
        tokio::time::sleep(Duration::from_millis(2001)).await;
        assert!(!gate.is_suppressed());
    }
}
