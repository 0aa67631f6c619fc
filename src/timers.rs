// timers.rs — cancelable deadlines fired from the host clock

use std::collections::BTreeMap;

/// Session timers of the input state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimerKey {
    DoubleClick,
    LongTouch,
    TwoFingersOverlay,
    CtrlZoomOverlay,
}

/// At most one deadline per key; setting a key again restarts it.
#[derive(Debug, Default, Clone)]
pub struct Timers {
    deadlines: BTreeMap<TimerKey, f64>,
}

impl Timers {
    pub fn set(&mut self, key: TimerKey, now: f64, delay: f64) {
        self.deadlines.insert(key, now + delay);
    }

    pub fn clear(&mut self, key: TimerKey) -> bool {
        self.deadlines.remove(&key).is_some()
    }

    pub fn is_set(&self, key: TimerKey) -> bool {
        self.deadlines.contains_key(&key)
    }

    /// Removes and returns the keys whose deadline is reached, earliest first.
    pub fn take_due(&mut self, now: f64) -> Vec<TimerKey> {
        let mut due: Vec<(TimerKey, f64)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, deadline)| (*key, *deadline))
            .collect();
        due.sort_by(|a, b| a.1.total_cmp(&b.1));
        for (key, _) in &due {
            self.deadlines.remove(key);
        }
        due.into_iter().map(|(key, _)| key).collect()
    }
}
