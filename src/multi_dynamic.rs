// multi_dynamic.rs — several named Dynamics moved as one unit

use std::collections::BTreeMap;

use log::warn;

use crate::dynamic::Dynamic;

/// Snapshot of every axis, keyed by axis name.
pub type DynamicValues = BTreeMap<&'static str, f64>;

pub type MultiDynamicCallback = Box<dyn FnMut(&DynamicValues)>;

/// Groups Dynamics (e.g. yaw + pitch). Every operation notifies at most once with the
/// full snapshot, never once per axis.
pub struct MultiDynamic {
    dynamics: Vec<(&'static str, Dynamic)>,
    callback: Option<MultiDynamicCallback>,
}

impl std::fmt::Debug for MultiDynamic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiDynamic")
            .field("dynamics", &self.dynamics)
            .finish()
    }
}

impl MultiDynamic {
    pub fn new(dynamics: Vec<(&'static str, Dynamic)>) -> Self {
        Self {
            dynamics,
            callback: None,
        }
    }

    /// Registers the change callback; it is invoked once with the initial snapshot.
    pub fn with_callback(mut self, mut callback: impl FnMut(&DynamicValues) + 'static) -> Self {
        callback(&self.current());
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn current(&self) -> DynamicValues {
        self.dynamics
            .iter()
            .map(|(name, dynamic)| (*name, dynamic.current()))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Dynamic> {
        self.dynamics
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, dynamic)| dynamic)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Dynamic> {
        let found = self.dynamics.iter_mut().find(|(n, _)| *n == name);
        if found.is_none() {
            warn!("unknown dynamic axis \"{name}\"");
        }
        found.map(|(_, dynamic)| dynamic)
    }

    pub fn set_speed(&mut self, speed: f64) {
        for (_, dynamic) in &mut self.dynamics {
            dynamic.set_speed(speed);
        }
    }

    pub fn goto<'a>(&mut self, positions: impl IntoIterator<Item = (&'a str, f64)>, speed_mult: f64) {
        for (name, position) in positions {
            if let Some(dynamic) = self.get_mut(name) {
                dynamic.goto(position, speed_mult);
            }
        }
    }

    pub fn step<'a>(
        &mut self,
        steps: impl IntoIterator<Item = (&'a str, f64)>,
        speed_mult: f64,
    ) -> bool {
        if speed_mult == 0.0 {
            let values: Vec<(&'a str, f64)> = steps
                .into_iter()
                .filter_map(|(name, step)| {
                    self.get(name).map(|dynamic| (name, dynamic.current() + step))
                })
                .collect();
            self.set_value(values)
        } else {
            for (name, step) in steps {
                if let Some(dynamic) = self.get_mut(name) {
                    dynamic.step(step, speed_mult);
                }
            }
            false
        }
    }

    pub fn roll<'a>(&mut self, rolls: impl IntoIterator<Item = (&'a str, bool)>, speed_mult: f64) {
        for (name, invert) in rolls {
            if let Some(dynamic) = self.get_mut(name) {
                dynamic.roll(invert, speed_mult);
            }
        }
    }

    pub fn stop(&mut self) {
        for (_, dynamic) in &mut self.dynamics {
            dynamic.stop();
        }
    }

    pub fn set_value<'a>(&mut self, values: impl IntoIterator<Item = (&'a str, f64)>) -> bool {
        let mut has_updates = false;
        for (name, value) in values {
            if let Some(dynamic) = self.get_mut(name) {
                has_updates |= dynamic.set_value(value);
            }
        }
        if has_updates {
            self.notify();
        }
        has_updates
    }

    pub fn update(&mut self, elapsed: f64) -> bool {
        let mut has_updates = false;
        for (_, dynamic) in &mut self.dynamics {
            has_updates |= dynamic.update(elapsed);
        }
        if has_updates {
            self.notify();
        }
        has_updates
    }

    fn notify(&mut self) {
        let current = self.current();
        if let Some(callback) = self.callback.as_mut() {
            callback(&current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::DynamicConfig;
    use std::cell::RefCell;
    use std::f64::consts::{FRAC_PI_2, TAU};
    use std::rc::Rc;

    fn position() -> MultiDynamic {
        let yaw = Dynamic::new(DynamicConfig {
            min: 0.0,
            max: TAU,
            wrap: true,
            default_value: 0.0,
        })
        .unwrap();
        let pitch = Dynamic::new(DynamicConfig {
            min: -FRAC_PI_2,
            max: FRAC_PI_2,
            wrap: false,
            default_value: 0.0,
        })
        .unwrap();
        let mut multi = MultiDynamic::new(vec![("yaw", yaw), ("pitch", pitch)]);
        multi.set_speed(1.0);
        multi
    }

    #[test]
    fn set_value_notifies_once() {
        let snapshots = Rc::new(RefCell::new(Vec::new()));
        let sink = snapshots.clone();
        let mut multi = position().with_callback(move |values| sink.borrow_mut().push(values.clone()));
        snapshots.borrow_mut().clear();

        assert!(multi.set_value([("yaw", 1.0), ("pitch", 0.5)]));
        assert_eq!(snapshots.borrow().len(), 1);
        assert_eq!(snapshots.borrow()[0]["yaw"], 1.0);
        assert_eq!(snapshots.borrow()[0]["pitch"], 0.5);

        assert!(!multi.set_value([("yaw", 1.0)]));
        assert_eq!(snapshots.borrow().len(), 1);
    }

    #[test]
    fn update_notifies_once_per_frame() {
        let calls = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        let mut multi = position().with_callback(move |_| *counter.borrow_mut() += 1);
        *calls.borrow_mut() = 0;

        multi.goto([("yaw", 1.0), ("pitch", 0.3)], 1.0);
        assert!(multi.update(16.0));
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn instant_step_moves_all_axes() {
        let mut multi = position();
        assert!(multi.step([("yaw", -0.5), ("pitch", 0.25)], 0.0));
        let current = multi.current();
        assert!((current["yaw"] - (TAU - 0.5)).abs() < 1e-12);
        assert_eq!(current["pitch"], 0.25);
    }

    #[test]
    fn unknown_axis_is_ignored() {
        let mut multi = position();
        assert!(!multi.set_value([("zoom", 3.0)]));
        assert_eq!(multi.current().len(), 2);
    }

    #[test]
    fn roll_and_stop() {
        let mut multi = position();
        multi.roll([("yaw", true)], 1.0);
        multi.update(100.0);
        assert!(multi.get("yaw").unwrap().velocity() < 0.0);
        assert_eq!(multi.get("pitch").unwrap().velocity(), 0.0);
        multi.stop();
        for _ in 0..100 {
            multi.update(16.0);
        }
        assert_eq!(multi.get("yaw").unwrap().velocity(), 0.0);
    }
}
