// dynamic.rs — a self-animating scalar converging toward a target under a velocity ramp

use crate::error::ConfigError;
use crate::utils::wrap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicMode {
    /// Velocity decays toward 0.
    Stopped,
    /// Infinite movement toward ±infinity.
    Rolling,
    /// Movement toward a finite target.
    Seeking,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicConfig {
    pub min: f64,
    pub max: f64,
    /// Circular domain over `[0, max)`; requires `min == 0`.
    pub wrap: bool,
    pub default_value: f64,
}

pub type DynamicCallback = Box<dyn FnMut(f64)>;

pub struct Dynamic {
    current: f64,
    target: f64,
    mode: DynamicMode,
    speed: f64,
    speed_mult: f64,
    current_speed: f64,
    min: f64,
    max: f64,
    wrap: bool,
    callback: Option<DynamicCallback>,
}

impl std::fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dynamic")
            .field("current", &self.current)
            .field("target", &self.target)
            .field("mode", &self.mode)
            .field("speed", &self.speed)
            .field("speed_mult", &self.speed_mult)
            .field("current_speed", &self.current_speed)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("wrap", &self.wrap)
            .finish()
    }
}

impl Dynamic {
    pub fn new(config: DynamicConfig) -> Result<Self, ConfigError> {
        if config.wrap && config.min != 0.0 {
            return Err(ConfigError::WrapWithNonZeroMin { min: config.min });
        }

        let mut dynamic = Self {
            current: 0.0,
            target: 0.0,
            mode: DynamicMode::Stopped,
            speed: 0.0,
            speed_mult: 0.0,
            current_speed: 0.0,
            min: config.min,
            max: config.max,
            wrap: config.wrap,
            callback: None,
        };
        dynamic.current = dynamic.clamp_or_wrap(config.default_value);
        dynamic.target = dynamic.current;
        Ok(dynamic)
    }

    /// Registers the change callback; it is invoked once with the initial value.
    pub fn with_callback(mut self, mut callback: impl FnMut(f64) + 'static) -> Self {
        callback(self.current);
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn mode(&self) -> DynamicMode {
        self.mode
    }

    pub fn velocity(&self) -> f64 {
        self.current_speed
    }

    /// Changes the base speed, subsequent velocity ramps use it.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    pub fn goto(&mut self, position: f64, speed_mult: f64) {
        self.mode = DynamicMode::Seeking;
        self.target = self.clamp_or_wrap(position);
        self.speed_mult = speed_mult;
    }

    /// Moves the target by `step`. A `speed_mult` of 0 applies the step instantly.
    pub fn step(&mut self, step: f64, speed_mult: f64) -> bool {
        if speed_mult == 0.0 {
            self.set_value(self.current + step)
        } else {
            if self.mode != DynamicMode::Seeking {
                self.target = self.current;
            }
            self.goto(self.target + step, speed_mult);
            false
        }
    }

    pub fn roll(&mut self, invert: bool, speed_mult: f64) {
        self.mode = DynamicMode::Rolling;
        self.target = if invert {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        self.speed_mult = speed_mult;
    }

    pub fn stop(&mut self) {
        self.mode = DynamicMode::Stopped;
    }

    /// Sets the value immediately and stops any movement.
    pub fn set_value(&mut self, value: f64) -> bool {
        self.target = self.clamp_or_wrap(value);
        self.mode = DynamicMode::Stopped;
        self.current_speed = 0.0;
        if self.target != self.current {
            self.current = self.target;
            self.notify();
            true
        } else {
            false
        }
    }

    /// Advances by `elapsed` milliseconds. Called once per frame by the owner.
    pub fn update(&mut self, elapsed: f64) -> bool {
        let ramp = self.speed * self.speed_mult;

        if self.mode == DynamicMode::Seeking {
            if self.wrap && (self.target - self.current).abs() > self.max / 2.0 {
                self.current = if self.current < self.target {
                    self.current + self.max
                } else {
                    self.current - self.max
                };
            }

            let stop_distance = self.current_speed * self.current_speed / (ramp * 4.0);
            if (self.target - self.current).abs() <= stop_distance {
                self.mode = DynamicMode::Stopped;
            }
        }

        let mut target_speed = if self.mode == DynamicMode::Stopped {
            0.0
        } else {
            ramp
        };
        if self.target < self.current {
            target_speed = -target_speed;
        }

        let acceleration = elapsed / 1000.0 * ramp * 2.0;
        if self.current_speed < target_speed {
            self.current_speed = target_speed.min(self.current_speed + acceleration);
        } else if self.current_speed > target_speed {
            self.current_speed = target_speed.max(self.current_speed - acceleration);
        }

        let delta = self.current_speed * elapsed / 1000.0;
        let next = if self.current > self.target && self.current_speed != 0.0 {
            Some(self.target.max(self.current + delta))
        } else if self.current < self.target && self.current_speed != 0.0 {
            Some(self.target.min(self.current + delta))
        } else {
            None
        };

        let Some(next) = next else {
            return false;
        };

        let next = self.clamp_or_wrap(next);
        if next != self.current {
            self.current = next;
            self.notify();
            true
        } else {
            false
        }
    }

    fn clamp_or_wrap(&self, value: f64) -> f64 {
        if self.wrap {
            wrap(value, self.max)
        } else {
            value.clamp(self.min, self.max)
        }
    }

    fn notify(&mut self) {
        let current = self.current;
        if let Some(callback) = self.callback.as_mut() {
            callback(current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::f64::consts::TAU;
    use std::rc::Rc;

    fn bounded(default_value: f64) -> Dynamic {
        let mut dynamic = Dynamic::new(DynamicConfig {
            min: 0.0,
            max: 100.0,
            wrap: false,
            default_value,
        })
        .unwrap();
        dynamic.set_speed(50.0);
        dynamic
    }

    fn circular(default_value: f64) -> Dynamic {
        let mut dynamic = Dynamic::new(DynamicConfig {
            min: 0.0,
            max: TAU,
            wrap: true,
            default_value,
        })
        .unwrap();
        dynamic.set_speed(1.0);
        dynamic
    }

    #[test]
    fn wrap_requires_zero_min() {
        let result = Dynamic::new(DynamicConfig {
            min: -1.0,
            max: 1.0,
            wrap: true,
            default_value: 0.0,
        });
        assert!(matches!(
            result,
            Err(ConfigError::WrapWithNonZeroMin { .. })
        ));
    }

    #[test]
    fn goto_beyond_max_converges_to_max() {
        let mut dynamic = bounded(50.0);
        dynamic.goto(150.0, 1.0);
        for _ in 0..2000 {
            dynamic.update(16.0);
            assert!(dynamic.current() <= 100.0);
        }
        assert_eq!(dynamic.current(), 100.0);
    }

    #[test]
    fn seeking_never_leaves_bounds() {
        let mut dynamic = bounded(10.0);
        dynamic.goto(-40.0, 3.0);
        for _ in 0..500 {
            dynamic.update(16.0);
            assert!((0.0..=100.0).contains(&dynamic.current()));
        }
        dynamic.roll(false, 2.0);
        for _ in 0..500 {
            dynamic.update(16.0);
            assert!((0.0..=100.0).contains(&dynamic.current()));
        }
        assert_eq!(dynamic.current(), 100.0);
    }

    #[test]
    fn set_value_wraps_into_domain() {
        let mut dynamic = circular(0.0);
        for value in [-10.0, -TAU, TAU, 3.0 * TAU + 0.5, 1e6, -1e-9] {
            dynamic.set_value(value);
            assert!(dynamic.current() >= 0.0 && dynamic.current() < TAU, "{value}");
        }
    }

    #[test]
    fn wrapped_goto_takes_shortest_path() {
        let mut dynamic = circular(0.2);
        dynamic.goto(TAU - 0.2, 1.0);
        dynamic.update(16.0);
        // moving backward across zero
        assert!(dynamic.current() > 3.0 || dynamic.current() < 0.2);
        for _ in 0..2000 {
            dynamic.update(16.0);
            assert!(dynamic.current() >= 0.0 && dynamic.current() < TAU);
        }
        assert!((dynamic.current() - (TAU - 0.2)).abs() < 1e-9);
    }

    #[test]
    fn set_value_reports_changes_only() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut dynamic = bounded(50.0).with_callback(move |_| counter.set(counter.get() + 1));
        assert_eq!(calls.get(), 1);

        assert!(!dynamic.set_value(50.0));
        assert_eq!(calls.get(), 1);
        assert!(dynamic.set_value(60.0));
        assert_eq!(calls.get(), 2);
        assert!(!dynamic.set_value(60.0));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn step_without_speed_is_instant() {
        let mut dynamic = bounded(50.0);
        assert!(dynamic.step(5.0, 0.0));
        assert_eq!(dynamic.current(), 55.0);
        assert_eq!(dynamic.mode(), DynamicMode::Stopped);
    }

    #[test]
    fn step_accumulates_on_target() {
        let mut dynamic = bounded(50.0);
        dynamic.step(5.0, 1.0);
        dynamic.step(5.0, 1.0);
        assert_eq!(dynamic.target(), 60.0);
        assert_eq!(dynamic.mode(), DynamicMode::Seeking);
    }

    #[test]
    fn stop_decelerates_gradually() {
        let mut dynamic = bounded(0.0);
        dynamic.roll(false, 1.0);
        for _ in 0..60 {
            dynamic.update(16.0);
        }
        let velocity = dynamic.velocity();
        assert!(velocity > 0.0);

        dynamic.stop();
        dynamic.update(16.0);
        assert!(dynamic.velocity() > 0.0 && dynamic.velocity() < velocity);
        for _ in 0..200 {
            dynamic.update(16.0);
        }
        assert_eq!(dynamic.velocity(), 0.0);
    }

    #[test]
    fn velocity_ramps_symmetrically() {
        let mut dynamic = bounded(0.0);
        dynamic.roll(false, 1.0);
        // 2 * speed per second
        dynamic.update(100.0);
        assert!((dynamic.velocity() - 10.0).abs() < 1e-9);
        dynamic.update(1000.0);
        assert!((dynamic.velocity() - 50.0).abs() < 1e-9);
    }
}
