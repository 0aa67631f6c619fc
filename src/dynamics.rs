// dynamics.rs — the camera axes: zoom level, yaw/pitch position and roll

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::config::ViewerConfig;
use crate::dynamic::{Dynamic, DynamicConfig};
use crate::error::ConfigError;
use crate::multi_dynamic::MultiDynamic;

/// Which axes moved during one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisChanges {
    pub zoom: bool,
    pub position: bool,
    pub roll: bool,
}

impl AxisChanges {
    pub fn any(&self) -> bool {
        self.zoom || self.position || self.roll
    }
}

#[derive(Debug)]
pub struct ViewerDynamics {
    pub zoom: Dynamic,
    /// Axes `"yaw"` and `"pitch"`.
    pub position: MultiDynamic,
    pub roll: Dynamic,
}

impl ViewerDynamics {
    pub fn new(config: &ViewerConfig) -> Result<Self, ConfigError> {
        let zoom = Dynamic::new(DynamicConfig {
            min: 0.0,
            max: 100.0,
            wrap: false,
            default_value: config.default_zoom_lvl,
        })?;
        let yaw = Dynamic::new(DynamicConfig {
            min: 0.0,
            max: TAU,
            wrap: true,
            default_value: config.default_yaw,
        })?;
        let pitch = Dynamic::new(DynamicConfig {
            min: -FRAC_PI_2,
            max: FRAC_PI_2,
            wrap: false,
            default_value: config.default_pitch,
        })?;
        let roll = Dynamic::new(DynamicConfig {
            min: -PI,
            max: PI,
            wrap: false,
            default_value: 0.0,
        })?;

        let mut dynamics = Self {
            zoom,
            position: MultiDynamic::new(vec![("yaw", yaw), ("pitch", pitch)]),
            roll,
        };
        dynamics.update_speeds(config);
        Ok(dynamics)
    }

    /// Applies `zoomSpeed` and `moveSpeed`.
    pub fn update_speeds(&mut self, config: &ViewerConfig) {
        self.zoom.set_speed(config.zoom_speed * 50.0);
        self.position.set_speed((config.move_speed * 50.0).to_radians());
        self.roll.set_speed((config.move_speed * 50.0).to_radians());
    }

    /// Advances zoom, then position, then roll.
    pub fn update(&mut self, elapsed: f64) -> AxisChanges {
        let zoom = self.zoom.update(elapsed);
        let position = self.position.update(elapsed);
        let roll = self.roll.update(elapsed);
        AxisChanges {
            zoom,
            position,
            roll,
        }
    }

    pub fn stop(&mut self) {
        self.zoom.stop();
        self.position.stop();
        self.roll.stop();
    }

    pub fn yaw(&self) -> f64 {
        self.position.get("yaw").map(Dynamic::current).unwrap_or_default()
    }

    pub fn pitch(&self) -> f64 {
        self.position.get("pitch").map(Dynamic::current).unwrap_or_default()
    }
}
