// config.rs — viewer options, deserialized from JSON and normalized by `validate`

use std::collections::BTreeMap;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Deserializer};

use crate::easing::Easing;
use crate::error::{ConfigError, Result};
use crate::state::Position;
use crate::utils::{normalize_angle, parse_angle};

pub const DEFAULT_MOVE_INERTIA: f64 = 0.8;

/// When keyboard navigation is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyboardMode {
    Always,
    #[default]
    Fullscreen,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    RotateUp,
    RotateDown,
    RotateRight,
    RotateLeft,
    ZoomIn,
    ZoomOut,
}

impl Action {
    pub fn is_zoom(&self) -> bool {
        matches!(self, Action::ZoomIn | Action::ZoomOut)
    }
}

/// Either a fixed duration in ms or an angular speed such as `"2rpm"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnimationSpeed {
    Duration(f64),
    Speed(String),
}

impl From<f64> for AnimationSpeed {
    fn from(duration: f64) -> Self {
        AnimationSpeed::Duration(duration)
    }
}

impl From<&str> for AnimationSpeed {
    fn from(speed: &str) -> Self {
        AnimationSpeed::Speed(speed.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionEffect {
    #[default]
    Fade,
    Black,
    White,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransitionOptions {
    pub speed: AnimationSpeed,
    /// Rotate toward the new position while fading.
    pub rotation: bool,
    pub effect: TransitionEffect,
}

impl Default for TransitionOptions {
    fn default() -> Self {
        Self {
            speed: AnimationSpeed::Duration(1500.0),
            rotation: true,
            effect: TransitionEffect::Fade,
        }
    }
}

/// Target of [`crate::Viewer::animate`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnimateOptions {
    pub position: Option<Position>,
    pub zoom: Option<f64>,
    pub speed: AnimationSpeed,
    pub easing: Easing,
}

impl AnimateOptions {
    pub fn new(speed: impl Into<AnimationSpeed>) -> Self {
        Self {
            position: None,
            zoom: None,
            speed: speed.into(),
            easing: Easing::InOutSine,
        }
    }

    pub fn position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LangStrings {
    pub two_fingers: String,
    pub ctrl_zoom: String,
    pub loading: String,
    pub load_error: String,
}

impl Default for LangStrings {
    fn default() -> Self {
        Self {
            two_fingers: "Use two fingers to navigate".to_string(),
            ctrl_zoom: "Use ctrl + scroll to zoom the image".to_string(),
            loading: "Loading...".to_string(),
            load_error: "The panorama cannot be loaded".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    /// Degrees, field of view at zoom level 100.
    pub min_fov: f64,
    /// Degrees, field of view at zoom level 0.
    pub max_fov: f64,
    pub default_zoom_lvl: f64,
    #[serde(deserialize_with = "yaw_from_json")]
    pub default_yaw: f64,
    #[serde(deserialize_with = "pitch_from_json")]
    pub default_pitch: f64,
    pub move_speed: f64,
    pub zoom_speed: f64,
    /// Decay factor of drag inertia, 0 disables it.
    #[serde(deserialize_with = "inertia_from_json")]
    pub move_inertia: f64,
    pub mousewheel: bool,
    pub mousemove: bool,
    pub mousewheel_ctrl_key: bool,
    pub touchmove_two_fingers: bool,
    #[serde(deserialize_with = "keyboard_from_json")]
    pub keyboard: KeyboardMode,
    pub keyboard_actions: BTreeMap<String, Action>,
    pub default_transition: Option<TransitionOptions>,
    #[serde(deserialize_with = "fisheye_from_json")]
    pub fisheye: f64,
    pub lang: LangStrings,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let keyboard_actions = [
            ("PageUp", Action::ZoomIn),
            ("PageDown", Action::ZoomOut),
            ("+", Action::ZoomIn),
            ("-", Action::ZoomOut),
            ("ArrowUp", Action::RotateUp),
            ("ArrowDown", Action::RotateDown),
            ("ArrowRight", Action::RotateRight),
            ("ArrowLeft", Action::RotateLeft),
        ]
        .into_iter()
        .map(|(key, action)| (key.to_string(), action))
        .collect();

        Self {
            min_fov: 30.0,
            max_fov: 90.0,
            default_zoom_lvl: 50.0,
            default_yaw: 0.0,
            default_pitch: 0.0,
            move_speed: 1.0,
            zoom_speed: 1.0,
            move_inertia: DEFAULT_MOVE_INERTIA,
            mousewheel: true,
            mousemove: true,
            mousewheel_ctrl_key: false,
            touchmove_two_fingers: false,
            keyboard: KeyboardMode::Fullscreen,
            keyboard_actions,
            default_transition: Some(TransitionOptions::default()),
            fisheye: 0.0,
            lang: LangStrings::default(),
        }
    }
}

impl ViewerConfig {
    /// Parses and validates a JSON document; missing keys keep their default.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: ViewerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn default_position(&self) -> Position {
        Position::new(self.default_yaw, self.default_pitch)
    }

    /// Normalizes angles and clamps ranges. Recoverable inconsistencies are fixed with
    /// a warning; invalid numbers are rejected.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("minFov", self.min_fov),
            ("maxFov", self.max_fov),
            ("defaultZoomLvl", self.default_zoom_lvl),
            ("moveSpeed", self.move_speed),
            ("zoomSpeed", self.zoom_speed),
            ("moveInertia", self.move_inertia),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{name} must be a finite number")));
            }
        }

        if self.max_fov < self.min_fov {
            warn!("maxFov cannot be lower than minFov");
            self.min_fov = self.max_fov;
        }
        self.min_fov = self.min_fov.clamp(1.0, 179.0);
        self.max_fov = self.max_fov.clamp(1.0, 179.0);

        self.default_zoom_lvl = self.default_zoom_lvl.clamp(0.0, 100.0);
        self.default_yaw = normalize_angle(self.default_yaw, false, false);
        self.default_pitch = normalize_angle(self.default_pitch, true, true);

        if !(0.0..1.0).contains(&self.move_inertia) {
            warn!("moveInertia must be in [0, 1), got {}", self.move_inertia);
            self.move_inertia = self.move_inertia.clamp(0.0, 0.99);
        }

        if let Some(transition) = &self.default_transition {
            if transition.speed == AnimationSpeed::Duration(0.0) {
                self.default_transition = None;
            }
        }

        Ok(())
    }
}

fn angle_from_json<'de, D>(deserializer: D, zero_center: bool) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(normalize_angle(value, zero_center, zero_center)),
        Raw::Text(text) => {
            parse_angle(&text, zero_center, zero_center).map_err(serde::de::Error::custom)
        }
    }
}

fn yaw_from_json<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    angle_from_json(deserializer, false)
}

fn pitch_from_json<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    angle_from_json(deserializer, true)
}

/// A number, or a flag standing for `enabled` / 0.
fn flag_or_number<'de, D>(deserializer: D, enabled: f64) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Number(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Flag(true) => enabled,
        Raw::Flag(false) => 0.0,
        Raw::Number(value) => value,
    })
}

fn inertia_from_json<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    flag_or_number(deserializer, DEFAULT_MOVE_INERTIA)
}

fn fisheye_from_json<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    flag_or_number(deserializer, 1.0)
}

fn keyboard_from_json<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<KeyboardMode, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(bool),
        Mode(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Flag(true) => Ok(KeyboardMode::Fullscreen),
        Raw::Flag(false) => Ok(KeyboardMode::Disabled),
        Raw::Mode(mode) => match mode.as_str() {
            "always" => Ok(KeyboardMode::Always),
            "fullscreen" => Ok(KeyboardMode::Fullscreen),
            "false" | "none" => Ok(KeyboardMode::Disabled),
            other => Err(serde::de::Error::custom(format!(
                "unknown keyboard mode \"{other}\""
            ))),
        },
    }
}
