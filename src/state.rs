// state.rs — authoritative camera/view state read by the renderer

use glam::DVec3;

use crate::adapter::PanoData;
use crate::config::TransitionEffect;
use crate::SPHERE_RADIUS;

/// Yaw in `[0, 2π)`, pitch in `[-π/2, π/2]`, radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub yaw: f64,
    pub pitch: f64,
}

impl Position {
    pub fn new(yaw: f64, pitch: f64) -> Self {
        Self { yaw, pitch }
    }
}

/// Viewer size in logical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
pub struct ViewerState {
    /// The first panorama finished loading.
    pub ready: bool,
    pub needs_update: bool,
    /// Number of collaborators asking for a render every frame.
    pub continuous_update_count: u32,
    pub keyboard_enabled: bool,
    /// Camera target on the sphere.
    pub direction: DVec3,
    pub roll: f64,
    /// Vertical field of view, degrees.
    pub v_fov: f64,
    /// Horizontal field of view, degrees.
    pub h_fov: f64,
    pub aspect: f64,
    /// Eye offset toward the back of the sphere, 0 for a rectilinear view.
    pub fisheye: f64,
    pub size: Size,
    /// Device pixels per logical pixel.
    pub pixel_ratio: f64,
    /// Timestamp of the last interaction, `None` while the idle timer is disabled.
    pub idle_time: Option<f64>,
    /// Cross-fade toward the next panorama, if one runs.
    pub transition: Option<TransitionState>,
    /// The panorama currently displayed.
    pub texture: Option<PanoData>,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            ready: false,
            needs_update: false,
            continuous_update_count: 0,
            keyboard_enabled: false,
            direction: DVec3::new(0.0, 0.0, SPHERE_RADIUS),
            roll: 0.0,
            v_fov: 60.0,
            h_fov: 60.0,
            aspect: 1.0,
            fisheye: 0.0,
            size: Size::default(),
            pixel_ratio: 1.0,
            idle_time: None,
            transition: None,
            texture: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionState {
    pub effect: TransitionEffect,
    /// Transition progress in `[0, 1]`.
    pub progress: f64,
    pub incoming: PanoData,
}

fn map_linear(x: f64, a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    b1 + (x - a1) * (b2 - b1) / (a2 - a1)
}

impl TransitionState {
    /// Opacity of the incoming panorama drawn over the current one.
    pub fn incoming_opacity(&self) -> f64 {
        match self.effect {
            TransitionEffect::Fade => self.progress,
            TransitionEffect::Black | TransitionEffect::White => {
                if self.progress < 0.5 {
                    0.0
                } else {
                    1.0
                }
            }
        }
    }

    /// Tone exposure: dips to black (0) or flashes white (4) at mid transition.
    pub fn exposure(&self) -> f64 {
        let peak = match self.effect {
            TransitionEffect::Fade => return 1.0,
            TransitionEffect::Black => 0.0,
            TransitionEffect::White => 4.0,
        };
        if self.progress < 0.5 {
            map_linear(self.progress, 0.0, 0.5, 1.0, peak)
        } else {
            map_linear(self.progress, 0.5, 1.0, peak, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(effect: TransitionEffect, progress: f64) -> TransitionState {
        TransitionState {
            effect,
            progress,
            incoming: PanoData::merge(2000, 1000, None),
        }
    }

    #[test]
    fn fade_blends_opacity() {
        let state = transition(TransitionEffect::Fade, 0.3);
        assert_eq!(state.incoming_opacity(), 0.3);
        assert_eq!(state.exposure(), 1.0);
    }

    #[test]
    fn black_dips_at_half_way() {
        assert_eq!(transition(TransitionEffect::Black, 0.0).exposure(), 1.0);
        assert_eq!(transition(TransitionEffect::Black, 0.5).exposure(), 0.0);
        assert_eq!(transition(TransitionEffect::Black, 1.0).exposure(), 1.0);
        assert_eq!(transition(TransitionEffect::Black, 0.25).incoming_opacity(), 0.0);
        assert_eq!(transition(TransitionEffect::White, 0.5).exposure(), 4.0);
        assert_eq!(transition(TransitionEffect::White, 0.75).incoming_opacity(), 1.0);
    }
}
