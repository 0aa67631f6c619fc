// scene.rs — renderer boundary: hit-testing and drawing the current view

use glam::DVec3;

use crate::state::ViewerState;
use crate::SPHERE_RADIUS;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: String,
    /// The panorama sphere itself, as opposed to markers or other overlays.
    pub is_sphere: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    pub point: DVec3,
    pub distance: f64,
    pub object: SceneObject,
}

/// What the motion engine needs from a renderer.
pub trait SceneRenderer {
    /// Hits under the viewer point `(x, y)`, nearest first.
    fn intersections(&self, state: &ViewerState, x: f64, y: f64) -> Vec<Intersection>;

    /// Draws the current view.
    fn render(&mut self, state: &ViewerState);
}

/// Camera frame `(forward, right, up)` with roll applied.
pub fn camera_basis(state: &ViewerState) -> (DVec3, DVec3, DVec3) {
    let forward = state.direction.try_normalize().unwrap_or(DVec3::Z);
    let right = forward.cross(DVec3::Y).try_normalize().unwrap_or(DVec3::NEG_X);
    let up = right.cross(forward);
    let (sin, cos) = state.roll.sin_cos();
    (forward, right * cos + up * sin, up * cos - right * sin)
}

/// Direction of the ray leaving the camera through viewer point `(x, y)`.
pub fn camera_ray(state: &ViewerState, x: f64, y: f64) -> DVec3 {
    let (forward, right, up) = camera_basis(state);

    let width = state.size.width.max(1.0);
    let height = state.size.height.max(1.0);
    let ndc_x = 2.0 * x / width - 1.0;
    let ndc_y = 1.0 - 2.0 * y / height;
    let half_height = (state.v_fov.to_radians() / 2.0).tan();

    (forward + right * ndc_x * half_height * state.aspect + up * ndc_y * half_height).normalize()
}

/// Headless renderer: ray/sphere hit-testing and a frame counter.
#[derive(Debug, Default, Clone)]
pub struct SphereRaycaster {
    pub frames: u32,
}

impl SceneRenderer for SphereRaycaster {
    fn intersections(&self, state: &ViewerState, x: f64, y: f64) -> Vec<Intersection> {
        if state.size.width <= 0.0 || state.size.height <= 0.0 {
            return Vec::new();
        }
        let dir = camera_ray(state, x, y);
        // with fisheye the eye sits behind the centre, still inside the sphere
        let eye_offset = state.fisheye.clamp(0.0, 1.9) * 0.5 * SPHERE_RADIUS;
        let origin = -state.direction.normalize_or_zero() * eye_offset;
        let b = origin.dot(dir);
        let c = origin.length_squared() - SPHERE_RADIUS * SPHERE_RADIUS;
        let distance = -b + (b * b - c).max(0.0).sqrt();
        vec![Intersection {
            point: origin + dir * distance,
            distance,
            object: SceneObject {
                id: "sphere".to_string(),
                is_sphere: true,
            },
        }]
    }

    fn render(&mut self, _state: &ViewerState) {
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_helper::{spherical_to_vector3, vector3_to_spherical};
    use crate::state::{Position, Size};

    fn state(yaw: f64, pitch: f64) -> ViewerState {
        ViewerState {
            direction: spherical_to_vector3(Position::new(yaw, pitch)),
            size: Size {
                width: 800.0,
                height: 600.0,
            },
            aspect: 800.0 / 600.0,
            v_fov: 60.0,
            ..Default::default()
        }
    }

    #[test]
    fn center_hits_view_direction() {
        let state = state(1.0, 0.2);
        let hits = SphereRaycaster::default().intersections(&state, 400.0, 300.0);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].object.is_sphere);
        let position = vector3_to_spherical(hits[0].point);
        assert!((position.yaw - 1.0).abs() < 1e-9);
        assert!((position.pitch - 0.2).abs() < 1e-9);
    }

    #[test]
    fn right_and_top_edges() {
        let state = state(0.5, 0.0);
        let right = vector3_to_spherical(SphereRaycaster::default().intersections(&state, 800.0, 300.0)[0].point);
        assert!(right.yaw > 0.5);
        let top = vector3_to_spherical(SphereRaycaster::default().intersections(&state, 400.0, 0.0)[0].point);
        assert!((top.pitch - 30f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn fisheye_widens_the_view() {
        let flat = state(0.5, 0.0);
        let fisheye = ViewerState {
            fisheye: 1.0,
            ..flat.clone()
        };
        let picker = SphereRaycaster::default();

        let center = &picker.intersections(&fisheye, 400.0, 300.0)[0];
        assert!((center.distance - 1.5 * SPHERE_RADIUS).abs() < 1e-9);
        assert!((vector3_to_spherical(center.point).yaw - 0.5).abs() < 1e-9);

        let edge_flat = vector3_to_spherical(picker.intersections(&flat, 800.0, 300.0)[0].point);
        let edge_fisheye = vector3_to_spherical(picker.intersections(&fisheye, 800.0, 300.0)[0].point);
        assert!(edge_fisheye.yaw > edge_flat.yaw);
    }

    #[test]
    fn no_hits_without_size() {
        let state = ViewerState::default();
        assert!(SphereRaycaster::default().intersections(&state, 0.0, 0.0).is_empty());
    }
}
