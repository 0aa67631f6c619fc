// data_helper.rs — conversions between zoom, field of view, vectors and angles

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, TAU};

use glam::DVec3;

use crate::config::AnimationSpeed;
use crate::error::ConfigError;
use crate::state::Position;
use crate::utils::{angle_between, normalize_angle, shortest_arc, speed_to_duration, wrap};
use crate::{ANIMATION_MIN_DURATION, SPHERE_RADIUS};

/// Vertical FOV (degrees) for a zoom level in `[0, 100]`.
pub fn zoom_level_to_fov(level: f64, min_fov: f64, max_fov: f64) -> f64 {
    max_fov + (level / 100.0) * (min_fov - max_fov)
}

/// Inverse of [`zoom_level_to_fov`], rounded to an integer level.
pub fn fov_to_zoom_level(fov: f64, min_fov: f64, max_fov: f64) -> f64 {
    if max_fov == min_fov {
        return 100.0;
    }
    let temp = ((fov - min_fov) / (max_fov - min_fov) * 100.0).round();
    (temp - 2.0 * (temp - 50.0)).clamp(0.0, 100.0)
}

pub fn v_fov_to_h_fov(v_fov: f64, aspect: f64) -> f64 {
    (2.0 * ((v_fov.to_radians() / 2.0).tan() * aspect).atan()).to_degrees()
}

pub fn h_fov_to_v_fov(h_fov: f64, aspect: f64) -> f64 {
    (2.0 * ((h_fov.to_radians() / 2.0).tan() / aspect).atan()).to_degrees()
}

/// Point of the panorama sphere seen at `position`.
pub fn spherical_to_vector3(position: Position) -> DVec3 {
    DVec3::new(
        -SPHERE_RADIUS * position.pitch.cos() * position.yaw.sin(),
        SPHERE_RADIUS * position.pitch.sin(),
        SPHERE_RADIUS * position.pitch.cos() * position.yaw.cos(),
    )
}

pub fn vector3_to_spherical(vector: DVec3) -> Position {
    let length = vector.length();
    if length == 0.0 {
        return Position::default();
    }
    let phi = (vector.y / length).clamp(-1.0, 1.0).acos();
    let theta = vector.x.atan2(vector.z);
    Position {
        yaw: wrap(-theta, TAU),
        pitch: FRAC_PI_2 - phi,
    }
}

/// Yaw wrapped into `[0, 2π)`, pitch clamped to `[-π/2, π/2]`.
pub fn clean_position(position: Position) -> Position {
    Position {
        yaw: normalize_angle(position.yaw, false, false),
        pitch: normalize_angle(position.pitch, true, true),
    }
}

/// Start/end values and duration of an animation from `from` to the optional targets.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationPlan {
    /// `(start, end)` per property; yaw may end outside `[0, 2π)` to take the short way.
    pub properties: Vec<(&'static str, f64, f64)>,
    pub duration: f64,
}

pub fn animation_properties(
    speed: &AnimationSpeed,
    from: Position,
    from_zoom: f64,
    position: Option<Position>,
    zoom: Option<f64>,
) -> Result<AnimationPlan, ConfigError> {
    let mut properties = Vec::new();
    let mut duration = None;

    if let Some(target) = position {
        let target = clean_position(target);
        properties.push(("yaw", from.yaw, from.yaw + shortest_arc(from.yaw, target.yaw)));
        properties.push(("pitch", from.pitch, target.pitch));
        if let AnimationSpeed::Speed(speed) = speed {
            let angle = angle_between(from.yaw, from.pitch, target.yaw, target.pitch);
            duration = Some(speed_to_duration(speed, angle)?);
        }
    }

    if let Some(zoom) = zoom {
        let zoom = zoom.clamp(0.0, 100.0);
        properties.push(("zoom", from_zoom, zoom));
        if position.is_none() {
            if let AnimationSpeed::Speed(speed) = speed {
                duration = Some(speed_to_duration(
                    speed,
                    FRAC_PI_4 * (from_zoom - zoom).abs() / 100.0,
                )?);
            }
        }
    }

    let duration = match (speed, duration) {
        (AnimationSpeed::Duration(ms), _) => ms.abs(),
        (_, Some(computed)) => computed.max(ANIMATION_MIN_DURATION),
        (_, None) => ANIMATION_MIN_DURATION,
    };

    Ok(AnimationPlan {
        properties,
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn zoom_fov_conversions() {
        assert_eq!(zoom_level_to_fov(0.0, 30.0, 90.0), 90.0);
        assert_eq!(zoom_level_to_fov(100.0, 30.0, 90.0), 30.0);
        assert_eq!(zoom_level_to_fov(50.0, 30.0, 90.0), 60.0);
        assert_eq!(fov_to_zoom_level(60.0, 30.0, 90.0), 50.0);
        assert_eq!(fov_to_zoom_level(90.0, 30.0, 90.0), 0.0);
        assert_eq!(fov_to_zoom_level(30.0, 30.0, 90.0), 100.0);
    }

    #[test]
    fn h_fov_matches_aspect() {
        assert!((v_fov_to_h_fov(60.0, 1.0) - 60.0).abs() < 1e-9);
        let h = v_fov_to_h_fov(60.0, 16.0 / 9.0);
        assert!(h > 60.0);
        assert!((h_fov_to_v_fov(h, 16.0 / 9.0) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn vector_round_trip() {
        for (yaw, pitch) in [(0.0, 0.0), (1.0, 0.3), (PI, -1.2), (5.5, 0.9)] {
            let back = vector3_to_spherical(spherical_to_vector3(Position::new(yaw, pitch)));
            assert!((back.yaw - yaw).abs() < 1e-9, "{yaw} -> {}", back.yaw);
            assert!((back.pitch - pitch).abs() < 1e-9);
        }
    }

    #[test]
    fn plan_takes_short_way_round() {
        let plan = animation_properties(
            &AnimationSpeed::Duration(800.0),
            Position::new(0.1, 0.0),
            50.0,
            Some(Position::new(TAU - 0.1, 0.2)),
            None,
        )
        .unwrap();
        assert_eq!(plan.duration, 800.0);
        let (_, start, end) = plan.properties[0];
        assert_eq!(start, 0.1);
        assert!((end + 0.1).abs() < 1e-9);
    }

    #[test]
    fn plan_duration_from_speed() {
        let plan = animation_properties(
            &AnimationSpeed::Speed("2rpm".into()),
            Position::new(0.0, 0.0),
            50.0,
            Some(Position::new(PI, 0.0)),
            Some(80.0),
        )
        .unwrap();
        // half a turn at 2 turns per minute
        assert!((plan.duration - 15_000.0).abs() < 1e-6);
        assert_eq!(plan.properties.len(), 3);

        let short = animation_properties(
            &AnimationSpeed::Speed("10rps".into()),
            Position::new(0.0, 0.0),
            50.0,
            None,
            Some(60.0),
        )
        .unwrap();
        assert_eq!(short.duration, ANIMATION_MIN_DURATION);

        assert!(animation_properties(
            &AnimationSpeed::Speed("fast".into()),
            Position::default(),
            0.0,
            Some(Position::new(1.0, 0.0)),
            None,
        )
        .is_err());
    }
}
