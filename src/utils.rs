// utils.rs — angle math and unit parsing shared by the motion engine

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;

/// Wraps `value` into `[0, max)`.
pub fn wrap(value: f64, max: f64) -> f64 {
    let result = value % max;
    if result < 0.0 {
        result + max
    } else {
        result
    }
}

/// Signed yaw delta from `from` to `to` taking the shortest way around the circle.
pub fn shortest_arc(from: f64, to: f64) -> f64 {
    [0.0, TAU, -TAU]
        .iter()
        .map(|candidate| to - from + candidate)
        .fold(f64::INFINITY, |best, value| {
            if value.abs() < best.abs() {
                value
            } else {
                best
            }
        })
}

/// Great-circle angle between two (yaw, pitch) positions.
pub fn angle_between(yaw1: f64, pitch1: f64, yaw2: f64, pitch2: f64) -> f64 {
    let cos = pitch1.cos() * pitch2.cos() * (yaw1 - yaw2).cos() + pitch1.sin() * pitch2.sin();
    cos.clamp(-1.0, 1.0).acos()
}

pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt()
}

static NUMBER_WITH_UNIT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(-?[0-9]+(?:\.[0-9]*)?)((?s:.*))$").ok());

/// Splits "10rpm" / "-1.5 rad" into the leading number and the rest.
fn split_number(text: &str) -> Option<(f64, &str)> {
    let captures = NUMBER_WITH_UNIT.as_ref()?.captures(text)?;
    let number = captures.get(1)?.as_str();
    let value = number.trim_end_matches('.').parse::<f64>().ok()?;
    Some((value, captures.get(2).map_or("", |unit| unit.as_str())))
}

/// Parses an angular speed such as `"10rpm"`, `"2dps"` or `"1.5 radians per second"`
/// into radians per second.
pub fn parse_speed(speed: &str) -> Result<f64, ConfigError> {
    let speed = speed.trim();
    let (mut value, unit) =
        split_number(speed).ok_or_else(|| ConfigError::UnknownSpeedUnit(speed.to_string()))?;
    let unit = unit.trim();

    if unit.ends_with("pm") || unit.ends_with("per minute") {
        value /= 60.0;
    }

    match unit {
        "dpm" | "degrees per minute" | "dps" | "degrees per second" => Ok(value.to_radians()),
        "rdpm" | "radians per minute" | "rdps" | "radians per second" => Ok(value),
        "rpm" | "revolutions per minute" | "rps" | "revolutions per second" => Ok(value * TAU),
        _ => Err(ConfigError::UnknownSpeedUnit(unit.to_string())),
    }
}

/// Duration in ms needed to travel `angle` radians at `speed`.
pub fn speed_to_duration(speed: &str, angle: f64) -> Result<f64, ConfigError> {
    let speed = parse_speed(speed)?;
    Ok(angle / speed.abs() * 1000.0)
}

/// Parses `"30deg"`, `"1.2rad"` or a bare number (radians).
///
/// With `zero_center` the result is in `[-π, π]`, or `[-π/2, π/2]` when `half_circle`;
/// otherwise it is wrapped into `[0, 2π)`.
pub fn parse_angle(angle: &str, zero_center: bool, half_circle: bool) -> Result<f64, ConfigError> {
    let text = angle.trim().to_lowercase();
    let (value, unit) =
        split_number(&text).ok_or_else(|| ConfigError::UnknownAngle(angle.to_string()))?;
    let parsed = match unit {
        "" | "rad" | "rads" => value,
        "deg" | "degs" => value.to_radians(),
        _ => return Err(ConfigError::UnknownAngleUnit(unit.to_string())),
    };
    Ok(normalize_angle(parsed, zero_center, half_circle))
}

/// Numeric counterpart of [`parse_angle`].
pub fn normalize_angle(angle: f64, zero_center: bool, half_circle: bool) -> f64 {
    let wrapped = wrap(if zero_center { angle + PI } else { angle }, TAU);
    if zero_center {
        let limit = if half_circle { FRAC_PI_2 } else { PI };
        (wrapped - PI).clamp(-limit, limit)
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_negative_values() {
        assert!((wrap(-1.0, TAU) - (TAU - 1.0)).abs() < 1e-12);
        assert_eq!(wrap(7.0, 5.0), 2.0);
        assert_eq!(wrap(0.0, 5.0), 0.0);
    }

    #[test]
    fn shortest_arc_crosses_zero() {
        assert!((shortest_arc(0.1, TAU - 0.1) + 0.2).abs() < 1e-9);
        assert!((shortest_arc(TAU - 0.1, 0.1) - 0.2).abs() < 1e-9);
        assert!((shortest_arc(1.0, 2.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn parse_speed_units() {
        assert!((parse_speed("10rpm").unwrap() - 10.0 * TAU / 60.0).abs() < 1e-12);
        assert!((parse_speed("5dps").unwrap() - 5.0 * PI / 180.0).abs() < 1e-12);
        assert!((parse_speed("2rps").unwrap() - 2.0 * TAU).abs() < 1e-12);
        assert!((parse_speed("1.5rdps").unwrap() - 1.5).abs() < 1e-12);
        assert!((parse_speed("60 degrees per minute").unwrap() - 1f64.to_radians()).abs() < 1e-12);
        assert!((parse_speed("-1rps").unwrap() + TAU).abs() < 1e-12);
    }

    #[test]
    fn parse_speed_rejects_unknown_unit() {
        assert_eq!(
            parse_speed("3mph"),
            Err(ConfigError::UnknownSpeedUnit("mph".to_string()))
        );
        assert!(parse_speed("fast").is_err());
    }

    #[test]
    fn parse_angle_units() {
        assert!((parse_angle("90deg", false, false).unwrap() - FRAC_PI_2).abs() < 1e-12);
        assert!((parse_angle("1.5rad", false, false).unwrap() - 1.5).abs() < 1e-12);
        assert!((parse_angle("-90deg", false, false).unwrap() - 3.0 * FRAC_PI_2).abs() < 1e-12);
        assert!((parse_angle("120deg", true, true).unwrap() - FRAC_PI_2).abs() < 1e-12);
        assert!((parse_angle("-30DEG", true, true).unwrap() + 30f64.to_radians()).abs() < 1e-12);
        assert!(matches!(
            parse_angle("12grad", false, false),
            Err(ConfigError::UnknownAngleUnit(_))
        ));
        assert!(matches!(
            parse_angle("north", false, false),
            Err(ConfigError::UnknownAngle(_))
        ));
    }

    #[test]
    fn number_is_split_from_unit() {
        assert_eq!(split_number("10rpm"), Some((10.0, "rpm")));
        assert_eq!(split_number("-1.5 rad"), Some((-1.5, " rad")));
        assert_eq!(split_number("2."), Some((2.0, "")));
        assert_eq!(split_number(".5deg"), None);
        assert_eq!(split_number("rpm"), None);
    }

    #[test]
    fn duration_from_speed() {
        let ms = speed_to_duration("1rps", PI).unwrap();
        assert!((ms - 500.0).abs() < 1e-9);
    }
}
