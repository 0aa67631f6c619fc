// easing.rs — progress remapping curves used by animations

use std::f64::consts::PI;

use serde::Deserialize;

/// Maps a normalized progress `t` in `[0, 1]` to an eased progress.
///
/// Named curves deserialize from their camelCase name (`"inOutSine"`).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    #[default]
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InQuart,
    OutQuart,
    InOutQuart,
    InQuint,
    OutQuint,
    InOutQuint,
    InSine,
    OutSine,
    InOutSine,
    InExpo,
    OutExpo,
    InOutExpo,
    InCirc,
    OutCirc,
    InOutCirc,
    #[serde(skip)]
    Custom(fn(f64) -> f64),
}

/// `Custom` curves compare by function address, which is best-effort: the same
/// function may get distinct addresses across codegen units.
impl PartialEq for Easing {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Easing::Custom(a), Easing::Custom(b)) => std::ptr::fn_addr_eq(*a, *b),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl Easing {
    pub const NAMED: [(&'static str, Easing); 22] = [
        ("linear", Easing::Linear),
        ("inQuad", Easing::InQuad),
        ("outQuad", Easing::OutQuad),
        ("inOutQuad", Easing::InOutQuad),
        ("inCubic", Easing::InCubic),
        ("outCubic", Easing::OutCubic),
        ("inOutCubic", Easing::InOutCubic),
        ("inQuart", Easing::InQuart),
        ("outQuart", Easing::OutQuart),
        ("inOutQuart", Easing::InOutQuart),
        ("inQuint", Easing::InQuint),
        ("outQuint", Easing::OutQuint),
        ("inOutQuint", Easing::InOutQuint),
        ("inSine", Easing::InSine),
        ("outSine", Easing::OutSine),
        ("inOutSine", Easing::InOutSine),
        ("inExpo", Easing::InExpo),
        ("outExpo", Easing::OutExpo),
        ("inOutExpo", Easing::InOutExpo),
        ("inCirc", Easing::InCirc),
        ("outCirc", Easing::OutCirc),
        ("inOutCirc", Easing::InOutCirc),
    ];

    pub fn from_name(name: &str) -> Option<Easing> {
        Self::NAMED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, easing)| *easing)
    }

    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::InQuad => t * t,
            Easing::OutQuad => t * (2.0 - t),
            Easing::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::InCubic => t * t * t,
            Easing::OutCubic => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Easing::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    (t - 1.0) * (2.0 * t - 2.0) * (2.0 * t - 2.0) + 1.0
                }
            }
            Easing::InQuart => t * t * t * t,
            Easing::OutQuart => {
                let u = t - 1.0;
                1.0 - u * u * u * u
            }
            Easing::InOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    let u = t - 1.0;
                    1.0 - 8.0 * u * u * u * u
                }
            }
            Easing::InQuint => t * t * t * t * t,
            Easing::OutQuint => {
                let u = t - 1.0;
                1.0 + u * u * u * u * u
            }
            Easing::InOutQuint => {
                if t < 0.5 {
                    16.0 * t * t * t * t * t
                } else {
                    let u = t - 1.0;
                    1.0 + 16.0 * u * u * u * u * u
                }
            }
            Easing::InSine => 1.0 - (t * PI / 2.0).cos(),
            Easing::OutSine => (t * PI / 2.0).sin(),
            Easing::InOutSine => 0.5 - 0.5 * (PI * t).cos(),
            Easing::InExpo => 2f64.powf(10.0 * (t - 1.0)),
            Easing::OutExpo => 1.0 - 2f64.powf(-10.0 * t),
            Easing::InOutExpo => {
                let u = t * 2.0 - 1.0;
                if u < 0.0 {
                    0.5 * 2f64.powf(10.0 * u)
                } else {
                    1.0 - 0.5 * 2f64.powf(-10.0 * u)
                }
            }
            Easing::InCirc => 1.0 - (1.0 - t * t).sqrt(),
            Easing::OutCirc => (1.0 - (t - 1.0) * (t - 1.0)).sqrt(),
            Easing::InOutCirc => {
                let u = t * 2.0;
                if u < 1.0 {
                    0.5 - 0.5 * (1.0 - u * u).sqrt()
                } else {
                    let v = u - 2.0;
                    0.5 + 0.5 * (1.0 - v * v).sqrt()
                }
            }
            Easing::Custom(f) => f(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_curves_hit_endpoints() {
        for (name, easing) in Easing::NAMED {
            assert!(easing.apply(0.0).abs() < 1e-3, "{name} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-3, "{name} at 1");
        }
    }

    #[test]
    fn in_out_curves_are_symmetric_at_half() {
        for name in ["inOutQuad", "inOutCubic", "inOutQuart", "inOutSine", "inOutCirc"] {
            let easing = Easing::from_name(name).unwrap();
            assert!((easing.apply(0.5) - 0.5).abs() < 1e-9, "{name}");
        }
    }

    #[test]
    fn lookup_by_name() {
        assert!(matches!(Easing::from_name("outCubic"), Some(Easing::OutCubic)));
        assert!(Easing::from_name("bounce").is_none());
    }

    #[test]
    fn custom_function() {
        let easing = Easing::Custom(|t| t.sqrt());
        assert_eq!(easing.apply(0.25), 0.5);
    }

    #[test]
    fn defaults_to_linear_and_compares_custom_by_function() {
        fn half(t: f64) -> f64 {
            t / 2.0
        }
        fn double(t: f64) -> f64 {
            t * 2.0
        }
        assert_eq!(Easing::default(), Easing::Linear);
        assert_eq!(Easing::Custom(half), Easing::Custom(half));
        assert_ne!(Easing::Custom(half), Easing::Custom(double));
        assert_ne!(Easing::Custom(half), Easing::Linear);
    }

    #[test]
    fn deserializes_from_camel_case() {
        let easing: Easing = serde_json::from_str("\"inOutSine\"").unwrap();
        assert!(matches!(easing, Easing::InOutSine));
    }
}
