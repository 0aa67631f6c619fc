// adapter.rs — texture <-> spherical coordinate conversion for the loaded panorama

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use log::warn;
use serde::Deserialize;

use crate::error::{Result, ViewerError};
use crate::state::Position;

/// Pixel position inside the (possibly cropped) panorama image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureCoords {
    pub x: f64,
    pub y: f64,
}

/// Partial pano data supplied along with an image; missing fields are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PanoDataHint {
    pub full_width: Option<u32>,
    pub full_height: Option<u32>,
    pub cropped_x: Option<i64>,
    pub cropped_y: Option<i64>,
    pub pose_heading: Option<f64>,
    pub pose_pitch: Option<f64>,
    pub pose_roll: Option<f64>,
}

/// Placement of the image inside the full 2:1 sphere texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanoData {
    pub full_width: u32,
    pub full_height: u32,
    pub cropped_width: u32,
    pub cropped_height: u32,
    pub cropped_x: u32,
    pub cropped_y: u32,
    pub pose_heading: f64,
    pub pose_pitch: f64,
    pub pose_roll: f64,
}

impl PanoData {
    /// Completes `hint` for an image of `width` x `height`, fixing inconsistent values.
    pub fn merge(width: u32, height: u32, hint: Option<&PanoDataHint>) -> Self {
        let hint = hint.copied().unwrap_or_default();
        let (width_i, height_i) = (width as i64, height as i64);

        let (mut full_width, mut full_height) = match (hint.full_width, hint.full_height) {
            (Some(w), Some(h)) => (w as i64, h as i64),
            (Some(w), None) => (w as i64, (w as f64 / 2.0).round() as i64),
            (None, Some(h)) => (h as i64 * 2, h as i64),
            (None, None) => {
                let w = width_i.max(height_i * 2);
                (w, (w as f64 / 2.0).round() as i64)
            }
        };
        let mut cropped_x = hint
            .cropped_x
            .unwrap_or_else(|| ((full_width - width_i) as f64 / 2.0).round() as i64);
        let mut cropped_y = hint
            .cropped_y
            .unwrap_or_else(|| ((full_height - height_i) as f64 / 2.0).round() as i64);

        if (full_width - full_height * 2).abs() > 1 {
            warn!("invalid pano data, fullWidth should be twice fullHeight");
            full_height = (full_width as f64 / 2.0).round() as i64;
        }
        if cropped_x + width_i > full_width {
            warn!("invalid pano data, croppedX + croppedWidth > fullWidth");
            cropped_x = full_width - width_i;
        }
        if cropped_y + height_i > full_height {
            warn!("invalid pano data, croppedY + croppedHeight > fullHeight");
            cropped_y = full_height - height_i;
        }
        if cropped_x < 0 {
            warn!("invalid pano data, croppedX < 0");
            cropped_x = 0;
        }
        if cropped_y < 0 {
            warn!("invalid pano data, croppedY < 0");
            cropped_y = 0;
        }
        full_width = full_width.max(width_i);
        full_height = full_height.max(height_i);

        PanoData {
            full_width: full_width as u32,
            full_height: full_height as u32,
            cropped_width: width,
            cropped_height: height,
            cropped_x: cropped_x as u32,
            cropped_y: cropped_y as u32,
            pose_heading: hint.pose_heading.unwrap_or(0.0),
            pose_pitch: hint.pose_pitch.unwrap_or(0.0),
            pose_roll: hint.pose_roll.unwrap_or(0.0),
        }
    }

    /// True when the image covers the whole sphere.
    pub fn is_full(&self) -> bool {
        self.cropped_width == self.full_width && self.cropped_height == self.full_height
    }
}

/// Coordinate capability of a panorama adapter. The motion engine only needs these
/// conversions; mesh and texture creation stay with the renderer.
pub trait CoordinateAdapter {
    /// Whether panoramas of this kind can cross-fade.
    fn supports_transition(&self) -> bool {
        false
    }

    fn texture_coords_to_spherical(&self, _coords: TextureCoords, _data: &PanoData) -> Result<Position> {
        Err(ViewerError::NoTextureData)
    }

    fn spherical_to_texture_coords(&self, _position: Position, _data: &PanoData) -> Result<TextureCoords> {
        Err(ViewerError::NoTextureData)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EquirectangularAdapter;

impl CoordinateAdapter for EquirectangularAdapter {
    fn supports_transition(&self) -> bool {
        true
    }

    fn texture_coords_to_spherical(&self, coords: TextureCoords, data: &PanoData) -> Result<Position> {
        let relative_x = (coords.x + data.cropped_x as f64) / data.full_width as f64 * TAU;
        let relative_y = (coords.y + data.cropped_y as f64) / data.full_height as f64 * PI;

        Ok(Position {
            yaw: if relative_x >= PI {
                relative_x - PI
            } else {
                relative_x + PI
            },
            pitch: FRAC_PI_2 - relative_y,
        })
    }

    fn spherical_to_texture_coords(&self, position: Position, data: &PanoData) -> Result<TextureCoords> {
        let full_width = data.full_width as f64;
        let full_height = data.full_height as f64;
        let relative_long = position.yaw / TAU * full_width;
        let relative_lat = position.pitch / PI * full_height;

        let x = if position.yaw < PI {
            relative_long + full_width / 2.0
        } else {
            relative_long - full_width / 2.0
        };
        let x = x.round() - data.cropped_x as f64;
        let y = (full_height / 2.0 - relative_lat).round() - data.cropped_y as f64;

        if x < 0.0 || x > data.cropped_width as f64 || y < 0.0 || y > data.cropped_height as f64 {
            return Err(ViewerError::InvalidTextureCoords);
        }
        Ok(TextureCoords { x, y })
    }
}
