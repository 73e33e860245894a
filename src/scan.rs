//! Polar-to-Cartesian scan conversion
//!
//! Projects one sweep of range-ordered intensity samples onto a square
//! raster. Circle mode reproduces a PPI display: azimuth 0 at the top,
//! rotating clockwise, range increasing outward from the center. Square
//! mode maps azimuth linearly onto raster columns and exists for
//! validation and debugging, not realistic display.
//!
//! Rasterization is lossy by construction: consecutive sweeps may hit
//! the same pixel and the last write wins.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::protocol::AZIMUTH_UNITS;

/// Output pixel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 3 bytes per pixel, R G B
    Rgb24,
    /// 4 bytes per pixel, R G B A
    Rgba32,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb24 => 3,
            PixelFormat::Rgba32 => 4,
        }
    }
}

/// Sweep projection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    /// PPI circle, trigonometric projection
    Circle,
    /// Diagnostic column mapping, no trigonometry
    Square,
}

/// Frame buffer one scan accumulates into.
///
/// Owned by the decode session; delivered frames carry a copy of the
/// pixel bytes so accumulation of the next scan never races a frame the
/// caller still holds.
#[derive(Debug, Clone)]
pub struct Raster {
    width: usize,
    height: usize,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl Raster {
    /// Allocate a zeroed raster
    pub fn new(width: usize, height: usize, format: PixelFormat) -> Self {
        Raster {
            width,
            height,
            format,
            pixels: vec![0; width * height * format.bytes_per_pixel()],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Zero every pixel
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Half of the smaller raster dimension: the maximum drawable range
    pub fn half_extent(&self) -> usize {
        self.width.min(self.height) / 2
    }

    /// Write one intensity sample at `(x, y)`.
    ///
    /// The intensity lands in the green channel; RGBA rasters also get
    /// an opaque alpha so written pixels are visible over a cleared
    /// (transparent) background.
    fn put_intensity(&mut self, x: i64, y: i64, value: u8) -> Result<(), DecodeError> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return Err(DecodeError::PixelOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = (y as usize * self.width + x as usize) * bpp;
        self.pixels[offset + 1] = value;
        if self.format == PixelFormat::Rgba32 {
            self.pixels[offset + 3] = 0xFF;
        }
        Ok(())
    }
}

/// Rasterize one sweep.
///
/// `samples` holds one intensity octet per range cell, nearest range
/// first. Range indices beyond the raster's half extent are dropped; a
/// raster at least twice the sample range never loses data and never
/// fails the bounds check.
pub fn draw_sweep(
    raster: &mut Raster,
    start_azimuth: u16,
    end_azimuth: u16,
    samples: &[u8],
    projection: Projection,
) -> Result<(), DecodeError> {
    match projection {
        Projection::Circle => draw_circle(raster, start_azimuth, end_azimuth, samples),
        Projection::Square => draw_square(raster, start_azimuth, samples),
    }
}

fn draw_circle(
    raster: &mut Raster,
    start_azimuth: u16,
    end_azimuth: u16,
    samples: &[u8],
) -> Result<(), DecodeError> {
    let cx = raster.width as f64 / 2.0;
    let cy = raster.height as f64 / 2.0;
    let limit = raster.half_extent().min(samples.len());
    let width = crate::protocol::sweep_width(start_azimuth, end_azimuth) as u32;

    for w in (0..=width).rev() {
        let frac =
            ((start_azimuth as u32 + w) % AZIMUTH_UNITS) as f64 / AZIMUTH_UNITS as f64;
        // Azimuth 0 up, clockwise: theta = -2*pi*frac + pi
        let theta = PI - 2.0 * PI * frac;
        let (sin_t, cos_t) = theta.sin_cos();
        for r in (0..limit).rev() {
            let x = (cx + sin_t * r as f64) as i64;
            let y = (cy + cos_t * r as f64) as i64;
            raster.put_intensity(x, y, samples[r])?;
        }
    }
    Ok(())
}

fn draw_square(raster: &mut Raster, start_azimuth: u16, samples: &[u8]) -> Result<(), DecodeError> {
    if raster.width == 0 {
        return Ok(());
    }
    let units_per_column = (AZIMUTH_UNITS as usize / raster.width).max(1);
    let column = ((start_azimuth as usize / units_per_column) % raster.width) as i64;
    let limit = raster.height.min(samples.len());

    for (r, &value) in samples.iter().take(limit).enumerate() {
        raster.put_intensity(column, r as i64, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written_pixels(raster: &Raster) -> usize {
        let bpp = raster.format().bytes_per_pixel();
        raster
            .pixels()
            .chunks_exact(bpp)
            .filter(|px| px.iter().any(|&b| b != 0))
            .count()
    }

    #[test]
    fn test_narrow_sweep_stays_in_bounds() {
        // 16-unit sweep at azimuth 0, 8 samples: must draw without any
        // bounds violation and touch pixels at or above the center row
        let mut raster = Raster::new(64, 64, PixelFormat::Rgba32);
        let samples = [200u8; 8];
        draw_sweep(&mut raster, 0x0000, 0x0010, &samples, Projection::Circle).unwrap();

        let touched = written_pixels(&raster);
        assert!(touched > 0);
        assert!(touched <= 8, "a 16/65536 turn sweep covers under 8 pixels");
        // Azimuth 0 points up from the center
        let bpp = 4;
        let (cx, cy) = (32usize, 32usize);
        for r in 1..8 {
            let offset = ((cy - r) * 64 + cx) * bpp;
            assert_eq!(raster.pixels()[offset + 1], 200, "range {} not drawn up", r);
        }
    }

    #[test]
    fn test_quarter_turn_is_clockwise() {
        let mut raster = Raster::new(64, 64, PixelFormat::Rgb24);
        // Single azimuth unit at a quarter turn: should land to the right
        draw_sweep(&mut raster, 0x4000, 0x4000, &[255u8; 16], Projection::Circle).unwrap();
        let offset = (32 * 64 + 32 + 10) * 3;
        assert_eq!(raster.pixels()[offset + 1], 255);
    }

    #[test]
    fn test_range_clamped_to_half_extent() {
        // More samples than the raster can hold radially: excess dropped
        let mut raster = Raster::new(32, 32, PixelFormat::Rgb24);
        let samples = [50u8; 500];
        draw_sweep(&mut raster, 0, 0xFFFF, &samples, Projection::Circle).unwrap();
        assert!(written_pixels(&raster) > 0);
    }

    #[test]
    fn test_square_mode_maps_column_linearly() {
        let mut raster = Raster::new(256, 256, PixelFormat::Rgb24);
        let samples = [10u8, 20, 30, 40];
        // 0x8000 / (65536/256) = column 128
        draw_sweep(&mut raster, 0x8000, 0x8010, &samples, Projection::Square).unwrap();
        for (r, expected) in samples.iter().enumerate() {
            let offset = (r * 256 + 128) * 3;
            assert_eq!(raster.pixels()[offset + 1], *expected);
        }
        assert_eq!(written_pixels(&raster), 4);
    }

    #[test]
    fn test_last_write_wins_on_overlap() {
        let mut raster = Raster::new(64, 64, PixelFormat::Rgb24);
        draw_sweep(&mut raster, 0, 0, &[11u8; 8], Projection::Circle).unwrap();
        draw_sweep(&mut raster, 0, 0, &[99u8; 8], Projection::Circle).unwrap();
        let offset = ((32 - 5) * 64 + 32) * 3;
        assert_eq!(raster.pixels()[offset + 1], 99);
    }

    #[test]
    fn test_clear_zeroes_buffer() {
        let mut raster = Raster::new(16, 16, PixelFormat::Rgba32);
        draw_sweep(&mut raster, 0, 0x100, &[255u8; 8], Projection::Circle).unwrap();
        assert!(written_pixels(&raster) > 0);
        raster.clear();
        assert!(raster.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_full_rotation_covers_ring() {
        // Contiguous sweeps over a full turn should fill a disc around
        // the center without ever going out of bounds
        let mut raster = Raster::new(64, 64, PixelFormat::Rgb24);
        let samples = [128u8; 30];
        let step = 0x1000u16;
        let mut az = 0u16;
        for _ in 0..16 {
            let end = az.wrapping_add(step);
            draw_sweep(&mut raster, az, end, &samples, Projection::Circle).unwrap();
            az = end;
        }
        assert!(written_pixels(&raster) > 500);
    }
}
