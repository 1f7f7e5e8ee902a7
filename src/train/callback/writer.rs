//! Base capability shared by all metric writers

use super::traits::TrainerCallback;
use crate::error::{Result, WriterError};
use crate::train::handle::TrainerHandle;

/// Image in `[channels, height, width]` layout with 8-bit samples
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
    channels: usize,
    height: usize,
    width: usize,
}

impl Image {
    /// Wrap raw CHW bytes, checking the length against the dimensions
    pub fn new(data: Vec<u8>, channels: usize, height: usize, width: usize) -> Result<Self> {
        let expected = channels
            .checked_mul(height)
            .and_then(|n| n.checked_mul(width))
            .ok_or(WriterError::ImageShape { expected: usize::MAX, actual: data.len() })?;
        if !matches!(channels, 1 | 3 | 4) || data.len() != expected {
            return Err(WriterError::ImageShape { expected, actual: data.len() });
        }
        Ok(Self { data, channels, height, width })
    }

    /// Build from samples in `[0, 1]`, clamping out-of-range values
    pub fn from_unit_floats(
        samples: &[f32],
        channels: usize,
        height: usize,
        width: usize,
    ) -> Result<Self> {
        let data = samples
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        Self::new(data, channels, height, width)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// `[channels, height, width]`
    pub fn dims(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Row-major interleaved RGB bytes (`[height, width, 3]`)
    ///
    /// Grayscale is replicated into all three channels; alpha is dropped.
    pub fn to_rgb(&self) -> Vec<u8> {
        let plane = self.height * self.width;
        let source = |c: usize| if self.channels == 1 { 0 } else { c * plane };
        let mut rgb = Vec::with_capacity(plane * 3);
        for pixel in 0..plane {
            for c in 0..3 {
                rgb.push(self.data[source(c) + pixel]);
            }
        }
        rgb
    }
}

/// Callback that records scalar and image metrics to some sink
///
/// `add_scalar`/`add_image` apply the master-only gate and forward to the
/// `write_*` hooks, which do nothing unless overridden.
pub trait Writer: TrainerCallback {
    /// Host state this writer reads counters and rank from
    fn handle(&self) -> &TrainerHandle;

    /// Restrict recording to the primary process
    fn master_only(&self) -> bool {
        false
    }

    /// Record a scalar, subject to the master-only gate
    fn add_scalar(&mut self, name: &str, value: f64) {
        if self.handle().is_master() || !self.master_only() {
            self.write_scalar(name, value);
        }
    }

    /// Record an image, subject to the master-only gate
    fn add_image(&mut self, name: &str, image: &Image) {
        if self.handle().is_master() || !self.master_only() {
            self.write_image(name, image);
        }
    }

    fn write_scalar(&mut self, _name: &str, _value: f64) {}

    fn write_image(&mut self, _name: &str, _image: &Image) {}
}
