//! Piston animation as a bounded, restartable frame sequence.
//!
//! The animation only reads precomputed displacements; it never touches the
//! physics. Frames are produced at a fixed rate and the piston sits at
//! `base_height + h[t]`. Consumers (the TUI) pace themselves with
//! [`PistonAnimation::frame_interval`].

use std::time::Duration;

use crate::domain::TimeSeries;
use crate::error::SimError;

/// One rendered step of the animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PistonFrame {
    pub index: usize,
    /// Wall-clock offset of this frame from the start of playback.
    pub elapsed: Duration,
    /// Simulated time of the underlying sample (s).
    pub sim_time: f64,
    pub displacement: f64,
    /// Piston position above the cylinder floor (m).
    pub piston_height: f64,
}

#[derive(Debug, Clone)]
pub struct PistonAnimation {
    time: Vec<f64>,
    displacement: Vec<f64>,
    fps: u32,
    base_height: f64,
    cursor: usize,
}

impl PistonAnimation {
    pub const DEFAULT_FPS: u32 = 100;
    /// Rest position of the piston above the cylinder floor (m).
    pub const BASE_HEIGHT: f64 = 0.1;

    pub fn new(displacement: &TimeSeries) -> Self {
        Self {
            time: displacement.time().to_vec(),
            displacement: displacement.values().to_vec(),
            fps: Self::DEFAULT_FPS,
            base_height: Self::BASE_HEIGHT,
            cursor: 0,
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Result<Self, SimError> {
        if fps == 0 {
            return Err(SimError::InvalidParameter {
                name: "fps",
                reason: "must be > 0".to_string(),
            });
        }
        self.fps = fps;
        Ok(self)
    }

    pub fn with_base_height(mut self, base_height: f64) -> Result<Self, SimError> {
        if !(base_height.is_finite() && base_height >= 0.0) {
            return Err(SimError::InvalidParameter {
                name: "base_height",
                reason: format!("must be finite and >= 0, got {base_height}"),
            });
        }
        self.base_height = base_height;
        Ok(self)
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps
    }

    /// Total frame count.
    pub fn len(&self) -> usize {
        self.displacement.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displacement.is_empty()
    }

    /// Index of the next frame `next()` will yield.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.len()
    }

    /// Rewind to the first frame.
    pub fn restart(&mut self) {
        self.cursor = 0;
    }

    /// Highest piston position reached, for scaling a drawing.
    pub fn max_height(&self) -> f64 {
        self.base_height + self.displacement.iter().copied().fold(0.0, f64::max)
    }

    pub fn frame(&self, index: usize) -> Option<PistonFrame> {
        let displacement = *self.displacement.get(index)?;
        Some(PistonFrame {
            index,
            elapsed: self.frame_interval() * index as u32,
            sim_time: self.time[index],
            displacement,
            piston_height: self.base_height + displacement,
        })
    }
}

impl Iterator for PistonAnimation {
    type Item = PistonFrame;

    fn next(&mut self) -> Option<PistonFrame> {
        let frame = self.frame(self.cursor)?;
        self.cursor += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.len().saturating_sub(self.cursor);
        (left, Some(left))
    }
}

impl ExactSizeIterator for PistonAnimation {}
