//! Motion gate
//!
//! Compares two frames on a sparse pixel grid so recognition only runs when
//! the picture actually changed.

use serde::{Deserialize, Serialize};

use crate::capture::frame::{Frame, BYTES_PER_PIXEL};

/// Motion gate tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MotionConfig {
    /// Visit every Nth pixel
    pub sample_stride: usize,
    /// Minimum |dr|+|dg|+|db| for a sampled pixel to count as changed
    pub pixel_threshold: u32,
    /// Fraction of changed samples above which the frame counts as motion
    pub min_changed_fraction: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            sample_stride: 10,
            pixel_threshold: 30,
            min_changed_fraction: 0.01,
        }
    }
}

/// Raw counts behind a motion decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionScore {
    pub sampled: usize,
    pub changed: usize,
}

impl MotionScore {
    pub fn changed_fraction(&self) -> f32 {
        if self.sampled == 0 {
            0.0
        } else {
            self.changed as f32 / self.sampled as f32
        }
    }
}

/// Count sampled and changed pixels between two frames
///
/// Only the pixels present in both buffers are visited.
pub fn motion_score(current: &Frame, previous: &Frame, config: &MotionConfig) -> MotionScore {
    let stride = config.sample_stride.max(1);
    let pixels = current.pixel_count().min(previous.pixel_count());
    let (a, b) = (current.data(), previous.data());

    let mut score = MotionScore::default();
    for pixel in (0..pixels).step_by(stride) {
        let i = pixel * BYTES_PER_PIXEL;
        let diff = a[i].abs_diff(b[i]) as u32
            + a[i + 1].abs_diff(b[i + 1]) as u32
            + a[i + 2].abs_diff(b[i + 2]) as u32;

        score.sampled += 1;
        if diff > config.pixel_threshold {
            score.changed += 1;
        }
    }
    score
}

/// Whether `current` differs enough from `previous` to be worth recognizing
///
/// The first frame of a run (no previous) always counts as motion.
pub fn has_motion(current: &Frame, previous: Option<&Frame>, config: &MotionConfig) -> bool {
    match previous {
        None => true,
        Some(previous) => {
            motion_score(current, previous, config).changed_fraction() > config.min_changed_fraction
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32, offset: u8) -> Frame {
        let mut data = Vec::with_capacity((width * height) as usize * 4);
        for i in 0..(width * height) {
            let v = (i % 200) as u8;
            data.extend_from_slice(&[v.wrapping_add(offset), v, v, 255]);
        }
        Frame::new(data, width, height)
    }

    #[test]
    fn test_first_frame_is_motion() {
        let config = MotionConfig::default();
        assert!(has_motion(&Frame::solid(8, 8, [0, 0, 0, 255]), None, &config));
        assert!(has_motion(&Frame::new(Vec::new(), 0, 0), None, &config));
    }

    #[test]
    fn test_identical_frames_have_no_motion() {
        let config = MotionConfig::default();
        let a = gradient(64, 48, 0);
        let b = a.clone();
        let score = motion_score(&a, &b, &config);
        assert_eq!(score.changed, 0);
        assert!(!has_motion(&a, Some(&b), &config));
    }

    #[test]
    fn test_fully_changed_frames_have_motion() {
        let config = MotionConfig::default();
        let black = Frame::solid(40, 30, [0, 0, 0, 255]);
        let white = Frame::solid(40, 30, [255, 255, 255, 255]);
        let score = motion_score(&white, &black, &config);
        assert_eq!(score.changed, score.sampled);
        assert!(has_motion(&white, Some(&black), &config));
    }

    #[test]
    fn test_small_difference_below_pixel_threshold() {
        let config = MotionConfig::default();
        // 10 per channel sums to exactly 30, which is not above the threshold
        let a = Frame::solid(20, 20, [100, 100, 100, 255]);
        let b = Frame::solid(20, 20, [110, 110, 110, 255]);
        assert!(!has_motion(&a, Some(&b), &config));
    }

    #[test]
    fn test_alpha_channel_is_ignored() {
        let config = MotionConfig::default();
        let a = Frame::solid(20, 20, [50, 50, 50, 0]);
        let b = Frame::solid(20, 20, [50, 50, 50, 255]);
        assert!(!has_motion(&a, Some(&b), &config));
    }

    #[test]
    fn test_stride_controls_sample_count() {
        let config = MotionConfig {
            sample_stride: 10,
            ..Default::default()
        };
        let a = Frame::solid(10, 10, [0, 0, 0, 255]);
        let score = motion_score(&a, &a, &config);
        assert_eq!(score.sampled, 10);

        let zero_stride = MotionConfig {
            sample_stride: 0,
            ..Default::default()
        };
        assert_eq!(motion_score(&a, &a, &zero_stride).sampled, 100);
    }

    #[test]
    fn test_changed_fraction_must_exceed_minimum() {
        let config = MotionConfig {
            sample_stride: 1,
            ..Default::default()
        };
        // 100 pixels, one changed: exactly 1%, not above it
        let a = Frame::solid(10, 10, [0, 0, 0, 255]);
        let mut data = a.data().to_vec();
        data[..3].copy_from_slice(&[255, 255, 255]);
        let b = Frame::new(data.clone(), 10, 10);
        assert!(!has_motion(&b, Some(&a), &config));

        // two changed: 2%
        data[4..7].copy_from_slice(&[255, 255, 255]);
        let c = Frame::new(data, 10, 10);
        assert!(has_motion(&c, Some(&a), &config));
    }

    #[test]
    fn test_mismatched_dimensions_do_not_panic() {
        let config = MotionConfig::default();
        let small = Frame::solid(5, 5, [0, 0, 0, 255]);
        let large = Frame::solid(50, 50, [0, 0, 0, 255]);
        let score = motion_score(&large, &small, &config);
        assert_eq!(score.sampled, 3);
        assert!(!has_motion(&large, Some(&small), &config));

        let truncated = Frame::new(vec![255; 6], 2, 2);
        assert_eq!(motion_score(&truncated, &large, &config).sampled, 1);
    }

    #[test]
    fn test_empty_frames_have_no_motion() {
        let config = MotionConfig::default();
        let empty = Frame::new(Vec::new(), 0, 0);
        assert!(!has_motion(&empty, Some(&empty), &config));
    }
}
