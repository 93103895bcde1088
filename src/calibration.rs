//! Confidence Calibrator
//!
//! Turns the winning category's share of the combined score into the
//! percentage reported to callers. A uniform smoothing term is added before
//! clamping so identical messages do not always report identical numbers;
//! seeding the generator makes the sequence reproducible.

use crate::error::{ClassifyError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub floor: f64,
    pub ceiling: f64,
    /// Smoothing is drawn from `[0, jitter)`.
    pub jitter: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            floor: 65.0,
            ceiling: 99.0,
            jitter: 15.0,
            seed: None,
        }
    }
}

impl CalibrationConfig {
    /// Bounds must be finite with `floor <= ceiling`; jitter must be finite
    /// and non-negative.
    pub fn validate(&self) -> Result<()> {
        if !self.floor.is_finite() || !self.ceiling.is_finite() {
            return Err(ClassifyError::InvalidConfig(
                "calibration floor and ceiling must be finite numbers".to_string(),
            ));
        }
        if self.floor > self.ceiling {
            return Err(ClassifyError::InvalidConfig(format!(
                "calibration floor {} is above ceiling {}",
                self.floor, self.ceiling
            )));
        }
        if !(self.jitter.is_finite() && self.jitter >= 0.0) {
            return Err(ClassifyError::InvalidConfig(format!(
                "calibration jitter must be a non-negative number, got {}",
                self.jitter
            )));
        }
        Ok(())
    }
}

pub struct ConfidenceCalibrator {
    config: CalibrationConfig,
    rng: Mutex<StdRng>,
}

impl ConfidenceCalibrator {
    pub fn new(config: CalibrationConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            config,
            rng: Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Winning score as a percentage of the combined total. The divisor is
    /// floored at 1 so a message with no matches yields 0.
    pub fn raw_share(winning_score: u32, combined_total: u32) -> f64 {
        winning_score as f64 / combined_total.max(1) as f64 * 100.0
    }

    /// Calibrate with a freshly drawn smoothing term.
    pub fn calibrate(&self, winning_score: u32, combined_total: u32) -> f64 {
        let smoothing = self.draw_smoothing();
        self.calibrate_with(winning_score, combined_total, smoothing)
    }

    /// Calibrate with an explicit smoothing term.
    pub fn calibrate_with(&self, winning_score: u32, combined_total: u32, smoothing: f64) -> f64 {
        let raw = Self::raw_share(winning_score, combined_total);
        let clamped = (raw + smoothing).clamp(self.config.floor, self.config.ceiling);
        round_tenth(clamped)
    }

    fn draw_smoothing(&self) -> f64 {
        if self.config.jitter == 0.0 {
            return 0.0;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random_range(0.0..self.config.jitter)
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> ConfidenceCalibrator {
        ConfidenceCalibrator::new(CalibrationConfig {
            seed: Some(seed),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_raw_share() {
        assert_eq!(ConfidenceCalibrator::raw_share(0, 0), 0.0);
        assert_eq!(ConfidenceCalibrator::raw_share(100, 100), 100.0);
        assert_eq!(ConfidenceCalibrator::raw_share(75, 150), 50.0);
    }

    #[test]
    fn test_zero_matches_reports_the_floor() {
        let calibrator = seeded(1);
        assert_eq!(calibrator.calibrate_with(0, 0, 0.0), 65.0);
        assert_eq!(calibrator.calibrate_with(0, 0, 14.9), 65.0);
    }

    #[test]
    fn test_clamped_to_ceiling() {
        let calibrator = seeded(1);
        assert_eq!(calibrator.calibrate_with(100, 100, 0.0), 99.0);
    }

    #[test]
    fn test_rounds_to_one_decimal() {
        let calibrator = seeded(1);
        // 75 / 115 = 65.217...
        assert_eq!(calibrator.calibrate_with(75, 115, 0.0), 65.2);
        assert_eq!(calibrator.calibrate_with(75, 115, 10.0), 75.2);
    }

    #[test]
    fn test_seeded_calibrators_agree() {
        let a = seeded(42);
        let b = seeded(42);
        for _ in 0..20 {
            assert_eq!(a.calibrate(75, 115), b.calibrate(75, 115));
        }
    }

    #[test]
    fn test_always_within_bounds() {
        let calibrator = ConfidenceCalibrator::new(CalibrationConfig::default()).unwrap();
        for (winning, total) in [(0, 0), (20, 20), (75, 115), (40, 75), (100, 100)] {
            for _ in 0..200 {
                let confidence = calibrator.calibrate(winning, total);
                assert!((65.0..=99.0).contains(&confidence), "{confidence}");
            }
        }
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let calibrator = ConfidenceCalibrator::new(CalibrationConfig {
            jitter: 0.0,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(calibrator.calibrate(80, 100), 80.0);
    }

    #[test]
    fn test_unusable_settings_are_rejected() {
        let cases = [
            CalibrationConfig {
                floor: 99.0,
                ceiling: 65.0,
                ..Default::default()
            },
            CalibrationConfig {
                floor: f64::NAN,
                ..Default::default()
            },
            CalibrationConfig {
                ceiling: f64::INFINITY,
                ..Default::default()
            },
            CalibrationConfig {
                jitter: -1.0,
                ..Default::default()
            },
            CalibrationConfig {
                jitter: f64::NAN,
                ..Default::default()
            },
            CalibrationConfig {
                jitter: f64::INFINITY,
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(
                matches!(
                    ConfidenceCalibrator::new(config.clone()),
                    Err(ClassifyError::InvalidConfig(_))
                ),
                "{config:?}"
            );
        }
    }

    #[test]
    fn test_equal_bounds_are_allowed() {
        let calibrator = ConfidenceCalibrator::new(CalibrationConfig {
            floor: 80.0,
            ceiling: 80.0,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(calibrator.calibrate(0, 0), 80.0);
    }
}
