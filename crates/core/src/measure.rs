//! This module provide the `Rtt` estimator.
//! It is used to assess the responsiveness of remote peers from ping round trips.
#![warn(missing_docs)]

use serde::Deserialize;
use serde::Serialize;

/// Smoothed round trip time of a peer, in milliseconds.
///
/// The estimator follows Jacobson's algorithm: the first sample seeds the average with
/// the sample and the deviation with half of it, later samples move the average by one
/// eighth of the error and the deviation by one quarter of the error's magnitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rtt {
    avg: Option<f64>,
    dev: f64,
}

impl Rtt {
    /// An estimator without samples.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one round trip sample.
    pub fn update(&mut self, sample_ms: u64) {
        let sample = sample_ms as f64;
        match self.avg {
            None => {
                self.avg = Some(sample);
                self.dev = sample / 2.0;
            }
            Some(avg) => {
                let err = sample - avg;
                self.avg = Some(avg + err / 8.0);
                self.dev += (err.abs() - self.dev) / 4.0;
            }
        }
    }

    /// Forget every sample.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Smoothed average, none before the first sample.
    pub fn avg(&self) -> Option<f64> {
        self.avg
    }

    /// Smoothed mean deviation.
    pub fn dev(&self) -> f64 {
        self.dev
    }
}
