//! PID systematic propagation: calibration curves, strategies and the
//! per-candidate combiner.

pub mod calibration;
pub mod combiner;
pub mod strategy;

pub use calibration::{CalibrationKey, CalibrationSet, CurvePair, Tier};
pub use combiner::{single_track_syst_and_prob, MissingReason, PidSystCombiner, PidUncertainty};
pub use strategy::{KaonTofTag, KaonTpcTag, PidSettings, PidStrategy};
