use std::fmt;

use thiserror::Error;

/// Curve-loading steps, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    StoreUnavailable,
    PionTpc,
    KaonTpc,
    PionTof,
    KaonTof,
    PionTpcTight,
    KaonTpcTight,
    NSigmaPionTpc,
    NSigmaKaonTpc,
    NSigmaPionTof,
    NSigmaKaonTof,
}

impl LoadStage {
    /// Numeric failure code (1..=11) for log messages.
    pub fn code(self) -> u8 {
        match self {
            LoadStage::StoreUnavailable => 1,
            LoadStage::PionTpc => 2,
            LoadStage::KaonTpc => 3,
            LoadStage::PionTof => 4,
            LoadStage::KaonTof => 5,
            LoadStage::PionTpcTight => 6,
            LoadStage::KaonTpcTight => 7,
            LoadStage::NSigmaPionTpc => 8,
            LoadStage::NSigmaKaonTpc => 9,
            LoadStage::NSigmaPionTof => 10,
            LoadStage::NSigmaKaonTof => 11,
        }
    }
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            LoadStage::StoreUnavailable => "calibration store",
            LoadStage::PionTpc => "pion TPC curves",
            LoadStage::KaonTpc => "kaon TPC curves",
            LoadStage::PionTof => "pion TOF curves",
            LoadStage::KaonTof => "kaon TOF curves",
            LoadStage::PionTpcTight => "pion TPC 2-sigma curves",
            LoadStage::KaonTpcTight => "kaon TPC 2-sigma curves",
            LoadStage::NSigmaPionTpc => "n-sigma pion TPC curves",
            LoadStage::NSigmaKaonTpc => "n-sigma kaon TPC curves",
            LoadStage::NSigmaPionTof => "n-sigma pion TOF curves",
            LoadStage::NSigmaKaonTof => "n-sigma kaon TOF curves",
        };
        write!(f, "{what} (code {})", self.code())
    }
}

/// Fatal calibration problems detected before any candidate is processed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("unable to load {stage}: missing '{missing}'")]
    Load { stage: LoadStage, missing: String },

    #[error("curve '{curve}' does not share the binning of '{reference}'")]
    InconsistentBinning { curve: String, reference: String },
}

impl CalibrationError {
    pub fn stage(&self) -> Option<LoadStage> {
        match self {
            CalibrationError::Load { stage, .. } => Some(*stage),
            CalibrationError::InconsistentBinning { .. } => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("the decay channel must be one of D0toKpi, DplustoKpipi, DstoKKpi, DstartoKpipi (got '{0}')")]
    InvalidDecayChannel(String),

    #[error("the number of sigmas must be positive and finite (got {0})")]
    InvalidNSigma(f64),

    #[error("AOD protection must be -1, 0 or 1 (got {0})")]
    InvalidAodProtection(i32),

    #[error("invalid pT bin limits: {0}")]
    InvalidPtLimits(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("selection result index {0} out of range")]
pub struct IndexError(pub i64);
