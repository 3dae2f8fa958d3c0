use std::fmt;

use serde::{Deserialize, Serialize};

/// How per-detector PID probabilities are merged for a track.
///
/// * `Conservative` – TPC 3σ OR TOF 3σ.
/// * `Strong` – TPC 3σ OR TOF 3σ when TOF is available, TPC 2σ otherwise.
/// * `NSigma(n)` – TPC nσ AND TOF nσ.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PidStrategy {
    #[default]
    Conservative,
    Strong,
    NSigma(f64),
}

impl PidStrategy {
    /// Whether the strategy merges detectors as an OR (as opposed to AND).
    pub fn is_or_combination(self) -> bool {
        !matches!(self, PidStrategy::NSigma(_))
    }
}

impl fmt::Display for PidStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PidStrategy::Conservative => write!(f, "conservative"),
            PidStrategy::Strong => write!(f, "strong"),
            PidStrategy::NSigma(n) => write!(f, "{n:.0}-sigma"),
        }
    }
}

/// Which tagged sample provides the kaon TPC curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KaonTpcTag {
    #[default]
    TofTag,
    KinkTag,
}

/// Which curves stand in for the kaon TOF response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KaonTofTag {
    TpcTag,
    /// Reuse the V0-tagged pion TOF curves.
    #[default]
    SamePionV0Tag,
}

/// Everything that decides which calibration curves are needed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidSettings {
    #[serde(default)]
    pub strategy: PidStrategy,
    #[serde(default)]
    pub kaon_tpc_tag: KaonTpcTag,
    #[serde(default)]
    pub kaon_tof_tag: KaonTofTag,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_conservative() {
        assert_eq!(PidStrategy::default(), PidStrategy::Conservative);
        let settings: PidSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.strategy, PidStrategy::Conservative);
        assert!(settings.strategy.is_or_combination());
        assert!(!PidStrategy::NSigma(3.0).is_or_combination());
    }
}
