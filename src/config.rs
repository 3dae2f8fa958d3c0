use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::model::CandidateKind;
use crate::errors::ConfigError;
use crate::pid::{PidSettings, PidStrategy};

// ---------------------------------------------------------------------------
// Decay channels
// ---------------------------------------------------------------------------

/// Supported D-meson decay channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ChannelRepr", into = "String")]
pub enum DecayChannel {
    D0toKpi,
    DstartoKpipi,
    DplustoKpipi,
    DstoKKpi,
}

impl DecayChannel {
    pub fn from_code(code: i32) -> Result<Self, ConfigError> {
        match code {
            2 => Ok(DecayChannel::D0toKpi),
            21 => Ok(DecayChannel::DstartoKpipi),
            31 => Ok(DecayChannel::DplustoKpipi),
            33 => Ok(DecayChannel::DstoKKpi),
            other => Err(ConfigError::InvalidDecayChannel(other.to_string())),
        }
    }

    /// Number of tracks whose PID enters the systematic: the D0 prongs for
    /// the cascade channel.
    pub fn n_prongs(self) -> usize {
        match self {
            DecayChannel::DplustoKpipi | DecayChannel::DstoKKpi => 3,
            DecayChannel::D0toKpi | DecayChannel::DstartoKpipi => 2,
        }
    }

    pub fn particle_name(self) -> &'static str {
        match self {
            DecayChannel::D0toKpi => "D0",
            DecayChannel::DstartoKpipi => "Dstar",
            DecayChannel::DplustoKpipi => "Dplus",
            DecayChannel::DstoKKpi => "Ds",
        }
    }

    /// Name of the candidate collection in the event.
    pub fn branch_name(self) -> &'static str {
        match self {
            DecayChannel::D0toKpi => "D0toKpi",
            DecayChannel::DstartoKpipi => "Dstar",
            DecayChannel::DplustoKpipi | DecayChannel::DstoKKpi => "Charm3Prong",
        }
    }

    pub fn candidate_kind(self) -> CandidateKind {
        match self {
            DecayChannel::D0toKpi => CandidateKind::TwoProng,
            DecayChannel::DstartoKpipi => CandidateKind::Cascade,
            DecayChannel::DplustoKpipi | DecayChannel::DstoKKpi => CandidateKind::ThreeProng,
        }
    }
}

impl fmt::Display for DecayChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecayChannel::D0toKpi => "D0toKpi",
            DecayChannel::DstartoKpipi => "DstartoKpipi",
            DecayChannel::DplustoKpipi => "DplustoKpipi",
            DecayChannel::DstoKKpi => "DstoKKpi",
        };
        write!(f, "{name}")
    }
}

impl FromStr for DecayChannel {
    type Err = ConfigError;

    /// Accepts channel names (case-insensitive) or their numeric codes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i32>() {
            return DecayChannel::from_code(code);
        }
        match s.to_ascii_lowercase().as_str() {
            "d0tokpi" | "d0" => Ok(DecayChannel::D0toKpi),
            "dstartokpipi" | "dstar" => Ok(DecayChannel::DstartoKpipi),
            "dplustokpipi" | "dplus" => Ok(DecayChannel::DplustoKpipi),
            "dstokkpi" | "ds" => Ok(DecayChannel::DstoKKpi),
            _ => Err(ConfigError::InvalidDecayChannel(s.to_string())),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChannelRepr {
    Code(i32),
    Name(String),
}

impl TryFrom<ChannelRepr> for DecayChannel {
    type Error = ConfigError;

    fn try_from(repr: ChannelRepr) -> Result<Self, Self::Error> {
        match repr {
            ChannelRepr::Code(code) => DecayChannel::from_code(code),
            ChannelRepr::Name(name) => name.parse(),
        }
    }
}

impl From<DecayChannel> for String {
    fn from(channel: DecayChannel) -> Self {
        channel.to_string()
    }
}

// ---------------------------------------------------------------------------
// Task configuration
// ---------------------------------------------------------------------------

/// Run configuration. Set once, immutable while events are processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub decay_channel: DecayChannel,
    #[serde(default)]
    pub pid: PidSettings,
    /// AOD/deltaAOD protection: -1 ignore, 0 reject mismatched trees,
    /// 1 also reject mismatched process IDs.
    #[serde(default = "default_aod_protection")]
    pub aod_protection: i32,
    pub calibration_file: PathBuf,
    /// pT bin limits of the analysis cuts.
    pub pt_bin_limits: Vec<f64>,
    #[serde(default = "default_max_rapidity")]
    pub fiducial_max_rapidity: f64,
    #[serde(default = "default_max_vtx_z")]
    pub max_vtx_z: f64,
    #[serde(default)]
    pub use_centrality: bool,
}

fn default_aod_protection() -> i32 {
    1
}

fn default_max_rapidity() -> f64 {
    0.8
}

fn default_max_vtx_z() -> f64 {
    10.0
}

impl TaskConfig {
    /// Minimal configuration for a channel; everything else takes defaults.
    pub fn new(decay_channel: DecayChannel, calibration_file: impl Into<PathBuf>, pt_bin_limits: Vec<f64>) -> Self {
        TaskConfig {
            decay_channel,
            pid: PidSettings::default(),
            aod_protection: default_aod_protection(),
            calibration_file: calibration_file.into(),
            pt_bin_limits,
            fiducial_max_rapidity: default_max_rapidity(),
            max_vtx_z: default_max_vtx_z(),
            use_centrality: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let PidStrategy::NSigma(n) = self.pid.strategy {
            if !(n.is_finite() && n > 0.0) {
                return Err(ConfigError::InvalidNSigma(n));
            }
        }
        if !(-1..=1).contains(&self.aod_protection) {
            return Err(ConfigError::InvalidAodProtection(self.aod_protection));
        }
        if self.pt_bin_limits.len() < 2 {
            return Err(ConfigError::InvalidPtLimits("need at least two limits".into()));
        }
        if self.pt_bin_limits.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(ConfigError::InvalidPtLimits("limits must be strictly ascending".into()));
        }
        Ok(())
    }
}

/// Read and validate a JSON task configuration.
pub fn load_config(path: &Path) -> Result<TaskConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading configuration {}", path.display()))?;
    let config: TaskConfig = serde_json::from_str(&text).context("parsing configuration")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pid::{KaonTofTag, KaonTpcTag};

    #[test]
    fn channel_from_name_or_code() {
        assert_eq!("D0toKpi".parse::<DecayChannel>().unwrap(), DecayChannel::D0toKpi);
        assert_eq!("31".parse::<DecayChannel>().unwrap(), DecayChannel::DplustoKpipi);
        assert_eq!(DecayChannel::from_code(21).unwrap(), DecayChannel::DstartoKpipi);
        assert!(matches!(
            "Lc".parse::<DecayChannel>(),
            Err(ConfigError::InvalidDecayChannel(_))
        ));
        assert!(DecayChannel::from_code(0).is_err());
    }

    #[test]
    fn channel_properties() {
        let ds = DecayChannel::DstoKKpi;
        assert_eq!(ds.n_prongs(), 3);
        assert_eq!(ds.branch_name(), "Charm3Prong");
        assert_eq!(DecayChannel::DstartoKpipi.n_prongs(), 2);
        assert_eq!(DecayChannel::D0toKpi.candidate_kind(), CandidateKind::TwoProng);
    }

    #[test]
    fn parses_full_config() {
        let json = r#"{
            "decay_channel": 33,
            "pid": {"strategy": {"n_sigma": 2.0}, "kaon_tpc_tag": "kink_tag", "kaon_tof_tag": "tpc_tag"},
            "aod_protection": 0,
            "calibration_file": "syst.parquet",
            "pt_bin_limits": [1.0, 2.0, 4.0, 24.0]
        }"#;
        let config: TaskConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.decay_channel, DecayChannel::DstoKKpi);
        assert_eq!(config.pid.strategy, PidStrategy::NSigma(2.0));
        assert_eq!(config.pid.kaon_tpc_tag, KaonTpcTag::KinkTag);
        assert_eq!(config.pid.kaon_tof_tag, KaonTofTag::TpcTag);
        assert_eq!(config.fiducial_max_rapidity, 0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_channel_is_rejected_at_parse_time() {
        let json = r#"{"decay_channel": "LctopKpi", "calibration_file": "x.json", "pt_bin_limits": [0, 1]}"#;
        assert!(serde_json::from_str::<TaskConfig>(json).is_err());
    }

    #[test]
    fn validation() {
        let mut config = TaskConfig::new(DecayChannel::D0toKpi, "x.json", vec![0.0, 1.0]);
        assert!(config.validate().is_ok());
        config.pid.strategy = PidStrategy::NSigma(0.0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidNSigma(0.0)));
        config.pid.strategy = PidStrategy::Strong;
        config.aod_protection = 2;
        assert_eq!(config.validate(), Err(ConfigError::InvalidAodProtection(2)));
        config.aod_protection = -1;
        config.pt_bin_limits = vec![2.0, 1.0];
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPtLimits(_))));
    }
}
