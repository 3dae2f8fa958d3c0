use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Particle species and detectors
// ---------------------------------------------------------------------------

pub const PDG_PION: i32 = 211;
pub const PDG_KAON: i32 = 321;

/// Species for which single-track PID calibrations exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Species {
    Pion,
    Kaon,
}

impl Species {
    /// Map a (signed) PDG code to a calibrated species.
    pub fn from_pdg(pdg: i32) -> Option<Self> {
        match pdg.abs() {
            PDG_PION => Some(Species::Pion),
            PDG_KAON => Some(Species::Kaon),
            _ => None,
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Species::Pion => write!(f, "Pion"),
            Species::Kaon => write!(f, "Kaon"),
        }
    }
}

/// PID detector subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Detector {
    Tpc,
    Tof,
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Detector::Tpc => write!(f, "TPC"),
            Detector::Tof => write!(f, "TOF"),
        }
    }
}

/// Detector PID status as reported by the PID response service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetPidStatus {
    #[default]
    NoSignal,
    Ok,
    Mismatch,
    NoParams,
}

impl DetPidStatus {
    pub fn is_ok(self) -> bool {
        self == DetPidStatus::Ok
    }
}

// ---------------------------------------------------------------------------
// Tracks and truth particles
// ---------------------------------------------------------------------------

/// A reconstructed daughter track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// MC label; negative when the track is not matched to a generated particle.
    pub label: i64,
    pub pt: f64,
    #[serde(default)]
    pub tpc_status: DetPidStatus,
    #[serde(default)]
    pub tof_status: DetPidStatus,
}

/// A generated particle from the MC truth collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McParticle {
    pub pdg_code: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McHeader {
    pub vtx_z: f64,
}

/// Per-track input of the PID combiner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPidInfo {
    pub label: i64,
    /// Truth PDG code; `None` when the truth particle could not be found.
    pub pdg_code: Option<i32>,
    pub pt: f64,
    pub tpc_ok: bool,
    pub tof_ok: bool,
}

impl TrackPidInfo {
    /// Resolve a track against the truth collection (looked up by |label|).
    pub fn resolve(track: &TrackRecord, mc_particles: &[McParticle]) -> Self {
        let pdg_code = usize::try_from(track.label.unsigned_abs())
            .ok()
            .and_then(|idx| mc_particles.get(idx))
            .map(|p| p.pdg_code);
        TrackPidInfo {
            label: track.label,
            pdg_code,
            pt: track.pt,
            tpc_ok: track.tpc_status.is_ok(),
            tof_ok: track.tof_status.is_ok(),
        }
    }
}

// ---------------------------------------------------------------------------
// Decay candidates
// ---------------------------------------------------------------------------

/// Generation origin of a matched candidate as classified upstream.
/// Ordered so that `>= Charm` selects prompt and feed-down candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Unknown,
    Charm,
    Beauty,
}

/// Fields shared by every candidate kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateKinematics {
    pub pt: f64,
    pub rapidity: f64,
    /// Whether the stripped candidate information could be refilled.
    #[serde(default = "default_true")]
    pub refilled: bool,
    /// Return code of the external PID selection (0 = rejected).
    #[serde(default)]
    pub pid_selection: i32,
    /// Index of the matched generated D meson, if any.
    #[serde(default)]
    pub mc_label: Option<usize>,
    #[serde(default)]
    pub origin: Option<Origin>,
}

fn default_true() -> bool {
    true
}

/// Two- or three-prong candidate: daughters are stored directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProngCandidate {
    #[serde(flatten)]
    pub kinematics: CandidateKinematics,
    /// `None` entries stand for daughter tracks that are missing in the event.
    pub daughters: Vec<Option<TrackRecord>>,
}

/// D* → D0 π cascade. PID daughters are those of the D0 prong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeCandidate {
    #[serde(flatten)]
    pub kinematics: CandidateKinematics,
    #[serde(default)]
    pub d0: Option<Vec<Option<TrackRecord>>>,
    #[serde(default = "default_true")]
    pub has_secondary_vertex: bool,
}

/// A reconstructed decay candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecayCandidate {
    ThreeProng(ProngCandidate),
    TwoProng(ProngCandidate),
    Cascade(CascadeCandidate),
}

/// Candidate layout expected by a decay channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    ThreeProng,
    TwoProng,
    Cascade,
}

impl DecayCandidate {
    pub fn kind(&self) -> CandidateKind {
        match self {
            DecayCandidate::ThreeProng(_) => CandidateKind::ThreeProng,
            DecayCandidate::TwoProng(_) => CandidateKind::TwoProng,
            DecayCandidate::Cascade(_) => CandidateKind::Cascade,
        }
    }

    pub fn kinematics(&self) -> &CandidateKinematics {
        match self {
            DecayCandidate::ThreeProng(c) | DecayCandidate::TwoProng(c) => &c.kinematics,
            DecayCandidate::Cascade(c) => &c.kinematics,
        }
    }

    /// Tracks whose PID enters the systematic. `None` when a cascade has no
    /// D0 prong attached.
    pub fn pid_daughters(&self) -> Option<&[Option<TrackRecord>]> {
        match self {
            DecayCandidate::ThreeProng(c) | DecayCandidate::TwoProng(c) => Some(&c.daughters),
            DecayCandidate::Cascade(c) => c.d0.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Verdicts of the external event selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSelection {
    pub selected: bool,
    pub rejected_trigger: bool,
    pub rejected_not_reco_vertex: bool,
    pub rejected_vertex_contributors: bool,
    pub rejected_z_vertex_outside_fiducial: bool,
    pub rejected_pileup: bool,
    pub rejected_centrality: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub z: f64,
}

/// One event as delivered by the event source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub run_number: i32,
    #[serde(default = "default_trigger_mask")]
    pub trigger_mask: u64,
    /// AOD/deltaAOD matching level: <0 mismatch, 0 TProcessID mismatch, 1 matched.
    #[serde(default = "default_matching_level")]
    pub aod_matching_level: i32,
    #[serde(default)]
    pub primary_vertex: Option<Vertex>,
    #[serde(default)]
    pub magnetic_field: f64,
    #[serde(default)]
    pub selection: EventSelection,
    /// Candidate collections keyed by branch name.
    #[serde(default)]
    pub branches: BTreeMap<String, Vec<DecayCandidate>>,
    #[serde(default)]
    pub mc_particles: Option<Vec<McParticle>>,
    #[serde(default)]
    pub mc_header: Option<McHeader>,
}

fn default_trigger_mask() -> u64 {
    1
}

fn default_matching_level() -> i32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn species_from_signed_pdg() {
        assert_eq!(Species::from_pdg(-211), Some(Species::Pion));
        assert_eq!(Species::from_pdg(321), Some(Species::Kaon));
        assert_eq!(Species::from_pdg(2212), None);
    }

    #[test]
    fn resolve_uses_absolute_label() {
        let particles = vec![
            McParticle { pdg_code: 11 },
            McParticle { pdg_code: -321 },
        ];
        let track = TrackRecord {
            label: -1,
            pt: 1.2,
            tpc_status: DetPidStatus::Ok,
            tof_status: DetPidStatus::Mismatch,
        };
        let info = TrackPidInfo::resolve(&track, &particles);
        assert_eq!(info.label, -1);
        assert_eq!(info.pdg_code, Some(-321));
        assert!(info.tpc_ok);
        assert!(!info.tof_ok);

        let far = TrackRecord { label: 7, ..track };
        assert_eq!(TrackPidInfo::resolve(&far, &particles).pdg_code, None);
    }

    #[test]
    fn candidate_json_is_tagged() {
        let json = r#"{
            "kind": "cascade",
            "pt": 4.0,
            "rapidity": 0.1,
            "pid_selection": 1,
            "d0": [null, {"label": 3, "pt": 1.0, "tpc_status": "ok"}]
        }"#;
        let cand: DecayCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(cand.kind(), CandidateKind::Cascade);
        assert!(cand.kinematics().refilled);
        let daughters = cand.pid_daughters().unwrap();
        assert!(daughters[0].is_none());
        assert_eq!(daughters[1].as_ref().unwrap().tof_status, DetPidStatus::NoSignal);
    }
}
