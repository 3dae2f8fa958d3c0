//! Propagation of single-track PID systematics to a decay candidate.

use std::fmt;

use crate::data::histogram::{Histogram1D, Histogram2D};
use crate::data::model::{Detector, Species, TrackPidInfo};

use super::calibration::{CalibrationSet, Tier};
use super::strategy::PidStrategy;

/// Detector probabilities at or below this are treated as "no PID".
pub const MIN_PROBABILITY: f64 = 1e-20;

/// Value reported by [`PidUncertainty::legacy_value`] for missing track data.
pub const MISSING_TRACK_SENTINEL: f64 = -999.0;

// ---------------------------------------------------------------------------
// Result type
// ---------------------------------------------------------------------------

/// Why a daughter made the candidate undeterminable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingReason {
    /// The daughter track is not present in the event.
    TrackAbsent,
    /// The daughter track has a negative MC label.
    Unmatched,
    /// The MC label points outside the truth collection.
    TruthParticleMissing,
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingReason::TrackAbsent => write!(f, "daughter-particle track not found"),
            MissingReason::Unmatched => write!(f, "daughter track not matched to a generated particle"),
            MissingReason::TruthParticleMissing => write!(f, "daughter particle not found"),
        }
    }
}

/// Outcome of the PID systematic propagation for one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PidUncertainty {
    /// Relative systematic uncertainty (strictly positive).
    Value(f64),
    /// A daughter could not be resolved; no value can be computed.
    MissingTrackData { daughter: usize, reason: MissingReason },
    /// No daughter had a usable detector probability.
    NoUsablePid,
}

impl PidUncertainty {
    pub fn value(self) -> Option<f64> {
        match self {
            PidUncertainty::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Single-number encoding: the value, `-999` for missing data, `0` when
    /// no PID probability was usable.
    pub fn legacy_value(self) -> f64 {
        match self {
            PidUncertainty::Value(v) => v,
            PidUncertainty::MissingTrackData { .. } => MISSING_TRACK_SENTINEL,
            PidUncertainty::NoUsablePid => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Bin lookup
// ---------------------------------------------------------------------------

/// Absolute systematic and efficiency of a single track in momentum bin `bin`.
///
/// In-range bins are read directly. Bins at or past the last bin read the
/// last bin. Bins at or below the first bin read the efficiency of the first
/// bin, but the systematic ratio of the *last* bin.
pub fn single_track_syst_and_prob(
    syst_ratio: &Histogram1D,
    efficiency: &Histogram1D,
    bin: usize,
) -> (f64, f64) {
    let bin_max = syst_ratio.n_bins();
    let bin_min = 1;
    let (ratio_bin, eff_bin) = if bin > bin_min && bin < bin_max {
        (bin, bin)
    } else if bin >= bin_max {
        (bin_max, bin_max)
    } else {
        // TODO: confirm with the calibration authors whether the ratio should
        // be read from bin_min here as well.
        (bin_max, bin_min)
    };
    let prob = efficiency.bin_content(eff_bin);
    let syst = (1.0 - syst_ratio.bin_content(ratio_bin)).abs() * prob;
    (syst, prob)
}

// ---------------------------------------------------------------------------
// Combiner
// ---------------------------------------------------------------------------

/// Per-detector inputs of one track.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct DetectorTerms {
    syst_tpc: f64,
    prob_tpc: f64,
    syst_tof: f64,
    prob_tof: f64,
}

/// Combines single-track PID systematics into a candidate systematic.
#[derive(Debug, Clone, Copy)]
pub struct PidSystCombiner<'a> {
    calibration: &'a CalibrationSet,
}

impl<'a> PidSystCombiner<'a> {
    pub fn new(calibration: &'a CalibrationSet) -> Self {
        PidSystCombiner { calibration }
    }

    pub fn strategy(&self) -> PidStrategy {
        self.calibration.settings().strategy
    }

    /// Systematic uncertainty on the PID efficiency of a candidate with
    /// transverse momentum `pt_candidate`.
    ///
    /// Each resolved daughter fills `(pt_candidate, pt_daughter)` into
    /// `pt_daughter_vs_candidate`, contributing or not. The first unresolved
    /// daughter aborts the candidate.
    pub fn candidate_uncertainty(
        &self,
        daughters: &[Option<TrackPidInfo>],
        pt_candidate: f64,
        pt_daughter_vs_candidate: &mut Histogram2D,
    ) -> PidUncertainty {
        let mut syst = 0.0;

        for (i, daughter) in daughters.iter().enumerate() {
            let track = match check_daughter(daughter.as_ref()) {
                Ok(t) => t,
                Err(reason) => {
                    log::warn!("{reason} (daughter {i})");
                    return PidUncertainty::MissingTrackData {
                        daughter: i,
                        reason,
                    };
                }
            };

            syst += self.track_contribution(track);
            pt_daughter_vs_candidate.fill(pt_candidate, track.pt);
        }

        let syst = syst.abs();
        if syst == 0.0 {
            PidUncertainty::NoUsablePid
        } else {
            PidUncertainty::Value(syst)
        }
    }

    /// Contribution of one resolved track to the candidate systematic.
    pub fn track_contribution(&self, track: &TrackPidInfo) -> f64 {
        let terms = match track.pdg_code.and_then(Species::from_pdg) {
            Some(species) => self.detector_terms(species, track),
            None => DetectorTerms::default(),
        };
        let DetectorTerms {
            syst_tpc,
            prob_tpc,
            syst_tof,
            prob_tof,
        } = terms;

        if self.strategy().is_or_combination() {
            let prob_or = prob_tpc + prob_tof - prob_tpc * prob_tof;
            if prob_or > MIN_PROBABILITY {
                let var = (1.0 - prob_tpc).powi(2) * syst_tof.powi(2)
                    + (1.0 - prob_tof).powi(2) * syst_tpc.powi(2);
                return var.sqrt() / prob_or;
            }
        } else {
            let prob_and = prob_tpc * prob_tof;
            if prob_and > MIN_PROBABILITY {
                let var = prob_tpc.powi(2) * syst_tof.powi(2) + prob_tof.powi(2) * syst_tpc.powi(2);
                return var.sqrt() / prob_and;
            }
        }
        0.0
    }

    fn detector_terms(&self, species: Species, track: &TrackPidInfo) -> DetectorTerms {
        let bin = self.calibration.binning_reference().find_bin(track.pt);
        let lookup = |detector: Detector, tier: Tier| {
            self.calibration
                .get(species, detector, tier)
                .map(|pair| single_track_syst_and_prob(&pair.syst_ratio, &pair.efficiency, bin))
                .unwrap_or((0.0, 0.0))
        };

        let tpc = |tier| lookup(Detector::Tpc, tier);
        let tof = || lookup(Detector::Tof, Tier::Nominal);
        let none = (0.0, 0.0);

        let ((syst_tpc, prob_tpc), (syst_tof, prob_tof)) = match self.strategy() {
            PidStrategy::Conservative => (
                if track.tpc_ok { tpc(Tier::Nominal) } else { none },
                if track.tof_ok { tof() } else { none },
            ),
            PidStrategy::Strong => {
                if track.tof_ok {
                    let tpc_terms = if track.tpc_ok { tpc(Tier::Nominal) } else { none };
                    (tpc_terms, tof())
                } else if track.tpc_ok {
                    // 2-sigma TPC-only selection when TOF is missing
                    (tpc(Tier::Tight), none)
                } else {
                    (none, none)
                }
            }
            PidStrategy::NSigma(_) => {
                if track.tpc_ok && track.tof_ok {
                    (tpc(Tier::Nominal), tof())
                } else {
                    (none, none)
                }
            }
        };

        DetectorTerms {
            syst_tpc,
            prob_tpc,
            syst_tof,
            prob_tof,
        }
    }
}

fn check_daughter(daughter: Option<&TrackPidInfo>) -> Result<&TrackPidInfo, MissingReason> {
    let track = daughter.ok_or(MissingReason::TrackAbsent)?;
    if track.label < 0 {
        return Err(MissingReason::Unmatched);
    }
    if track.pdg_code.is_none() {
        return Err(MissingReason::TruthParticleMissing);
    }
    Ok(track)
}
