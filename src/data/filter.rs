use crate::config::TaskConfig;

use super::model::{DecayCandidate, EventRecord};

// ---------------------------------------------------------------------------
// Analysis cuts: the selection object the task consults
// ---------------------------------------------------------------------------

/// Cut object consulted by the task for event and candidate decisions.
///
/// The event and PID verdicts themselves are produced upstream and carried
/// by the records; implementations decide how to read them.
pub trait AnalysisCuts {
    /// pT bin limits of the analysis (at least two, ascending).
    fn pt_bin_limits(&self) -> &[f64];

    /// Maximum |z| of the generated primary vertex.
    fn max_vtx_z(&self) -> f64;

    fn uses_centrality(&self) -> bool;

    fn is_in_fiducial_acceptance(&self, pt: f64, rapidity: f64) -> bool;

    /// Whether the event passed the upstream event selection.
    fn is_event_selected(&self, event: &EventRecord) -> bool {
        event.selection.selected
    }

    /// PID selection code of a candidate; `0` means rejected.
    fn is_selected_pid(&self, candidate: &DecayCandidate) -> i32 {
        candidate.kinematics().pid_selection
    }
}

/// Cuts configured from the task configuration: a flat rapidity window for
/// the fiducial acceptance and the recorded upstream verdicts.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardCuts {
    pt_bin_limits: Vec<f64>,
    max_rapidity: f64,
    max_vtx_z: f64,
    use_centrality: bool,
}

impl StandardCuts {
    pub fn new(pt_bin_limits: Vec<f64>, max_rapidity: f64, max_vtx_z: f64) -> Self {
        StandardCuts {
            pt_bin_limits,
            max_rapidity,
            max_vtx_z,
            use_centrality: false,
        }
    }

    pub fn with_centrality(mut self, use_centrality: bool) -> Self {
        self.use_centrality = use_centrality;
        self
    }

    pub fn from_config(config: &TaskConfig) -> Self {
        StandardCuts::new(
            config.pt_bin_limits.clone(),
            config.fiducial_max_rapidity,
            config.max_vtx_z,
        )
        .with_centrality(config.use_centrality)
    }
}

impl AnalysisCuts for StandardCuts {
    fn pt_bin_limits(&self) -> &[f64] {
        &self.pt_bin_limits
    }

    fn max_vtx_z(&self) -> f64 {
        self.max_vtx_z
    }

    fn uses_centrality(&self) -> bool {
        self.use_centrality
    }

    fn is_in_fiducial_acceptance(&self, _pt: f64, rapidity: f64) -> bool {
        rapidity.abs() < self.max_rapidity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecayChannel;
    use crate::data::model::{CandidateKinematics, ProngCandidate};

    #[test]
    fn fiducial_window_is_open() {
        let cuts = StandardCuts::new(vec![1.0, 2.0], 0.8, 10.0);
        assert!(cuts.is_in_fiducial_acceptance(3.0, 0.79));
        assert!(cuts.is_in_fiducial_acceptance(3.0, -0.5));
        assert!(!cuts.is_in_fiducial_acceptance(3.0, 0.8));
        assert!(!cuts.is_in_fiducial_acceptance(3.0, -1.2));
    }

    #[test]
    fn from_config_copies_limits() {
        let mut config = TaskConfig::new(DecayChannel::D0toKpi, "x.json", vec![1.0, 2.0, 5.0]);
        config.use_centrality = true;
        let cuts = StandardCuts::from_config(&config);
        assert_eq!(cuts.pt_bin_limits(), &[1.0, 2.0, 5.0]);
        assert!(cuts.uses_centrality());
        assert_eq!(cuts.max_vtx_z(), 10.0);
    }

    #[test]
    fn pid_code_is_read_from_candidate() {
        let cuts = StandardCuts::new(vec![1.0, 2.0], 0.8, 10.0);
        let candidate = DecayCandidate::TwoProng(ProngCandidate {
            kinematics: CandidateKinematics {
                pt: 2.0,
                rapidity: 0.0,
                refilled: true,
                pid_selection: 3,
                mc_label: None,
                origin: None,
            },
            daughters: Vec::new(),
        });
        assert_eq!(cuts.is_selected_pid(&candidate), 3);
    }
}
