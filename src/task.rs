use anyhow::{Context, Result};

use crate::config::TaskConfig;
use crate::data::filter::{AnalysisCuts, StandardCuts};
use crate::data::loader::{load_histograms, HistogramStore};
use crate::data::model::{DecayCandidate, EventRecord, McParticle, Origin, TrackPidInfo};
use crate::errors::{CalibrationError, LoadStage};
use crate::output::{EventCategory, TaskOutput};
use crate::pid::{CalibrationSet, PidSystCombiner, PidUncertainty};

/// Runs in which events with an empty trigger mask are dropped.
const EMPTY_TRIGGER_MASK_RUNS: std::ops::RangeInclusive<i32> = 195344..=195677;

/// Minimum |B| (T) for an event to be analysed.
const MIN_MAGNETIC_FIELD: f64 = 0.001;

// ---------------------------------------------------------------------------
// Analysis task
// ---------------------------------------------------------------------------

/// Propagates single-track PID systematics to the D-meson candidates of
/// each event and accumulates the results.
pub struct PidSystTask<C: AnalysisCuts = StandardCuts> {
    config: TaskConfig,
    cuts: C,
    calibration: CalibrationSet,
    output: TaskOutput,
}

/// Why an event stopped before its candidates were looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSkip {
    MismatchedDeltaAod,
    MissingCandidateBranch,
    NoVertexOrField,
    MissingMcParticles,
    MissingMcHeader,
    EmptyTriggerMask,
    OutOfCentrality,
    McVertexOutside,
    NotSelected,
}

impl PidSystTask<StandardCuts> {
    /// Build the task from a configuration, reading the calibration file it
    /// names. Any missing calibration curve is fatal.
    pub fn from_config(config: TaskConfig) -> Result<Self> {
        config.validate()?;
        let store = load_histograms(&config.calibration_file).map_err(|e| {
            e.context(CalibrationError::Load {
                stage: LoadStage::StoreUnavailable,
                missing: config.calibration_file.display().to_string(),
            })
        })?;
        let cuts = StandardCuts::from_config(&config);
        PidSystTask::with_store(config, cuts, &store)
    }
}

impl<C: AnalysisCuts> PidSystTask<C> {
    /// Build the task from an already-loaded calibration store.
    pub fn with_store(config: TaskConfig, cuts: C, store: &HistogramStore) -> Result<Self> {
        let calibration = CalibrationSet::load(store, config.pid)
            .context("Impossible to load single track systematic file, check if it is correct")?;
        let output = TaskOutput::new(cuts.pt_bin_limits())?;
        log::info!(
            "{} task: {} PID strategy, {} calibration curve pairs",
            config.decay_channel.particle_name(),
            config.pid.strategy,
            calibration.len()
        );
        Ok(PidSystTask {
            config,
            cuts,
            calibration,
            output,
        })
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn calibration(&self) -> &CalibrationSet {
        &self.calibration
    }

    pub fn output(&self) -> &TaskOutput {
        &self.output
    }

    pub fn into_output(self) -> TaskOutput {
        self.output
    }

    /// Process every event of a pass.
    pub fn process_events<'e>(&mut self, events: impl IntoIterator<Item = &'e EventRecord>) {
        for event in events {
            if let Err(skip) = self.process_event(event) {
                log::debug!("event in run {} skipped: {skip:?}", event.run_number);
            }
        }
    }

    /// Process one event. Returns the reason if it was skipped as a whole.
    pub fn process_event(&mut self, event: &EventRecord) -> Result<(), EventSkip> {
        let counter = &mut self.output.events;
        counter.count(EventCategory::EventsRead);

        if self.config.aod_protection >= 0 {
            let level = event.aod_matching_level;
            if level < 0 || (level == 0 && self.config.aod_protection == 1) {
                counter.count(EventCategory::MismatchedDeltaAod);
                return Err(EventSkip::MismatchedDeltaAod);
            }
            counter.count(EventCategory::MatchedDeltaAod);
        }

        let channel = self.config.decay_channel;
        let Some(candidates) = event.branches.get(channel.branch_name()) else {
            log::error!("Could not find array of HF vertices '{}'", channel.branch_name());
            return Err(EventSkip::MissingCandidateBranch);
        };

        if event.primary_vertex.is_none() || event.magnetic_field.abs() < MIN_MAGNETIC_FIELD {
            log::debug!("The event was skipped due to missing vertex or magnetic field issue");
            return Err(EventSkip::NoVertexOrField);
        }
        counter.count(EventCategory::EventsAnalysed);

        let sel = &event.selection;
        for (rejected, category) in [
            (sel.rejected_trigger, EventCategory::RejectedTrigger),
            (sel.rejected_not_reco_vertex, EventCategory::RejectedNotRecoVertex),
            (sel.rejected_vertex_contributors, EventCategory::RejectedVertexContributors),
            (sel.rejected_z_vertex_outside_fiducial, EventCategory::RejectedVertexOutOfAcceptance),
            (sel.rejected_pileup, EventCategory::RejectedPileup),
            (sel.rejected_centrality, EventCategory::OutOfCentrality),
        ] {
            if rejected {
                counter.count(category);
            }
        }

        let Some(mc_particles) = event.mc_particles.as_deref() else {
            log::error!("MC particles branch not found");
            return Err(EventSkip::MissingMcParticles);
        };
        let Some(mc_header) = event.mc_header.as_ref() else {
            log::error!("MC header branch not found");
            return Err(EventSkip::MissingMcHeader);
        };

        if event.trigger_mask == 0 && EMPTY_TRIGGER_MASK_RUNS.contains(&event.run_number) {
            return Err(EventSkip::EmptyTriggerMask);
        }
        if self.cuts.uses_centrality() && sel.rejected_centrality {
            return Err(EventSkip::OutOfCentrality);
        }
        if mc_header.vtx_z.abs() > self.cuts.max_vtx_z() {
            return Err(EventSkip::McVertexOutside);
        }
        if !self.cuts.is_event_selected(event) {
            return Err(EventSkip::NotSelected);
        }
        counter.count(EventCategory::PassingEventSelection);

        for candidate in candidates {
            self.process_candidate(candidate, mc_particles);
        }
        Ok(())
    }

    fn process_candidate(&mut self, candidate: &DecayCandidate, mc_particles: &[McParticle]) {
        let channel = self.config.decay_channel;
        if candidate.kind() != channel.candidate_kind() {
            log::warn!(
                "Skipping {:?} candidate in the {} collection",
                candidate.kind(),
                channel.branch_name()
            );
            return;
        }

        let kin = candidate.kinematics();
        if !kin.refilled {
            self.output.events.count(EventCategory::NotRefilled);
            return;
        }
        if let DecayCandidate::Cascade(cascade) = candidate {
            if !cascade.has_secondary_vertex {
                return;
            }
        }
        self.output.events.count(EventCategory::Candidates);

        if !self.cuts.is_in_fiducial_acceptance(kin.pt, kin.rapidity) {
            return;
        }
        if self.cuts.is_selected_pid(candidate) == 0 {
            return;
        }
        self.output.events.count(EventCategory::AfterPidCuts);

        if kin.mc_label.is_none() {
            return;
        }
        if kin.origin.map_or(true, |o| o < Origin::Charm) {
            return;
        }

        let Some(daughters) = candidate.pid_daughters() else {
            return;
        };
        if daughters.len() != channel.n_prongs() {
            log::warn!(
                "{} candidate with {} PID daughters, expected {}",
                channel.particle_name(),
                daughters.len(),
                channel.n_prongs()
            );
            return;
        }
        let tracks: Vec<Option<TrackPidInfo>> = daughters
            .iter()
            .map(|d| d.as_ref().map(|t| TrackPidInfo::resolve(t, mc_particles)))
            .collect();

        let combiner = PidSystCombiner::new(&self.calibration);
        match combiner.candidate_uncertainty(&tracks, kin.pt, &mut self.output.pt_daughter_vs_d) {
            PidUncertainty::Value(syst) => self.output.syst_pid_eff.fill(kin.pt, syst),
            PidUncertainty::NoUsablePid => {
                log::debug!("No usable PID probability for candidate with pT {:.2}", kin.pt)
            }
            PidUncertainty::MissingTrackData { .. } => {}
        }
    }
}
