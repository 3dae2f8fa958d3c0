use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::data::histogram::{Axis, Histogram2D};
use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Event counter
// ---------------------------------------------------------------------------

/// Named bins of the event-count histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventCategory {
    EventsRead,
    MatchedDeltaAod,
    MismatchedDeltaAod,
    EventsAnalysed,
    PassingEventSelection,
    RejectedTrigger,
    RejectedNotRecoVertex,
    RejectedVertexContributors,
    RejectedVertexOutOfAcceptance,
    RejectedPileup,
    OutOfCentrality,
    Candidates,
    AfterPidCuts,
    NotRefilled,
}

impl EventCategory {
    pub const ALL: [EventCategory; 14] = [
        EventCategory::EventsRead,
        EventCategory::MatchedDeltaAod,
        EventCategory::MismatchedDeltaAod,
        EventCategory::EventsAnalysed,
        EventCategory::PassingEventSelection,
        EventCategory::RejectedTrigger,
        EventCategory::RejectedNotRecoVertex,
        EventCategory::RejectedVertexContributors,
        EventCategory::RejectedVertexOutOfAcceptance,
        EventCategory::RejectedPileup,
        EventCategory::OutOfCentrality,
        EventCategory::Candidates,
        EventCategory::AfterPidCuts,
        EventCategory::NotRefilled,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EventCategory::EventsRead => "nEventsRead",
            EventCategory::MatchedDeltaAod => "nEvents Matched dAOD",
            EventCategory::MismatchedDeltaAod => "nEvents Mismatched dAOD",
            EventCategory::EventsAnalysed => "nEventsAnal",
            EventCategory::PassingEventSelection => "n. passing IsEvSelected",
            EventCategory::RejectedTrigger => "n. rejected due to trigger",
            EventCategory::RejectedNotRecoVertex => "n. rejected due to not reco vertex",
            EventCategory::RejectedVertexContributors => "n. rejected for contr vertex",
            EventCategory::RejectedVertexOutOfAcceptance => "n. rejected for vertex out of accept",
            EventCategory::RejectedPileup => "n. rejected for pileup events",
            EventCategory::OutOfCentrality => "no. of out centrality events",
            EventCategory::Candidates => "no. of D candidates",
            EventCategory::AfterPidCuts => "no. of D after PID cuts",
            EventCategory::NotRefilled => "no. of not on-the-fly rec D",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Labelled counts, one per [`EventCategory`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCounter {
    counts: [u64; 14],
}

#[derive(Serialize)]
struct LabelledCount {
    label: &'static str,
    count: u64,
}

impl Serialize for EventCounter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(EventCategory::ALL.iter().map(|&c| LabelledCount {
            label: c.label(),
            count: self.get(c),
        }))
    }
}

impl EventCounter {
    pub fn count(&mut self, category: EventCategory) {
        self.counts[category.index()] += 1;
    }

    pub fn get(&self, category: EventCategory) -> u64 {
        self.counts[category.index()]
    }
}

// ---------------------------------------------------------------------------
// Task output
// ---------------------------------------------------------------------------

/// Histograms produced by one processing pass.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    pub events: EventCounter,
    /// D pT × relative PID systematic.
    pub syst_pid_eff: Histogram2D,
    /// D pT × daughter pT, filled once per resolved daughter.
    pub pt_daughter_vs_d: Histogram2D,
}

/// Highest pT covered by the output histograms.
const MAX_PT: f64 = 100.0;

impl TaskOutput {
    /// Book the output histograms for the analysis pT limits. The last limit
    /// is capped at 100 GeV/c.
    pub fn new(pt_bin_limits: &[f64]) -> Result<Self, ConfigError> {
        let mut limits = pt_bin_limits.to_vec();
        if let Some(last) = limits.last_mut() {
            if *last > MAX_PT {
                *last = MAX_PT;
            }
        }
        let pt_axis = Axis::from_edges(limits.clone())
            .ok_or_else(|| ConfigError::InvalidPtLimits(format!("{limits:?}")))?;
        let pt_max = pt_axis.high();
        // 100 MeV/c bins over [0, pt_max]
        let n_fine = ((pt_max * 10.0) as usize).max(1);
        let fine_axis = || {
            Axis::uniform(n_fine, 0.0, pt_max)
                .ok_or_else(|| ConfigError::InvalidPtLimits(format!("upper limit {pt_max} must be positive")))
        };
        let syst_axis = Axis::uniform(150, 0.0, 0.15)
            .ok_or_else(|| ConfigError::InvalidPtLimits("systematic axis".into()))?;

        Ok(TaskOutput {
            events: EventCounter::default(),
            syst_pid_eff: Histogram2D::new(
                "fHistSystPIDEffD",
                "PID efficiency systematic uncertainty; pT D (GeV/c); relative systematic uncertainty",
                pt_axis,
                syst_axis,
            ),
            pt_daughter_vs_d: Histogram2D::new(
                "fHistPtDauVsD",
                "pT Dau vs pT D; pT D (GeV/c); pT daugh (GeV/c)",
                fine_axis()?,
                fine_axis()?,
            ),
        })
    }

    /// Write all histograms as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating output file {}", path.display()))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)
            .context("writing output histograms")?;
        log::info!("Wrote output histograms to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_serializes_with_labels() {
        let mut counter = EventCounter::default();
        counter.count(EventCategory::EventsRead);
        counter.count(EventCategory::EventsRead);
        counter.count(EventCategory::NotRefilled);
        let json = serde_json::to_value(&counter).unwrap();
        let bins = json.as_array().unwrap();
        assert_eq!(bins.len(), 14);
        assert_eq!(bins[0]["label"], "nEventsRead");
        assert_eq!(bins[0]["count"], 2);
        assert_eq!(bins[13]["label"], "no. of not on-the-fly rec D");
        assert_eq!(bins[13]["count"], 1);
    }

    #[test]
    fn books_histograms_from_limits() {
        let out = TaskOutput::new(&[1.0, 2.0, 4.0, 8.0, 24.0]).unwrap();
        assert_eq!(out.syst_pid_eff.x_axis().n_bins(), 4);
        assert_eq!(out.syst_pid_eff.y_axis().n_bins(), 150);
        assert_eq!(out.pt_daughter_vs_d.x_axis().n_bins(), 240);
        assert_eq!(out.pt_daughter_vs_d.y_axis().high(), 24.0);
    }

    #[test]
    fn caps_last_limit() {
        let out = TaskOutput::new(&[0.0, 50.0, 999.0]).unwrap();
        assert_eq!(out.syst_pid_eff.x_axis().high(), 100.0);
        assert_eq!(out.pt_daughter_vs_d.x_axis().n_bins(), 1000);
    }

    #[test]
    fn rejects_bad_limits() {
        assert!(TaskOutput::new(&[3.0]).is_err());
        assert!(TaskOutput::new(&[3.0, 1.0]).is_err());
    }
}
