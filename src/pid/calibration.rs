//! Calibration curves for the single-track PID systematic.
//!
//! ```text
//!  HistogramStore (name → Histogram1D)
//!        │  CalibrationSet::load(store, settings)
//!        ▼
//!  CalibrationSet
//!   (species, detector, tier) → CurvePair { efficiency, syst_ratio }
//! ```
//!
//! Tier 0 is the nominal cut (3σ, or nσ for the n-sigma strategy); tier 1 is
//! the tighter 2σ TPC-only cut used by the strong strategy when TOF is absent.

use std::collections::BTreeMap;

use crate::data::histogram::Histogram1D;
use crate::data::loader::HistogramStore;
use crate::data::model::{Detector, Species};
use crate::errors::{CalibrationError, LoadStage};

use super::strategy::{KaonTofTag, KaonTpcTag, PidSettings, PidStrategy};

// ---------------------------------------------------------------------------
// Keys and curve pairs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Nominal,
    Tight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalibrationKey {
    pub species: Species,
    pub detector: Detector,
    pub tier: Tier,
}

impl CalibrationKey {
    pub fn new(species: Species, detector: Detector, tier: Tier) -> Self {
        CalibrationKey {
            species,
            detector,
            tier,
        }
    }
}

/// Efficiency and data/MC efficiency-ratio curves of one calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePair {
    pub efficiency: Histogram1D,
    pub syst_ratio: Histogram1D,
}

// ---------------------------------------------------------------------------
// Curve naming
// ---------------------------------------------------------------------------

/// Store key stems (without the `hEff` / `hRatioEff` prefix and sigma suffix).
const PION_TPC: &str = "PionTPCDataV0tag";
const KAON_TPC_TOF_TAG: &str = "KaonTPCDataTOFtag";
const KAON_TPC_KINK_TAG: &str = "KaonTPCDataKinktag";
const PION_TOF: &str = "PionTOFDataV0tag";
const KAON_TOF_TPC_TAG: &str = "KaonTOFDataTPCtag";

fn sigma_suffix(n_sigma: f64) -> String {
    format!("_{n_sigma:.0}sigma")
}

/// `(efficiency key, ratio key)` for a stem at a given sigma cut.
pub fn curve_names(stem: &str, n_sigma: f64) -> (String, String) {
    let suffix = sigma_suffix(n_sigma);
    (format!("hEff{stem}{suffix}"), format!("hRatioEff{stem}{suffix}"))
}

fn kaon_tpc_stem(tag: KaonTpcTag) -> &'static str {
    match tag {
        KaonTpcTag::TofTag => KAON_TPC_TOF_TAG,
        KaonTpcTag::KinkTag => KAON_TPC_KINK_TAG,
    }
}

fn kaon_tof_stem(tag: KaonTofTag) -> &'static str {
    match tag {
        KaonTofTag::TpcTag => KAON_TOF_TPC_TAG,
        KaonTofTag::SamePionV0Tag => PION_TOF,
    }
}

/// One curve pair to fetch and where to file it.
struct Request {
    key: CalibrationKey,
    stem: &'static str,
    n_sigma: f64,
    stage: LoadStage,
}

/// Curve pairs needed by a configuration, in loading order.
fn requests(settings: &PidSettings) -> Vec<Request> {
    use Detector::{Tof, Tpc};
    use Species::{Kaon, Pion};

    let (n_sigma, stages) = match settings.strategy {
        PidStrategy::Conservative | PidStrategy::Strong => (
            3.0,
            [
                LoadStage::PionTpc,
                LoadStage::KaonTpc,
                LoadStage::PionTof,
                LoadStage::KaonTof,
            ],
        ),
        PidStrategy::NSigma(n) => (
            n,
            [
                LoadStage::NSigmaPionTpc,
                LoadStage::NSigmaKaonTpc,
                LoadStage::NSigmaPionTof,
                LoadStage::NSigmaKaonTof,
            ],
        ),
    };

    let mut out = vec![
        Request {
            key: CalibrationKey::new(Pion, Tpc, Tier::Nominal),
            stem: PION_TPC,
            n_sigma,
            stage: stages[0],
        },
        Request {
            key: CalibrationKey::new(Kaon, Tpc, Tier::Nominal),
            stem: kaon_tpc_stem(settings.kaon_tpc_tag),
            n_sigma,
            stage: stages[1],
        },
        Request {
            key: CalibrationKey::new(Pion, Tof, Tier::Nominal),
            stem: PION_TOF,
            n_sigma,
            stage: stages[2],
        },
        Request {
            key: CalibrationKey::new(Kaon, Tof, Tier::Nominal),
            stem: kaon_tof_stem(settings.kaon_tof_tag),
            n_sigma,
            stage: stages[3],
        },
    ];

    if settings.strategy == PidStrategy::Strong {
        out.push(Request {
            key: CalibrationKey::new(Pion, Tpc, Tier::Tight),
            stem: PION_TPC,
            n_sigma: 2.0,
            stage: LoadStage::PionTpcTight,
        });
        out.push(Request {
            key: CalibrationKey::new(Kaon, Tpc, Tier::Tight),
            stem: kaon_tpc_stem(settings.kaon_tpc_tag),
            n_sigma: 2.0,
            stage: LoadStage::KaonTpcTight,
        });
    }
    out
}

// ---------------------------------------------------------------------------
// CalibrationSet
// ---------------------------------------------------------------------------

/// All curves needed by one PID configuration. Read-only after loading.
#[derive(Debug, Clone)]
pub struct CalibrationSet {
    settings: PidSettings,
    curves: BTreeMap<CalibrationKey, CurvePair>,
}

impl CalibrationSet {
    /// Fetch the curves required by `settings` from `store`.
    ///
    /// Fails on the first missing curve, reporting the loading stage, and
    /// when any curve does not share the binning of the pion TPC ratio curve.
    pub fn load(store: &HistogramStore, settings: PidSettings) -> Result<Self, CalibrationError> {
        let mut curves = BTreeMap::new();
        for req in requests(&settings) {
            let (eff_name, ratio_name) = curve_names(req.stem, req.n_sigma);
            let fetch = |name: &str| {
                store.get(name).cloned().ok_or_else(|| CalibrationError::Load {
                    stage: req.stage,
                    missing: name.to_string(),
                })
            };
            let efficiency = fetch(&eff_name)?;
            let syst_ratio = fetch(&ratio_name)?;
            log::debug!("loaded {eff_name} and {ratio_name} for {:?}", req.key);
            curves.insert(
                req.key,
                CurvePair {
                    efficiency,
                    syst_ratio,
                },
            );
        }

        let set = CalibrationSet { settings, curves };
        set.check_binning()?;
        Ok(set)
    }

    fn check_binning(&self) -> Result<(), CalibrationError> {
        let reference = self.binning_reference();
        for pair in self.curves.values() {
            for curve in [&pair.efficiency, &pair.syst_ratio] {
                if !curve.same_binning(reference) {
                    return Err(CalibrationError::InconsistentBinning {
                        curve: curve.name.clone(),
                        reference: reference.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn settings(&self) -> &PidSettings {
        &self.settings
    }

    pub fn get(&self, species: Species, detector: Detector, tier: Tier) -> Option<&CurvePair> {
        self.curves.get(&CalibrationKey::new(species, detector, tier))
    }

    /// Curve whose binning defines the momentum bin of every track.
    pub fn binning_reference(&self) -> &Histogram1D {
        // Every strategy loads the nominal pion TPC pair first.
        &self.curves[&CalibrationKey::new(Species::Pion, Detector::Tpc, Tier::Nominal)].syst_ratio
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}
