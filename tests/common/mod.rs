#![allow(dead_code)]

use dmeson_pid_syst::data::histogram::{Axis, Histogram1D, Histogram2D};
use dmeson_pid_syst::data::loader::HistogramStore;
use dmeson_pid_syst::data::model::{
    CandidateKinematics, DecayCandidate, DetPidStatus, EventRecord, EventSelection, McHeader,
    McParticle, Origin, ProngCandidate, TrackPidInfo, TrackRecord, Vertex,
};
use dmeson_pid_syst::pid::calibration::curve_names;

pub const EDGES: [f64; 6] = [0.0, 0.5, 1.0, 2.0, 4.0, 8.0];

pub const STEMS: [&str; 5] = [
    "PionTPCDataV0tag",
    "KaonTPCDataTOFtag",
    "KaonTPCDataKinktag",
    "PionTOFDataV0tag",
    "KaonTOFDataTPCtag",
];

/// Absolute systematic and efficiency of one detector, uniform in pT.
#[derive(Debug, Clone, Copy)]
pub struct Terms {
    pub syst: f64,
    pub prob: f64,
}

pub fn flat(name: &str, value: f64) -> Histogram1D {
    Histogram1D::new(name, EDGES.to_vec(), vec![value; EDGES.len() - 1]).unwrap()
}

/// Store holding every curve at 2, 3 and 4 sigma. TPC curves use `tpc`
/// (or `tight_tpc` at 2 sigma), TOF curves use `tof`.
pub fn uniform_store(tpc: Terms, tight_tpc: Terms, tof: Terms) -> HistogramStore {
    let mut store = HistogramStore::default();
    for stem in STEMS {
        for n_sigma in [2.0, 3.0, 4.0] {
            let terms = if stem.contains("TOFData") {
                tof
            } else if n_sigma == 2.0 {
                tight_tpc
            } else {
                tpc
            };
            let (eff_name, ratio_name) = curve_names(stem, n_sigma);
            store.insert(flat(&eff_name, terms.prob));
            store.insert(flat(&ratio_name, 1.0 - terms.syst / terms.prob));
        }
    }
    store
}

pub fn diagnostic_histogram() -> Histogram2D {
    Histogram2D::new(
        "diag",
        "",
        Axis::uniform(240, 0.0, 24.0).unwrap(),
        Axis::uniform(240, 0.0, 24.0).unwrap(),
    )
}

pub fn track(label: i64, pdg_code: i32, pt: f64, tpc_ok: bool, tof_ok: bool) -> TrackPidInfo {
    TrackPidInfo {
        label,
        pdg_code: Some(pdg_code),
        pt,
        tpc_ok,
        tof_ok,
    }
}

/// OR-combined contribution of one track.
pub fn or_contribution(tpc: Terms, tof: Terms) -> f64 {
    let prob_or = tpc.prob + tof.prob - tpc.prob * tof.prob;
    ((1.0 - tpc.prob).powi(2) * tof.syst.powi(2) + (1.0 - tof.prob).powi(2) * tpc.syst.powi(2)).sqrt()
        / prob_or
}

/// Write the same curves as [`uniform_store`] in the JSON store format.
pub fn write_json_store(path: &std::path::Path, tpc: Terms, tight_tpc: Terms, tof: Terms) {
    let records: Vec<serde_json::Value> = uniform_store(tpc, tight_tpc, tof)
        .names()
        .map(|name| {
            let value = if name.starts_with("hEff") {
                terms_for(name, tpc, tight_tpc, tof).prob
            } else {
                let t = terms_for(name, tpc, tight_tpc, tof);
                1.0 - t.syst / t.prob
            };
            serde_json::json!({
                "name": name,
                "bin_edges": EDGES,
                "contents": vec![value; EDGES.len() - 1],
            })
        })
        .collect();
    std::fs::write(path, serde_json::to_string(&records).unwrap()).unwrap();
}

fn terms_for(name: &str, tpc: Terms, tight_tpc: Terms, tof: Terms) -> Terms {
    if name.contains("TOFData") {
        tof
    } else if name.ends_with("_2sigma") {
        tight_tpc
    } else {
        tpc
    }
}

// ---------------------------------------------------------------------------
// Event builders
// ---------------------------------------------------------------------------

pub fn track_record(label: i64, pt: f64) -> TrackRecord {
    TrackRecord {
        label,
        pt,
        tpc_status: DetPidStatus::Ok,
        tof_status: DetPidStatus::Ok,
    }
}

/// Matched, PID-selected, prompt D0 candidate whose daughters are truth
/// particles 0 (kaon) and 1 (pion).
pub fn d0_candidate(pt: f64) -> ProngCandidate {
    ProngCandidate {
        kinematics: CandidateKinematics {
            pt,
            rapidity: 0.1,
            refilled: true,
            pid_selection: 3,
            mc_label: Some(7),
            origin: Some(Origin::Charm),
        },
        daughters: vec![Some(track_record(0, 1.0)), Some(track_record(1, 0.8))],
    }
}

/// Selected event holding `candidates` in the `branch` collection.
pub fn event(branch: &str, candidates: Vec<DecayCandidate>) -> EventRecord {
    let mut branches = std::collections::BTreeMap::new();
    branches.insert(branch.to_string(), candidates);
    EventRecord {
        run_number: 265309,
        trigger_mask: 1,
        aod_matching_level: 1,
        primary_vertex: Some(Vertex { z: 1.0 }),
        magnetic_field: -0.5,
        selection: EventSelection {
            selected: true,
            ..EventSelection::default()
        },
        branches,
        mc_particles: Some(vec![McParticle { pdg_code: -321 }, McParticle { pdg_code: 211 }]),
        mc_header: Some(McHeader { vtx_z: 2.0 }),
    }
}
