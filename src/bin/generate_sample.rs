use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use dmeson_pid_syst::data::model::{
    CandidateKinematics, DecayCandidate, DetPidStatus, EventRecord, EventSelection, McHeader,
    McParticle, Origin, ProngCandidate, TrackRecord, Vertex, PDG_KAON, PDG_PION,
};
use dmeson_pid_syst::pid::calibration::curve_names;
use dmeson_pid_syst::{DecayChannel, TaskConfig};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    fn status(&mut self, p_ok: f64) -> DetPidStatus {
        if self.next_f64() < p_ok {
            DetPidStatus::Ok
        } else {
            DetPidStatus::NoSignal
        }
    }
}

/// Efficiency plateau rising from `low` to `high` with pT.
fn efficiency_curve(centres: &[f64], low: f64, high: f64) -> Vec<f64> {
    centres
        .iter()
        .map(|&pt| high - (high - low) * (-pt / 1.5).exp())
        .collect()
}

/// Data/MC ratio wobbling around one by a few percent.
fn ratio_curve(centres: &[f64], amplitude: f64, rng: &mut SimpleRng) -> Vec<f64> {
    centres
        .iter()
        .map(|_| 1.0 + rng.uniform(-amplitude, amplitude))
        .collect()
}

fn write_calibration(path: &str, rng: &mut SimpleRng) -> usize {
    let edges: Vec<f64> = vec![0.0, 0.3, 0.5, 0.7, 1.0, 1.5, 2.0, 3.0, 4.0, 6.0, 10.0, 20.0];
    let centres: Vec<f64> = edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();

    let stems = [
        ("PionTPCDataV0tag", 0.80, 0.97, 0.02),
        ("KaonTPCDataTOFtag", 0.70, 0.95, 0.04),
        ("KaonTPCDataKinktag", 0.65, 0.93, 0.05),
        ("PionTOFDataV0tag", 0.50, 0.90, 0.03),
        ("KaonTOFDataTPCtag", 0.45, 0.88, 0.05),
    ];

    let mut names: Vec<String> = Vec::new();
    let mut all_contents: Vec<Vec<f64>> = Vec::new();
    for &(stem, low, high, amplitude) in &stems {
        for n_sigma in [2.0, 3.0] {
            // tighter cuts select fewer tracks
            let scale = if n_sigma < 3.0 { 0.9 } else { 1.0 };
            let (eff_name, ratio_name) = curve_names(stem, n_sigma);
            names.push(eff_name);
            all_contents.push(efficiency_curve(&centres, low * scale, high * scale));
            names.push(ratio_name);
            all_contents.push(ratio_curve(&centres, amplitude, rng));
        }
    }

    // Build Arrow arrays
    let mut edges_builder = ListBuilder::new(Float64Builder::new());
    for _ in &names {
        let values = edges_builder.values();
        for &v in &edges {
            values.append_value(v);
        }
        edges_builder.append(true);
    }
    let edges_array = edges_builder.finish();

    let mut contents_builder = ListBuilder::new(Float64Builder::new());
    for row in &all_contents {
        let values = contents_builder.values();
        for &v in row {
            values.append_value(v);
        }
        contents_builder.append(true);
    }
    let contents_array = contents_builder.finish();

    let name_array = StringArray::from(names.iter().map(|s| s.as_str()).collect::<Vec<_>>());

    let list_type = DataType::List(Arc::new(Field::new("item", DataType::Float64, true)));
    let schema = Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, false),
        Field::new("bin_edges", list_type.clone(), false),
        Field::new("contents", list_type, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(name_array),
            Arc::new(edges_array),
            Arc::new(contents_array),
        ],
    )
    .expect("Failed to create RecordBatch");

    let file = std::fs::File::create(path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    names.len()
}

fn make_event(rng: &mut SimpleRng, n_candidates: usize) -> EventRecord {
    // truth record: alternating kaons and pions
    let mc_particles: Vec<McParticle> = (0..2 * n_candidates)
        .map(|i| McParticle {
            pdg_code: if i % 2 == 0 { -PDG_KAON } else { PDG_PION },
        })
        .collect();

    let candidates: Vec<DecayCandidate> = (0..n_candidates)
        .map(|i| {
            let pt = rng.uniform(1.0, 16.0);
            let share = rng.uniform(0.3, 0.7);
            let track = |label: usize, pt: f64, rng: &mut SimpleRng| TrackRecord {
                label: label as i64,
                pt,
                tpc_status: rng.status(0.95),
                tof_status: rng.status(0.6),
            };
            let kaon = track(2 * i, pt * share, rng);
            let pion = track(2 * i + 1, pt * (1.0 - share), rng);
            DecayCandidate::TwoProng(ProngCandidate {
                kinematics: CandidateKinematics {
                    pt,
                    rapidity: rng.uniform(-1.0, 1.0),
                    refilled: rng.next_f64() > 0.02,
                    pid_selection: if rng.next_f64() > 0.1 { 3 } else { 0 },
                    mc_label: Some(i),
                    origin: Some(if rng.next_f64() > 0.2 { Origin::Charm } else { Origin::Beauty }),
                },
                daughters: vec![Some(kaon), Some(pion)],
            })
        })
        .collect();

    let mut branches = BTreeMap::new();
    branches.insert(DecayChannel::D0toKpi.branch_name().to_string(), candidates);

    EventRecord {
        run_number: 265309,
        trigger_mask: 1,
        aod_matching_level: 1,
        primary_vertex: Some(Vertex {
            z: rng.uniform(-8.0, 8.0),
        }),
        magnetic_field: -0.5,
        selection: EventSelection {
            selected: rng.next_f64() > 0.05,
            ..EventSelection::default()
        },
        branches,
        mc_particles: Some(mc_particles),
        mc_header: Some(McHeader {
            vtx_z: rng.uniform(-9.0, 9.0),
        }),
    }
}

fn main() {
    let mut rng = SimpleRng::new(42);

    let calibration_path = "sample_calibration.parquet";
    let n_curves = write_calibration(calibration_path, &mut rng);

    let events: Vec<EventRecord> = (0..200).map(|_| make_event(&mut rng, 4)).collect();
    let events_path = "sample_events.json";
    let file = std::fs::File::create(events_path).expect("Failed to create event file");
    serde_json::to_writer(file, &events).expect("Failed to write events");

    let config = TaskConfig::new(
        DecayChannel::D0toKpi,
        calibration_path,
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0, 12.0, 16.0, 24.0],
    );
    let config_path = "sample_config.json";
    let file = std::fs::File::create(config_path).expect("Failed to create config file");
    serde_json::to_writer_pretty(file, &config).expect("Failed to write config");

    println!(
        "Wrote {n_curves} calibration curves to {calibration_path}, {} events to {events_path}, config to {config_path}",
        events.len()
    );
}
