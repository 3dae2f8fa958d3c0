use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, Float32Array, Float64Array, LargeListArray, LargeStringArray, ListArray, StringArray};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::histogram::Histogram1D;
use super::model::EventRecord;

// ---------------------------------------------------------------------------
// HistogramStore – named 1-D histograms read from a calibration file
// ---------------------------------------------------------------------------

/// Keyed store of calibration histograms.
#[derive(Debug, Clone, Default)]
pub struct HistogramStore {
    histograms: BTreeMap<String, Histogram1D>,
}

impl HistogramStore {
    pub fn get(&self, name: &str) -> Option<&Histogram1D> {
        self.histograms.get(name)
    }

    /// Insert a histogram under its own name, replacing any previous one.
    pub fn insert(&mut self, histogram: Histogram1D) -> Option<Histogram1D> {
        self.histograms.insert(histogram.name.clone(), histogram)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.histograms.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }
}

impl FromIterator<Histogram1D> for HistogramStore {
    fn from_iter<I: IntoIterator<Item = Histogram1D>>(iter: I) -> Self {
        let mut store = HistogramStore::default();
        for h in iter {
            store.insert(h);
        }
        store
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a calibration store from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one row per histogram: `name`, `bin_edges`, `contents` (recommended)
/// * `.json`    – `[{ "name": ..., "bin_edges": [...], "contents": [...] }, ...]`
/// * `.csv`     – columns `name`, `bin_edges`, `contents`; lists semicolon-separated
///
/// `underflow` / `overflow` are optional in every format.
pub fn load_histograms(path: &Path) -> Result<HistogramStore> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let store = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading calibration histograms from {}", path.display()))?;

    log::info!("Loaded {} histograms from {}", store.len(), path.display());
    Ok(store)
}

/// Load the event records of one processing pass (JSON array).
pub fn load_events(path: &Path) -> Result<Vec<EventRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading event file {}", path.display()))?;
    let events: Vec<EventRecord> = serde_json::from_str(&text).context("parsing event records")?;
    log::info!("Read {} events from {}", events.len(), path.display());
    Ok(events)
}

fn build_histogram(
    name: String,
    edges: Vec<f64>,
    contents: Vec<f64>,
    flows: (Option<f64>, Option<f64>),
) -> Result<Histogram1D> {
    let (n_edges, n_contents) = (edges.len(), contents.len());
    let hist = Histogram1D::new(name.clone(), edges, contents).with_context(|| {
        format!(
            "Histogram '{name}': {n_edges} edges for {n_contents} bins (edges must be ascending, one more than bins)"
        )
    })?;
    Ok(hist.with_flows(flows.0.unwrap_or(0.0), flows.1.unwrap_or(0.0)))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   {
///     "name": "hEffPionTPCDataV0tag_3sigma",
///     "bin_edges": [0.0, 0.5, 1.0, ...],
///     "contents":  [0.91, 0.93, ...],
///     "underflow": 0.0
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<HistogramStore> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut store = HistogramStore::default();

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .with_context(|| format!("Row {i}: missing or invalid 'name'"))?
            .to_string();
        let edges = json_array_to_f64(obj.get("bin_edges"), i, "bin_edges")?;
        let contents = json_array_to_f64(obj.get("contents"), i, "contents")?;
        let flows = (
            obj.get("underflow").and_then(|v| v.as_f64()),
            obj.get("overflow").and_then(|v| v.as_f64()),
        );

        store.insert(build_histogram(name, edges, contents, flows)?);
    }

    Ok(store)
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names.
/// `bin_edges` and `contents` contain semicolon-separated floats:
///   `"0.0;0.5;1.0"`, `"0.91;0.93"`
/// Optional `underflow` / `overflow` columns hold single floats.
fn load_csv(path: &Path) -> Result<HistogramStore> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let column = |name: &str| headers.iter().position(|h| h == name);
    let name_idx = column("name").context("CSV missing 'name' column")?;
    let edges_idx = column("bin_edges").context("CSV missing 'bin_edges' column")?;
    let contents_idx = column("contents").context("CSV missing 'contents' column")?;
    let under_idx = column("underflow");
    let over_idx = column("overflow");

    let mut store = HistogramStore::default();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let name = record.get(name_idx).unwrap_or("").trim().to_string();
        if name.is_empty() {
            bail!("CSV row {row_no}: empty histogram name");
        }
        let edges = parse_semicolon_floats(record.get(edges_idx).unwrap_or(""), row_no, "bin_edges")?;
        let contents = parse_semicolon_floats(record.get(contents_idx).unwrap_or(""), row_no, "contents")?;
        let flow = |idx: Option<usize>, col: &str| -> Result<Option<f64>> {
            match idx.and_then(|i| record.get(i)).map(str::trim) {
                None | Some("") => Ok(None),
                Some(tok) => tok
                    .parse::<f64>()
                    .map(Some)
                    .with_context(|| format!("Row {row_no}, {col}: '{tok}' is not a number")),
            }
        };
        let flows = (flow(under_idx, "underflow")?, flow(over_idx, "overflow")?);

        store.insert(build_histogram(name, edges, contents, flows)?);
    }

    Ok(store)
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing calibration histograms.
///
/// Expected schema:
/// - `name`: Utf8 or LargeUtf8 – store key
/// - `bin_edges`: List<Float64> or LargeList<Float64>
/// - `contents`: List<Float64> or LargeList<Float64>
/// - `underflow`, `overflow`: optional Float64 columns
fn load_parquet(path: &Path) -> Result<HistogramStore> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut store = HistogramStore::default();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let n_rows = batch.num_rows();

        let index_of = |col: &str| {
            schema
                .index_of(col)
                .map_err(|_| anyhow::anyhow!("Parquet file missing '{col}' column"))
        };
        let name_col = batch.column(index_of("name")?);
        let edges_col = batch.column(index_of("bin_edges")?);
        let contents_col = batch.column(index_of("contents")?);
        let under_col = schema.index_of("underflow").ok().map(|i| batch.column(i));
        let over_col = schema.index_of("overflow").ok().map(|i| batch.column(i));

        for row in 0..n_rows {
            let name = extract_string(name_col, row)
                .with_context(|| format!("Row {row}: failed to read 'name'"))?;
            let edges = extract_f64_list(edges_col, row)
                .with_context(|| format!("Row {row}: failed to read 'bin_edges'"))?;
            let contents = extract_f64_list(contents_col, row)
                .with_context(|| format!("Row {row}: failed to read 'contents'"))?;
            let flows = (
                under_col.and_then(|c| extract_f64(c, row)),
                over_col.and_then(|c| extract_f64(c, row)),
            );

            store.insert(build_histogram(name, edges, contents, flows)?);
        }
    }

    Ok(store)
}

// -- Parquet / Arrow helpers --

fn extract_string(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null histogram name");
    }
    if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
        Ok(s.value(row).to_string())
    } else if let Some(s) = col.as_any().downcast_ref::<LargeStringArray>() {
        Ok(s.value(row).to_string())
    } else {
        bail!("Expected Utf8 name column, got {:?}", col.data_type())
    }
}

fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
        Some(arr.value(row))
    } else {
        col.as_any()
            .downcast_ref::<Float32Array>()
            .map(|arr| arr.value(row) as f64)
    }
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn json_store() {
        let file = write_temp(
            ".json",
            r#"[{"name": "hA", "bin_edges": [0, 1, 2], "contents": [0.5, 0.6], "overflow": 0.7}]"#,
        );
        let store = load_histograms(file.path()).unwrap();
        let h = store.get("hA").unwrap();
        assert_eq!(h.n_bins(), 2);
        assert_eq!(h.bin_content(2), 0.6);
        assert_eq!(h.bin_content(3), 0.7);
    }

    #[test]
    fn csv_store() {
        let file = write_temp(
            ".csv",
            "name,bin_edges,contents,underflow\nhB,0;0.5;1.5,0.9;0.8,0.25\nhC,0;1,1.0,\n",
        );
        let store = load_histograms(file.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("hB").unwrap().bin_content(0), 0.25);
        assert_eq!(store.get("hC").unwrap().find_bin(0.3), 1);
    }

    #[test]
    fn rejects_inconsistent_histogram() {
        let file = write_temp(
            ".json",
            r#"[{"name": "hBad", "bin_edges": [0, 1], "contents": [0.5, 0.6]}]"#,
        );
        let err = load_histograms(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("hBad"));
    }

    #[test]
    fn rejects_unknown_extension() {
        let file = write_temp(".root", "");
        assert!(load_histograms(file.path()).is_err());
    }
}
