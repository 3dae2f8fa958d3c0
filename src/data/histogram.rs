use serde::Serialize;

// ---------------------------------------------------------------------------
// Axis – variable-width binning shared by 1-D and 2-D histograms
// ---------------------------------------------------------------------------

/// A binned axis described by its edges.
///
/// Bins are 1-indexed: bin `0` is the underflow and bin `n_bins() + 1` the
/// overflow, so that bin numbers read the same way calibration files and
/// analysis macros number them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    edges: Vec<f64>,
}

impl Axis {
    /// Build an axis from explicit edges (length = n_bins + 1, strictly ascending).
    pub fn from_edges(edges: Vec<f64>) -> Option<Self> {
        if edges.len() < 2 || edges.windows(2).any(|w| !(w[0] < w[1])) {
            return None;
        }
        Some(Axis { edges })
    }

    /// `n_bins` equal-width bins in `[low, high)`.
    pub fn uniform(n_bins: usize, low: f64, high: f64) -> Option<Self> {
        if n_bins == 0 || !(low < high) {
            return None;
        }
        let width = (high - low) / n_bins as f64;
        let mut edges: Vec<f64> = (0..n_bins).map(|i| low + i as f64 * width).collect();
        edges.push(high);
        Some(Axis { edges })
    }

    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn low(&self) -> f64 {
        self.edges[0]
    }

    pub fn high(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// Bin number containing `x`: `0` below the axis, `n_bins + 1` at or
    /// above the upper edge.
    pub fn find_bin(&self, x: f64) -> usize {
        if x.is_nan() || x < self.low() {
            return 0;
        }
        if x >= self.high() {
            return self.n_bins() + 1;
        }
        // First edge strictly greater than x is the upper edge of x's bin.
        self.edges.partition_point(|&e| e <= x)
    }
}

// ---------------------------------------------------------------------------
// Histogram1D – calibration curves
// ---------------------------------------------------------------------------

/// A named 1-D histogram. Used for the efficiency and systematic-ratio
/// calibration curves, which are read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram1D {
    pub name: String,
    axis: Axis,
    /// In-range contents (length = n_bins).
    contents: Vec<f64>,
    underflow: f64,
    overflow: f64,
}

impl Histogram1D {
    /// Build a histogram from edges and in-range contents.
    /// Returns `None` when the edges are not strictly ascending or the
    /// contents do not match the number of bins.
    pub fn new(name: impl Into<String>, edges: Vec<f64>, contents: Vec<f64>) -> Option<Self> {
        let axis = Axis::from_edges(edges)?;
        if contents.len() != axis.n_bins() {
            return None;
        }
        Some(Histogram1D {
            name: name.into(),
            axis,
            contents,
            underflow: 0.0,
            overflow: 0.0,
        })
    }

    /// Attach explicit underflow/overflow contents.
    pub fn with_flows(mut self, underflow: f64, overflow: f64) -> Self {
        self.underflow = underflow;
        self.overflow = overflow;
        self
    }

    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    pub fn n_bins(&self) -> usize {
        self.axis.n_bins()
    }

    pub fn find_bin(&self, x: f64) -> usize {
        self.axis.find_bin(x)
    }

    /// Content of 1-indexed bin `bin`. Out-of-range indices beyond the
    /// overflow read as zero.
    pub fn bin_content(&self, bin: usize) -> f64 {
        match bin {
            0 => self.underflow,
            b if b <= self.n_bins() => self.contents[b - 1],
            b if b == self.n_bins() + 1 => self.overflow,
            _ => 0.0,
        }
    }

    /// Whether `other` uses exactly the same bin edges.
    pub fn same_binning(&self, other: &Histogram1D) -> bool {
        self.axis == other.axis
    }
}

// ---------------------------------------------------------------------------
// Histogram2D – output distributions
// ---------------------------------------------------------------------------

/// Append-only 2-D histogram for the task outputs.
///
/// Contents are stored row-major over the full (n_x + 2) × (n_y + 2) grid so
/// that entries outside the axes land in the flow bins instead of being lost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram2D {
    pub name: String,
    pub title: String,
    x_axis: Axis,
    y_axis: Axis,
    contents: Vec<f64>,
    entries: u64,
}

impl Histogram2D {
    pub fn new(name: impl Into<String>, title: impl Into<String>, x_axis: Axis, y_axis: Axis) -> Self {
        let cells = (x_axis.n_bins() + 2) * (y_axis.n_bins() + 2);
        Histogram2D {
            name: name.into(),
            title: title.into(),
            x_axis,
            y_axis,
            contents: vec![0.0; cells],
            entries: 0,
        }
    }

    pub fn x_axis(&self) -> &Axis {
        &self.x_axis
    }

    pub fn y_axis(&self) -> &Axis {
        &self.y_axis
    }

    fn cell(&self, bin_x: usize, bin_y: usize) -> usize {
        bin_x * (self.y_axis.n_bins() + 2) + bin_y
    }

    /// Fill one entry with unit weight.
    pub fn fill(&mut self, x: f64, y: f64) {
        let idx = self.cell(self.x_axis.find_bin(x), self.y_axis.find_bin(y));
        self.contents[idx] += 1.0;
        self.entries += 1;
    }

    /// Content of the (1-indexed, flow-inclusive) cell.
    pub fn bin_content(&self, bin_x: usize, bin_y: usize) -> f64 {
        if bin_x > self.x_axis.n_bins() + 1 || bin_y > self.y_axis.n_bins() + 1 {
            return 0.0;
        }
        self.contents[self.cell(bin_x, bin_y)]
    }

    /// Number of fills, flows included.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of the in-range contents.
    pub fn integral(&self) -> f64 {
        let mut sum = 0.0;
        for bx in 1..=self.x_axis.n_bins() {
            for by in 1..=self.y_axis.n_bins() {
                sum += self.contents[self.cell(bx, by)];
            }
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_bin_follows_flow_convention() {
        let axis = Axis::from_edges(vec![0.0, 1.0, 2.0, 4.0]).unwrap();
        assert_eq!(axis.find_bin(-0.1), 0);
        assert_eq!(axis.find_bin(0.0), 1);
        assert_eq!(axis.find_bin(0.99), 1);
        assert_eq!(axis.find_bin(1.0), 2);
        assert_eq!(axis.find_bin(3.9), 3);
        assert_eq!(axis.find_bin(4.0), 4);
        assert_eq!(axis.find_bin(f64::NAN), 0);
    }

    #[test]
    fn rejects_malformed_binning() {
        assert!(Axis::from_edges(vec![1.0]).is_none());
        assert!(Axis::from_edges(vec![0.0, 2.0, 1.0]).is_none());
        assert!(Histogram1D::new("h", vec![0.0, 1.0, 2.0], vec![1.0]).is_none());
        assert!(Axis::uniform(0, 0.0, 1.0).is_none());
    }

    #[test]
    fn bin_content_is_one_indexed() {
        let h = Histogram1D::new("h", vec![0.0, 1.0, 2.0], vec![0.5, 0.7])
            .unwrap()
            .with_flows(0.1, 0.9);
        assert_eq!(h.bin_content(0), 0.1);
        assert_eq!(h.bin_content(1), 0.5);
        assert_eq!(h.bin_content(2), 0.7);
        assert_eq!(h.bin_content(3), 0.9);
        assert_eq!(h.bin_content(7), 0.0);
    }

    #[test]
    fn fill_2d_keeps_flows_out_of_integral() {
        let mut h = Histogram2D::new(
            "h2",
            "",
            Axis::uniform(2, 0.0, 2.0).unwrap(),
            Axis::uniform(4, 0.0, 0.4).unwrap(),
        );
        h.fill(0.5, 0.05);
        h.fill(1.5, 0.35);
        h.fill(5.0, 0.05);
        assert_eq!(h.entries(), 3);
        assert_eq!(h.integral(), 2.0);
        assert_eq!(h.bin_content(1, 1), 1.0);
        assert_eq!(h.bin_content(2, 4), 1.0);
        assert_eq!(h.bin_content(3, 1), 1.0);
    }
}
