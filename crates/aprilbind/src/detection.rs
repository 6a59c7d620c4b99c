//! Owned detection records.

use nalgebra::{Matrix3, Vector3};

/// Labels printed by [`Detection::to_string_indented`], in field order.
const PRINT_LABELS: [&str; 8] = [
    "Family",
    "ID",
    "Hamming error",
    "Goodness",
    "Decision margin",
    "Homography",
    "Center",
    "Corners",
];

const MAX_LABEL_LEN: usize = max_len(&PRINT_LABELS);

const fn max_len(labels: &[&str]) -> usize {
    let mut max = 0;
    let mut i = 0;
    while i < labels.len() {
        if labels[i].len() > max {
            max = labels[i].len();
        }
        i += 1;
    }
    max
}

/// One detected tag, copied out of native memory.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Detection {
    /// Name of the tag family the tag was decoded with.
    pub tag_family: String,
    /// Decoded tag identifier.
    pub tag_id: i32,
    /// Number of bit errors corrected while decoding.
    pub hamming: i32,
    pub goodness: f32,
    pub decision_margin: f32,
    /// Tag-plane to image homography (3x3, row-major).
    pub homography: [[f64; 3]; 3],
    /// Tag center in image pixels.
    pub center: [f64; 2],
    /// The four tag corners in image pixels, in native order.
    pub corners: [[f64; 2]; 4],
}

impl Detection {
    pub fn homography_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_fn(|r, c| self.homography[r][c])
    }

    /// Map a tag-plane point (the tag spans `[-1, 1]` on both axes) into the
    /// image. Returns `None` for points on the line at infinity.
    pub fn project(&self, tag_xy: [f64; 2]) -> Option<[f64; 2]> {
        let p = self.homography_matrix() * Vector3::new(tag_xy[0], tag_xy[1], 1.0);
        if p[2].abs() < 1e-15 {
            return None;
        }
        Some([p[0] / p[2], p[1] / p[2]])
    }

    /// Human-readable block, one labelled field per line.
    ///
    /// Labels are right-aligned to the longest label plus `indent`; continuation
    /// lines of multi-line values line up under the first value column.
    pub fn to_string_indented(&self, indent: usize) -> String {
        let values = [
            self.tag_family.clone(),
            self.tag_id.to_string(),
            self.hamming.to_string(),
            self.goodness.to_string(),
            self.decision_margin.to_string(),
            format_rows(self.homography.iter().map(|r| r.as_slice())),
            format_row(&self.center),
            format_rows(self.corners.iter().map(|r| r.as_slice())),
        ];
        let width = MAX_LABEL_LEN + indent;
        let continuation = " ".repeat(MAX_LABEL_LEN + 2 + indent);

        PRINT_LABELS
            .iter()
            .zip(values.iter())
            .map(|(label, value)| {
                let value = value.replace('\n', &format!("\n{continuation}"));
                format!("{label:>width$}: {value}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl std::fmt::Display for Detection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_string_indented(0))
    }
}

fn format_row(row: &[f64]) -> String {
    let cells: Vec<String> = row.iter().map(|v| format!("{v:.6}")).collect();
    format!("[{}]", cells.join(" "))
}

fn format_rows<'a>(rows: impl Iterator<Item = &'a [f64]>) -> String {
    let rows: Vec<String> = rows.map(format_row).collect();
    format!("[{}]", rows.join("\n "))
}
