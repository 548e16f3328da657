use serde_json::Value;

pub const MESH_POINT_COUNT: usize = 478;

/// Distances a synthetic face is built from, in the order
/// mouth width, nose width, left brow, right brow, mouth height, left eye, right eye.
#[derive(Debug, Clone, Copy)]
pub struct Face {
    pub mouth_width: f64,
    pub nose_width: f64,
    pub left_brow: f64,
    pub right_brow: f64,
    pub mouth_height: f64,
    pub left_eye: f64,
    pub right_eye: f64,
}

pub const RESTING: Face = Face {
    mouth_width: 40.0,
    nose_width: 30.0,
    left_brow: 20.0,
    right_brow: 20.0,
    mouth_height: 2.0,
    left_eye: 8.0,
    right_eye: 8.0,
};

const PAIRS: [(usize, usize); 7] = [
    (61, 291),
    (102, 331),
    (107, 133),
    (336, 362),
    (13, 14),
    (159, 145),
    (386, 374),
];

impl Face {
    pub fn smiling() -> Self {
        Self {
            mouth_width: 60.0,
            ..RESTING
        }
    }

    pub fn surprised() -> Self {
        Self {
            left_brow: 30.0,
            right_brow: 30.0,
            mouth_height: 7.0,
            ..RESTING
        }
    }

    fn distances(&self) -> [f64; 7] {
        [
            self.mouth_width,
            self.nose_width,
            self.left_brow,
            self.right_brow,
            self.mouth_height,
            self.left_eye,
            self.right_eye,
        ]
    }

    /// Full mesh as the JSON array a client would post.
    pub fn keypoints(&self) -> Value {
        let mut points = vec![(0.0_f64, 0.0_f64); MESH_POINT_COUNT];
        for (row, ((a, b), dist)) in PAIRS.iter().zip(self.distances()).enumerate() {
            let y = 20.0 * row as f64;
            points[*a] = (100.0, y);
            points[*b] = (100.0 + dist, y);
        }
        Value::Array(
            points
                .into_iter()
                .map(|(x, y)| serde_json::json!({ "x": x, "y": y }))
                .collect(),
        )
    }
}
