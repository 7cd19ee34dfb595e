#[derive(Debug)]
pub enum FormatError {
    Json(serde_json::Error),
    UnsupportedDocument(String),
    MissingObject(String),
    InvalidFeature { index: usize, reason: String },
    ArcOutOfRange { index: usize, arc: i64 },
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::Json(e) => write!(f, "JSON parse error: {e}"),
            FormatError::UnsupportedDocument(ty) => {
                write!(f, "expected Topology or FeatureCollection, got {ty}")
            }
            FormatError::MissingObject(name) => write!(f, "topology has no object named {name}"),
            FormatError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
            FormatError::ArcOutOfRange { index, arc } => {
                write!(f, "feature {index} references missing arc {arc}")
            }
        }
    }
}

impl std::error::Error for FormatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FormatError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for FormatError {
    fn from(e: serde_json::Error) -> Self {
        FormatError::Json(e)
    }
}
