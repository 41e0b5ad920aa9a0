use serde::{Deserialize, Serialize};

/// Default maximum nesting depth accepted while parsing.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Knobs for the parser.
///
/// Can be built in code or loaded from JSON, e.g. `{"max_depth": 16}`;
/// missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Boxes nested deeper than this fail with a depth-limit error.
    /// Top-level boxes are at depth 1.
    pub max_depth: usize,
    /// Treat missing required children and repeated single-instance
    /// children as format errors instead of warnings.
    pub strict_children: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict_children: false,
        }
    }
}

impl ParseOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
