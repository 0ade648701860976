/// Render Mode
///
/// The active visibility algorithm, read once per frame by the orchestrator.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    Wireframe,
    NaiveZ,
    Scanline,
    NaiveHiZ,
    OptimHiZ,
}

impl RenderMode {
    pub const ALL: [RenderMode; 5] = [
        RenderMode::Wireframe,
        RenderMode::NaiveZ,
        RenderMode::Scanline,
        RenderMode::NaiveHiZ,
        RenderMode::OptimHiZ,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            RenderMode::Wireframe => "wireframe view",
            RenderMode::NaiveZ => "naive Z-Buffer",
            RenderMode::Scanline => "scanline Z-Buffer",
            RenderMode::NaiveHiZ => "naive Hierarchical Z-Buffer",
            RenderMode::OptimHiZ => "optimized Hierarchical Z-Buffer",
        }
    }

    /// Mode for a zero-based selector index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|&m| m == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    /// Both Hi-Z variants need the Z-prepass, reduction and survivor draw
    pub fn is_hierarchical(self) -> bool {
        matches!(self, RenderMode::NaiveHiZ | RenderMode::OptimHiZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_cycles_through_all() {
        let mut mode = RenderMode::Wireframe;
        for expected in RenderMode::ALL.iter().skip(1) {
            mode = mode.next();
            assert_eq!(mode, *expected);
        }
        assert_eq!(mode.next(), RenderMode::Wireframe);
    }

    #[test]
    fn test_from_index() {
        assert_eq!(RenderMode::from_index(2), Some(RenderMode::Scanline));
        assert_eq!(RenderMode::from_index(5), None);
    }

    #[test]
    fn test_config_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: RenderMode,
        }
        let parsed: Wrapper = toml::from_str("mode = \"optim_hi_z\"").unwrap();
        assert_eq!(parsed.mode, RenderMode::OptimHiZ);
    }
}
