//! Viewer configuration
//!
//! Optional TOML file; every missing key falls back to its default.
//!
//! ```toml
//! width = 1600
//! height = 900
//! mode = "optim_hi_z"
//! light_direction = [-0.6, 0.3, 1.0]
//!
//! [scene]
//! kind = "box_field"
//! count = 4096
//! seed = 1
//! ```

use crate::error::{VisibilityError, VisibilityResult};
use crate::geometry::SceneKind;
use crate::visibility::RenderMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub width: u32,
    pub height: u32,
    pub mode: RenderMode,
    pub light_direction: [f32; 3],
    pub scene: SceneKind,
    pub vsync: bool,
    /// Read back and log frame statistics every this many frames; 0 disables
    pub stats_interval: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            mode: RenderMode::default(),
            light_direction: [-0.6, 0.3, 1.0],
            scene: SceneKind::default(),
            vsync: true,
            stats_interval: 0,
        }
    }
}

pub fn parse_config(content: &str, path: &Path) -> VisibilityResult<ViewerConfig> {
    toml::from_str(content).map_err(|source| VisibilityError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a config file
pub fn load_config(path: impl AsRef<Path>) -> VisibilityResult<ViewerConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| VisibilityError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&content, path)?;
    log::info!(
        "[Viewer] Loaded config {:?}: {}x{}, {}",
        path,
        config.width,
        config.height,
        config.mode.display_name()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mode = \"scanline\"\nwidth = 640").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.mode, RenderMode::Scanline);
        assert_eq!(config.width, 640);
        assert_eq!(config.height, ViewerConfig::default().height);
        assert_eq!(config.scene, SceneKind::default());
    }

    #[test]
    fn test_scene_table() {
        let text = "[scene]\nkind = \"box_field\"\ncount = 12\nseed = 99\n";
        let config = parse_config(text, Path::new("inline.toml")).unwrap();
        assert_eq!(config.scene, SceneKind::BoxField { count: 12, seed: 99 });

        let config = parse_config("[scene]\nkind = \"overlap_pair\"\n", Path::new("inline.toml")).unwrap();
        assert_eq!(config.scene, SceneKind::OverlapPair);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, VisibilityError::ConfigRead { .. }));
    }

    #[test]
    fn test_bad_mode_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mode = \"raytraced\"").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, VisibilityError::ConfigParse { .. }));
    }
}
