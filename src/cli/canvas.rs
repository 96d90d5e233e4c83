//! A canvas backed by a selection JSON file.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::bridge::{Canvas, CanvasError, FileIdentity};
use crate::domain::selection::LayerNode;
use crate::service::LayerInfo;

/// Reads the selection from disk on every request, so edits to the file show
/// up as a new selection.
pub struct JsonCanvas {
    path: Option<PathBuf>,
}

impl JsonCanvas {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Document identity derived from the file name, `local/selection` when
    /// there is no file.
    pub fn file_identity(&self) -> FileIdentity {
        let stem = self
            .path
            .as_deref()
            .and_then(Path::file_stem)
            .map(|s| s.to_string_lossy().into_owned());

        match stem {
            Some(stem) => FileIdentity {
                file_id: stem.clone(),
                file_name: stem,
            },
            None => FileIdentity {
                file_id: "local".to_string(),
                file_name: "selection".to_string(),
            },
        }
    }
}

impl Canvas for JsonCanvas {
    fn selection(&self) -> Result<Vec<LayerNode>, CanvasError> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };

        let content = std::fs::read_to_string(path)
            .map_err(|e| CanvasError::Unavailable(format!("{}: {}", path.display(), e)))?;

        let info: LayerInfo = serde_json::from_str(&content)
            .map_err(|e| CanvasError::Unavailable(format!("{}: {}", path.display(), e)))?;

        Ok(info.into_nodes())
    }

    fn resize(&self, width: u32, height: u32) -> Result<(), CanvasError> {
        debug!("Window resize to {}x{} ignored", width, height);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reads_list_and_single_node() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkout.json");

        std::fs::write(&path, r#"[{"id":"1:2","name":"Title","type":"TEXT","characters":"Pay"}]"#)
            .unwrap();
        let canvas = JsonCanvas::new(Some(path.clone()));
        let layers = canvas.selection().unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].characters(), Some("Pay"));

        std::fs::write(&path, r#"{"id":"3:4","name":"Frame","type":"FRAME"}"#).unwrap();
        assert_eq!(canvas.selection().unwrap()[0].id, "3:4");

        assert_eq!(canvas.file_identity().file_id, "checkout");
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let canvas = JsonCanvas::new(Some(dir.path().join("absent.json")));
        assert!(matches!(
            canvas.selection(),
            Err(CanvasError::Unavailable(_))
        ));
    }

    #[test]
    fn test_no_file_means_empty_selection() {
        let canvas = JsonCanvas::new(None);
        assert!(canvas.selection().unwrap().is_empty());
        assert_eq!(canvas.file_identity().file_name, "selection");
    }
}
