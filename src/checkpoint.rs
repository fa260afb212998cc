//! Optional persistence for the nominal control sequence across restarts.
//! A missing or mismatched checkpoint means a cold start from zeros.

use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::Control;

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    timestamp: String,
    controls: Vec<[f64; 2]>,
}

pub fn save<P: AsRef<Path>>(path: P, nominal: &[Control]) -> anyhow::Result<()> {
    let file = CheckpointFile {
        timestamp: chrono::Utc::now().to_rfc3339(),
        controls: nominal.iter().map(|u| [u[0], u[1]]).collect(),
    };
    std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
    Ok(())
}

/// Returns `None` when there is no usable checkpoint (absent, unparsable,
/// or written for a different horizon).
pub fn load<P: AsRef<Path>>(path: P, horizon: usize) -> Option<Vec<Control>> {
    let raw = std::fs::read_to_string(&path).ok()?;
    let file: CheckpointFile = match serde_json::from_str(&raw) {
        Ok(f) => f,
        Err(e) => {
            warn!("ignoring unreadable checkpoint: {e}");
            return None;
        }
    };
    if file.controls.len() != horizon {
        warn!(
            "ignoring checkpoint with horizon {} (expected {})",
            file.controls.len(),
            horizon
        );
        return None;
    }
    if file.controls.iter().flatten().any(|v| !v.is_finite()) {
        warn!("ignoring checkpoint with non-finite controls");
        return None;
    }
    Some(
        file.controls
            .iter()
            .map(|[c, w]| Control::new(*c, *w))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_restores_the_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nominal.json");
        let nominal = vec![Control::new(10.0, -5.0), Control::new(0.5, 2.0)];
        save(&path, &nominal).unwrap();
        assert_eq!(load(&path, 2), Some(nominal));
    }

    #[test]
    fn horizon_mismatch_means_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nominal.json");
        save(&path, &[Control::zeros(); 3]).unwrap();
        assert_eq!(load(&path, 8), None);
    }

    #[test]
    fn missing_file_means_cold_start() {
        assert_eq!(load("/nonexistent/nominal.json", 8), None);
    }
}
