//! Oracles shared by the in-crate clustering tests.

use std::path::Path;
use std::time::Duration;

use crate::setting::domain::setting_oracle::{OracleError, SettingOracle};

/// Frames named `<place>_<n>.jpg` share a setting when `<place>` matches.
#[derive(Default)]
pub(crate) struct PlaceOracle {
    delay: Duration,
}

impl PlaceOracle {
    /// Sleeps before every answer so worker threads interleave.
    pub(crate) fn slow(delay: Duration) -> Self {
        Self { delay }
    }
}

pub(crate) fn place(path: &Path) -> String {
    let stem = path.file_stem().unwrap().to_string_lossy();
    stem.split('_').next().unwrap().to_string()
}

impl SettingOracle for PlaceOracle {
    fn same_setting(&self, frame: &Path, other: &Path) -> Result<bool, OracleError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(place(frame) == place(other))
    }
}
