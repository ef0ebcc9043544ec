use std::path::Path;

use crate::setting::domain::setting_oracle::{OracleError, SettingOracle};

/// Gives the same answer for every pair, for offline dry runs.
///
/// `FixedSettingOracle::new(true)` collapses each person's frames into one
/// cluster; `new(false)` gives every frame its own cluster.
pub struct FixedSettingOracle {
    answer: bool,
}

impl FixedSettingOracle {
    pub fn new(answer: bool) -> Self {
        Self { answer }
    }
}

impl SettingOracle for FixedSettingOracle {
    fn same_setting(&self, _frame: &Path, _other: &Path) -> Result<bool, OracleError> {
        Ok(self.answer)
    }
}
