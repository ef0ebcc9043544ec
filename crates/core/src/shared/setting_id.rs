use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::UNKNOWN_SETTING;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid setting id: {0:?}")]
pub struct ParseSettingIdError(pub String);

/// A per-person setting cluster: the `local_index`-th place this person
/// was seen in. Serialized as `person_<p>_setting_<i>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SettingId {
    pub person_id: u32,
    pub local_index: u32,
}

impl SettingId {
    pub fn new(person_id: u32, local_index: u32) -> Self {
        Self {
            person_id,
            local_index,
        }
    }
}

impl fmt::Display for SettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "person_{}_setting_{}", self.person_id, self.local_index)
    }
}

impl FromStr for SettingId {
    type Err = ParseSettingIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseSettingIdError(s.to_string());
        let rest = s.strip_prefix("person_").ok_or_else(invalid)?;
        let (person, index) = rest.split_once("_setting_").ok_or_else(invalid)?;
        Ok(Self {
            person_id: person.parse().map_err(|_| invalid())?,
            local_index: index.parse().map_err(|_| invalid())?,
        })
    }
}

impl From<SettingId> for String {
    fn from(id: SettingId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for SettingId {
    type Error = ParseSettingIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A connected component of co-occurring setting clusters.
///
/// Indices follow component discovery order and are only stable within
/// a single run. Serialized as `global_setting_<n>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct GlobalSettingId(pub usize);

impl fmt::Display for GlobalSettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "global_setting_{}", self.0)
    }
}

impl FromStr for GlobalSettingId {
    type Err = ParseSettingIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("global_setting_")
            .and_then(|n| n.parse().ok())
            .map(GlobalSettingId)
            .ok_or_else(|| ParseSettingIdError(s.to_string()))
    }
}

impl From<GlobalSettingId> for String {
    fn from(id: GlobalSettingId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for GlobalSettingId {
    type Error = ParseSettingIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Frame-level setting: the global setting shared by every face in the
/// frame, or `Unknown` when the frame has no faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum FrameSetting {
    Unknown,
    Global(GlobalSettingId),
}

impl fmt::Display for FrameSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameSetting::Unknown => f.write_str(UNKNOWN_SETTING),
            FrameSetting::Global(id) => id.fmt(f),
        }
    }
}

impl FromStr for FrameSetting {
    type Err = ParseSettingIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == UNKNOWN_SETTING {
            Ok(FrameSetting::Unknown)
        } else {
            s.parse().map(FrameSetting::Global)
        }
    }
}

impl From<FrameSetting> for String {
    fn from(setting: FrameSetting) -> Self {
        setting.to_string()
    }
}

impl TryFrom<String> for FrameSetting {
    type Error = ParseSettingIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
