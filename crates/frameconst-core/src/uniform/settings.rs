// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};

/// Tunables of [`UniformConstants`](super::UniformConstants).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniformSettings {
    /// Use the persistent-mapping strategy when the device supports it.
    /// When `false`, every frame maps and unmaps its slot.
    pub allow_persistent_mapping: bool,
    /// Prefix of the debug labels given to the ring buffers.
    pub label: String,
}

impl Default for UniformSettings {
    fn default() -> Self {
        Self {
            allow_persistent_mapping: true,
            label: "FrameConstants".to_string(),
        }
    }
}

impl UniformSettings {
    /// Parses settings from JSON. Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the settings to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let settings = UniformSettings::from_json(r#"{ "allow_persistent_mapping": false }"#)
            .expect("valid json");
        assert!(!settings.allow_persistent_mapping);
        assert_eq!(settings.label, "FrameConstants");

        assert_eq!(UniformSettings::from_json("{}").unwrap(), UniformSettings::default());
    }

    #[test]
    fn json_round_trip() {
        let settings = UniformSettings {
            allow_persistent_mapping: false,
            label: "Overlay".to_string(),
        };
        let json = settings.to_json().unwrap();
        assert_eq!(UniformSettings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(UniformSettings::from_json("{ allow_persistent_mapping: yes").is_err());
    }
}
