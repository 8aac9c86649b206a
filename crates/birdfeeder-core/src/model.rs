//! # Model Module
//!
//! `--model` takes `<path>[@<device>]`, e.g. `birds.tflite@usb:0`, so a
//! specific Edge TPU can be targeted when several are attached.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Model file plus optional Edge TPU device selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub path: String,
    pub device: Option<String>,
}

impl FromStr for ModelSpec {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (path, device) = match s.split_once('@') {
            Some((path, device)) => (path, Some(device)),
            None => (s, None),
        };

        let path = path.trim();
        if path.is_empty() {
            return Err(CoreError::InvalidModel(s.to_string()));
        }

        let device = match device.map(str::trim) {
            Some("") => return Err(CoreError::InvalidModel(s.to_string())),
            other => other.map(str::to_string),
        };

        Ok(Self {
            path: path.to_string(),
            device,
        })
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.device {
            Some(device) => write!(f, "{}@{}", self.path, device),
            None => f.write_str(&self.path),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn path_only() {
        let spec: ModelSpec = "models/birds_v1.tflite".parse().unwrap();
        assert_eq!(spec.path, "models/birds_v1.tflite");
        assert_eq!(spec.device, None);
    }

    #[test]
    fn path_and_device() {
        let spec: ModelSpec = "birds.tflite@usb:0".parse().unwrap();
        assert_eq!(spec.path, "birds.tflite");
        assert_eq!(spec.device.as_deref(), Some("usb:0"));
        assert_eq!(spec.to_string(), "birds.tflite@usb:0");
    }

    #[test]
    fn rejects_empty_parts() {
        assert!("".parse::<ModelSpec>().is_err());
        assert!("@usb".parse::<ModelSpec>().is_err());
        assert!("birds.tflite@".parse::<ModelSpec>().is_err());
    }
}
