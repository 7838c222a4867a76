use num::ToPrimitive as _;
use serde_with::{DurationSecondsWithFrac, serde_as};
use std::{path::Path, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("failed to read the config")]
	Io(#[from] std::io::Error),

	#[error("failed to parse the config")]
	Json(#[from] serde_json::Error),
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
	/// The lease time reported by the LEASE_TIME attribute.
	#[serde_as(as = "DurationSecondsWithFrac")]
	pub lease_time: Duration,

	/// The highest minor version whose attributes are encoded.
	pub max_minor_version: u32,

	/// The server epoch embedded in client ids and stateids. Derived from the start time when absent.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub epoch: Option<u32>,

	/// Whether owner and group names that are plain decimal numbers map directly to ids.
	pub allow_numeric_owners: bool,
}

impl Config {
	pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
		let bytes = std::fs::read(path.as_ref())?;
		let config = serde_json::from_slice(&bytes)?;
		Ok(config)
	}

	/// The configured epoch, or the current time in seconds.
	#[must_use]
	pub fn epoch(&self) -> u32 {
		self.epoch.unwrap_or_else(|| {
			let now = std::time::SystemTime::now()
				.duration_since(std::time::UNIX_EPOCH)
				.unwrap_or_default();
			(now.as_secs() & 0xFFFF_FFFF).to_u32().unwrap_or_default()
		})
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			lease_time: Duration::from_secs(60),
			max_minor_version: 2,
			epoch: None,
			allow_numeric_owners: true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn load() {
		let directory = tempfile::tempdir().unwrap();
		let path = directory.path().join("config.json");
		std::fs::write(&path, r#"{ "lease_time": 90.5, "epoch": 7 }"#).unwrap();
		let config = Config::load(&path).unwrap();
		assert_eq!(config.lease_time, Duration::from_millis(90_500));
		assert_eq!(config.epoch(), 7);
		assert_eq!(config.max_minor_version, 2);
		assert!(config.allow_numeric_owners);
	}

	#[test]
	fn unknown_field() {
		let directory = tempfile::tempdir().unwrap();
		let path = directory.path().join("config.json");
		std::fs::write(&path, r#"{ "lease": 90 }"#).unwrap();
		let error = Config::load(&path).unwrap_err();
		assert!(matches!(error, Error::Json(_)));
		let error = Config::load(directory.path().join("missing.json")).unwrap_err();
		assert!(matches!(error, Error::Io(_)));
	}

	#[test]
	fn serialize() {
		let config = Config::default();
		let json = serde_json::to_string(&config).unwrap();
		insta::assert_snapshot!(json, @r#"{"lease_time":60.0,"max_minor_version":2,"allow_numeric_owners":true}"#);
	}
}
