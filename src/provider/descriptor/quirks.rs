// self
use crate::_prelude::*;

/// Provider-specific quirks that influence how flows behave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Character used to join scopes when constructing `scope` parameters.
	pub scope_delimiter: char,
	/// Poll interval used when the device endpoint omits `interval`.
	pub device_poll_interval_secs: u64,
	/// Device-code lifetime used when the device endpoint omits `expires_in`.
	pub device_code_lifetime_secs: u64,
	/// Seconds added to the poll interval after a `slow_down` answer.
	pub slow_down_increment_secs: u64,
}
impl ProviderQuirks {
	/// Default device poll interval.
	pub fn device_poll_interval(&self) -> Duration {
		seconds(self.device_poll_interval_secs)
	}

	/// Default device-code lifetime.
	pub fn device_code_lifetime(&self) -> Duration {
		seconds(self.device_code_lifetime_secs)
	}

	/// Poll interval increase applied on `slow_down`.
	pub fn slow_down_increment(&self) -> Duration {
		seconds(self.slow_down_increment_secs)
	}
}
impl Default for ProviderQuirks {
	fn default() -> Self {
		Self {
			scope_delimiter: ' ',
			device_poll_interval_secs: 5,
			device_code_lifetime_secs: 1_800,
			slow_down_increment_secs: 5,
		}
	}
}

fn seconds(value: u64) -> Duration {
	Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX))
}
