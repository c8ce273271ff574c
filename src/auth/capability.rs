//! Service capabilities and the OAuth scopes they require.

// self
use crate::{_prelude::*, auth::ScopeSet};

/// Capability a caller asks the broker to authorize.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
	/// Read/write access to calendars and events.
	Calendar,
	/// Read-only mailbox access.
	MailReadonly,
}
impl Capability {
	/// OAuth scope granting the capability.
	pub const fn scope(self) -> &'static str {
		match self {
			Capability::Calendar => "https://www.googleapis.com/auth/calendar",
			Capability::MailReadonly => "https://www.googleapis.com/auth/gmail.readonly",
		}
	}

	/// Scope set required by every capability in `capabilities`.
	pub fn scope_set<'a, I>(capabilities: I) -> ScopeSet
	where
		I: IntoIterator<Item = &'a Capability>,
	{
		// Capability scopes are static, non-empty, and whitespace-free.
		ScopeSet::new(capabilities.into_iter().map(|capability| capability.scope()))
			.unwrap_or_default()
	}
}
impl Display for Capability {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Capability::Calendar => f.write_str("calendar"),
			Capability::MailReadonly => f.write_str("mail_readonly"),
		}
	}
}
