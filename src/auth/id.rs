//! Validated identity identifiers.

// std
use std::{borrow::Borrow, fmt::Write, ops::Deref};
// crates.io
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;
const FALLBACK_FILE_STEM: &str = "unknown_user";
const FILE_STEM_DIGEST_BYTES: usize = 8;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier.
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { IdentityId, "Account (user or admin) that owns exactly one persisted credential.", "Identity" }
def_id! { ProviderId, "Identifier for an OAuth provider descriptor.", "Provider" }

impl IdentityId {
	/// Filesystem-safe stem derived from the identity; distinct identities get distinct stems.
	///
	/// An identity made only of ASCII alphanumerics, `-`, and `_` is its own stem. Any other
	/// identity keeps its safe characters (or `unknown_user` when none remain) followed by `.`
	/// and a SHA-256 prefix of the raw value. Plain stems never contain `.`, so the two
	/// shapes cannot meet.
	pub fn file_stem(&self) -> String {
		let safe: String = self.0.chars().filter(|ch| is_file_safe(*ch)).collect();

		if safe.len() == self.0.len() {
			return safe;
		}

		let mut stem = if safe.is_empty() { FALLBACK_FILE_STEM.to_owned() } else { safe };

		stem.push('.');

		for byte in &Sha256::digest(self.0.as_bytes())[..FILE_STEM_DIGEST_BYTES] {
			let _ = write!(stem, "{byte:02x}");
		}

		stem
	}
}

fn is_file_safe(ch: char) -> bool {
	ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_')
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identities_reject_padding_and_empty_values() {
		assert!(IdentityId::new(" alice").is_err(), "Leading whitespace must be rejected.");
		assert!(IdentityId::new("alice ").is_err(), "Trailing whitespace must be rejected.");
		assert!(IdentityId::new("").is_err());
		assert!(ProviderId::new("with space").is_err());

		let identity = IdentityId::new("alice@example.com").expect("Identity should be valid.");

		assert_eq!(identity.as_ref(), "alice@example.com");
		assert_eq!(format!("{identity:?}"), "Identity(alice@example.com)");
	}

	#[test]
	fn file_stem_keeps_safe_identities_verbatim() {
		let identity = IdentityId::new("admin_2-b").expect("Identity should be valid.");

		assert_eq!(identity.file_stem(), "admin_2-b");
	}

	#[test]
	fn file_stem_separates_identities_that_sanitize_alike() {
		let stem = |raw: &str| IdentityId::new(raw).expect("Identity should be valid.").file_stem();
		let dotted = stem("alice@example.com");
		let plain = stem("aliceexample.com");
		let traversal = stem("../alice@example.com");

		assert!(dotted.starts_with("aliceexamplecom."), "{dotted}");
		assert_eq!(dotted.len(), "aliceexamplecom.".len() + 16);
		assert!(!dotted.contains('/'));
		assert_ne!(dotted, plain);
		assert_ne!(dotted, traversal);
		assert_ne!(stem("aliceexamplecom"), plain);
		assert_eq!(dotted, stem("alice@example.com"));

		let symbols = stem("@@..//");

		assert!(symbols.starts_with("unknown_user."), "{symbols}");
		assert_ne!(symbols, stem("##"));
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let identity: IdentityId =
			serde_json::from_str("\"admin\"").expect("Identity should deserialize.");

		assert_eq!(identity.as_ref(), "admin");
		assert!(serde_json::from_str::<IdentityId>("\"with space\"").is_err());
		assert!(serde_json::from_str::<IdentityId>(&format!("\"{}\"", "a".repeat(129))).is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<IdentityId, u8> = HashMap::from_iter([(
			IdentityId::new("admin").expect("Identity used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("admin"), Some(&7));
	}
}
