//! Strongly typed identifiers enforced across the auth domain.

// std
use std::{borrow::Borrow, ops::Deref};
// crates.io
use uuid::Uuid;
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

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (login, provider, user).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (login, provider, user).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (login, provider, user).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// The identifier is not a well-formed UUID.
	#[error("{kind} identifier is not a valid UUID.")]
	Malformed {
		/// Kind of identifier (user).
		kind: &'static str,
	},
}

def_id! { Login, "Unique, case-sensitive login name of a user.", "Login" }
def_id! { ProviderId, "Identifier for an OAuth provider descriptor.", "Provider" }

/// Opaque 128-bit user identifier, minted as a random UUID.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);
impl UserId {
	/// Mints a fresh random identifier.
	pub fn random() -> Self {
		Self(Uuid::new_v4())
	}

	/// Wraps an existing UUID.
	pub fn from_uuid(value: Uuid) -> Self {
		Self(value)
	}

	/// Returns the underlying UUID.
	pub fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}
impl Debug for UserId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "User({})", self.0)
	}
}
impl Display for UserId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		Display::fmt(&self.0, f)
	}
}
impl FromStr for UserId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Uuid::parse_str(s).map(Self).map_err(|_| IdentifierError::Malformed { kind: "User" })
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.chars().count() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn logins_validate_and_stay_case_sensitive() {
		assert!(Login::new(" alice").is_err(), "Leading whitespace must be rejected.");
		assert!(Login::new("").is_err());
		assert!(Login::new("a".repeat(IDENTIFIER_MAX_LEN + 1)).is_err());

		let lower = Login::new("alice").expect("Lowercase login fixture should be valid.");
		let upper = Login::new("Alice").expect("Capitalised login fixture should be valid.");

		assert_ne!(lower, upper);
		assert_eq!(lower.as_ref(), "alice");
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let login: Login =
			serde_json::from_str("\"bob\"").expect("Login should deserialize successfully.");

		assert_eq!(&*login, "bob");
		assert!(serde_json::from_str::<Login>("\"with space\"").is_err());
	}

	#[test]
	fn user_ids_parse_and_print_as_uuids() {
		let id = UserId::random();
		let parsed = UserId::from_str(&id.to_string()).expect("Printed user id should parse.");

		assert_eq!(id, parsed);
		assert!(matches!(UserId::from_str("not-a-uuid"), Err(IdentifierError::Malformed { .. })));
		assert_ne!(UserId::random(), UserId::random());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<Login, u8> = HashMap::from_iter([(
			Login::new("alice").expect("Login used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("alice"), Some(&7));
	}
}
