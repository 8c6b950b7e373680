// self
use crate::{
	_prelude::*,
	auth::{IdentifierError, Login},
};

/// Profile returned by the provider's userinfo endpoint. Never carries a password.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthProfile {
	/// Provider-side account identifier.
	pub id: String,
	/// Display name.
	#[serde(default)]
	pub name: String,
	/// Verified email address; doubles as the local login.
	pub email: String,
	/// Avatar URL.
	#[serde(default)]
	pub picture: Option<String>,
}
impl OAuthProfile {
	/// Local login derived from the profile email.
	pub fn login(&self) -> Result<Login, IdentifierError> {
		Login::new(self.email.trim())
	}
}
