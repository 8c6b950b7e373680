// self
use crate::_prelude::*;

/// Provider-specific quirks that influence how the authorization redirect is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Attach an S256 PKCE challenge to every authorization attempt.
	pub pkce: bool,
	/// Character used to join scopes when constructing `scope` parameters.
	pub scope_delimiter: char,
}
impl Default for ProviderQuirks {
	fn default() -> Self {
		Self { pkce: true, scope_delimiter: ' ' }
	}
}
