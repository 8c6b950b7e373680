//! Crate-wide error taxonomy shared by credentials, tokens, OAuth, admission, and storage.
//!
//! [`Error`]'s `Display` output is the caller-facing message. Internal failures keep their
//! underlying cause reachable through [`StdError::source`] for logging, but never render it.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// Coarse classification surfaced to RPC callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Duplicate login on registration.
	AlreadyExists,
	/// Wrong login or password.
	CredentialInvalid,
	/// Invalid/expired session token, OAuth state mismatch, or OAuth exchange failure.
	Unauthenticated,
	/// Rejected by admission control.
	ResourceExhausted,
	/// Request failed validation before reaching the use case.
	InvalidArgument,
	/// Request deadline passed before the operation completed.
	DeadlineExceeded,
	/// Hashing/signing failure or unexpected storage error.
	Internal,
	/// Operation is reserved but not implemented.
	Unimplemented,
}
impl ErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::AlreadyExists => "already_exists",
			ErrorKind::CredentialInvalid => "credential_invalid",
			ErrorKind::Unauthenticated => "unauthenticated",
			ErrorKind::ResourceExhausted => "resource_exhausted",
			ErrorKind::InvalidArgument => "invalid_argument",
			ErrorKind::DeadlineExceeded => "deadline_exceeded",
			ErrorKind::Internal => "internal",
			ErrorKind::Unimplemented => "unimplemented",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Login is already registered.
	#[error("Login `{login}` is already taken.")]
	AlreadyExists {
		/// Login that collided.
		login: String,
	},
	/// Login/password pair did not match a stored user.
	#[error("Invalid login or password.")]
	CredentialInvalid,
	/// Caller must (re-)authenticate.
	#[error("Unauthenticated: {reason}.")]
	Unauthenticated {
		/// Caller-safe reason string.
		reason: String,
	},
	/// Admission control rejected the request.
	#[error("Rate limit exceeded for `{scope}`; try again later.")]
	ResourceExhausted {
		/// Bucket that rejected the request (`global` or a method pattern).
		scope: String,
	},
	/// Request failed validation.
	#[error("Invalid {field}: {reason}.")]
	InvalidArgument {
		/// Offending request field.
		field: &'static str,
		/// Caller-safe reason string.
		reason: String,
	},
	/// Request deadline passed.
	#[error("Request deadline exceeded.")]
	DeadlineExceeded,
	/// Unexpected failure; the cause is kept for logs only.
	#[error("Internal error.")]
	Internal {
		/// Underlying failure.
		#[source]
		source: BoxError,
	},
	/// Operation is reserved but not implemented.
	#[error("Operation `{operation}` is not implemented.")]
	Unimplemented {
		/// Operation name.
		operation: &'static str,
	},
	/// Local configuration problem detected while wiring components.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Wraps an unexpected failure as [`Error::Internal`].
	pub fn internal(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Internal { source: Box::new(src) }
	}

	/// Builds an [`Error::Unauthenticated`] with the provided caller-safe reason.
	pub fn unauthenticated(reason: impl Into<String>) -> Self {
		Self::Unauthenticated { reason: reason.into() }
	}

	/// Classifies the error for RPC status mapping.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::AlreadyExists { .. } => ErrorKind::AlreadyExists,
			Error::CredentialInvalid => ErrorKind::CredentialInvalid,
			Error::Unauthenticated { .. } => ErrorKind::Unauthenticated,
			Error::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
			Error::InvalidArgument { .. } => ErrorKind::InvalidArgument,
			Error::DeadlineExceeded => ErrorKind::DeadlineExceeded,
			Error::Internal { .. } | Error::Config(_) => ErrorKind::Internal,
			Error::Unimplemented { .. } => ErrorKind::Unimplemented,
		}
	}
}

/// Configuration and validation failures raised while wiring components.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration document could not be parsed.
	#[error("Configuration is malformed at `{path}`.")]
	Parse {
		/// Field path where parsing failed.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// A required setting is missing or blank.
	#[error("The {field} setting is required.")]
	MissingValue {
		/// Configuration field that must be set.
		field: &'static str,
	},
	/// Provider identifier failed validation.
	#[error("Provider identifier is invalid.")]
	InvalidProviderId(#[from] crate::auth::IdentifierError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A configured URL cannot be parsed.
	#[error("The {field} URL is invalid.")]
	InvalidUrl {
		/// Configuration field holding the URL.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Provider descriptor failed validation.
	#[error(transparent)]
	InvalidDescriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Requested OAuth scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// A signing secret is empty.
	#[error("The {kind} signing secret must not be empty.")]
	EmptySigningSecret {
		/// Token kind the secret signs.
		kind: &'static str,
	},
	/// Access and refresh tokens would share a signing secret.
	#[error("Access and refresh tokens must be signed with distinct secrets.")]
	SharedSigningSecret,
	/// bcrypt cost is outside the supported range.
	#[error("Password hashing cost {cost} is outside the supported range 4..=31.")]
	InvalidHashCost {
		/// Rejected cost value.
		cost: u32,
	},
	/// A duration setting is zero or negative.
	#[error("The {field} duration must be positive.")]
	NonPositiveDuration {
		/// Configuration field holding the duration.
		field: &'static str,
	},
	/// A duration setting is too large to add to the current time.
	#[error("The {field} duration is out of range.")]
	DurationOutOfRange {
		/// Configuration field holding the duration.
		field: &'static str,
	},
	/// A rate-limit capacity is zero.
	#[error("The {field} capacity must be positive.")]
	ZeroCapacity {
		/// Configuration field holding the capacity.
		field: String,
	},
	/// A per-method limiter pattern is empty.
	#[error("Method limiter patterns must not be empty.")]
	EmptyMethodPattern,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::io;
	// self
	use super::*;

	#[test]
	fn internal_errors_hide_their_cause() {
		let err = Error::internal(io::Error::other("mongo: connection reset by peer"));

		assert_eq!(err.kind(), ErrorKind::Internal);
		assert_eq!(err.to_string(), "Internal error.");

		let source = StdError::source(&err).expect("Internal errors should keep their source.");

		assert!(source.to_string().contains("connection reset"));
	}

	#[test]
	fn kinds_map_to_stable_labels() {
		assert_eq!(Error::CredentialInvalid.kind().as_str(), "credential_invalid");
		assert_eq!(
			Error::ResourceExhausted { scope: "global".into() }.kind(),
			ErrorKind::ResourceExhausted
		);
		assert_eq!(Error::unauthenticated("state mismatch").kind(), ErrorKind::Unauthenticated);
		assert_eq!(Error::from(ConfigError::SharedSigningSecret).kind(), ErrorKind::Internal);
	}
}
