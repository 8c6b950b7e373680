//! Identity and admission control for chat backends: password credentials, signed session
//! tokens, OAuth login with CSRF-safe state, and token-bucket rate limiting in one crate.
//!
//! The crate is organised leaves-first:
//!
//! - [`credential`] hashes and verifies passwords.
//! - [`token`] issues and verifies access/refresh session tokens.
//! - [`oauth`] (with [`provider`] and [`http`]) brokers the authorization-code login.
//! - [`limit`] gates every request with global and per-method token buckets.
//! - [`flows`] composes the pieces into the Register/Login/Refresh/OAuth use cases.
//! - [`rpc`] is the upward-facing gateway that applies admission control, validation, and
//!   deadlines before dispatching to [`flows::AuthService`].

#![deny(clippy::all, unused_crate_dependencies)]
#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod credential;
pub mod error;
pub mod flows;
pub mod http;
pub mod limit;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod rpc;
pub mod store;
pub mod token;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, ErrorKind, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
