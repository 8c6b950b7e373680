//! Auth-domain identifiers, users, scope sets, and redacted secrets.

pub mod id;
pub mod scope;
pub mod secret;
pub mod user;

pub use id::*;
pub use scope::*;
pub use secret::*;
pub use user::*;
