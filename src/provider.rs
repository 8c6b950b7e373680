//! Identity-provider metadata.
//!
//! [`ProviderDescriptor`] captures the validated endpoint set (authorization, token, and
//! userinfo), the client authentication preference used at the token endpoint, and provider
//! quirks such as the scope delimiter. Endpoints must be HTTPS unless they point at a
//! loopback host.

pub mod descriptor;

pub use descriptor::*;
