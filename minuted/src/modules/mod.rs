//! Concrete adapters behind the ports.
//!
//! The HTTP speech recognition client is always available; the cloud
//! adapters live behind the `aws` cargo feature.
pub mod asr;

#[cfg(feature = "aws")]
pub mod aws;
