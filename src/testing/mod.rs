//! # Test Support
//!
//! In-memory stand-ins for the API server, the secret store and the cloud,
//! plus a [`Harness`] that wires every kind's engine over them so ticks can
//! be driven by hand.

mod cloud;
mod harness;
mod secrets;
mod store;

pub use cloud::{default_wallet, wallet_archive, CloudCall, FakeCloud};
pub use harness::Harness;
pub use secrets::FakeSecretStore;
pub use store::FakeStore;
