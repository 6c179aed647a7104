//! The network link the client runs over.
//!
//! The client does not manage radios or interfaces itself. It asks a
//! [`LinkProvider`] whether the link is up and, when it is not, asks it to
//! bring it back. Association, credentials and captive portals live behind
//! this trait.

use std::future::Future;
use std::net::IpAddr;

use crate::error::LinkError;

#[cfg(feature = "interface-link")]
mod interface;
pub mod provision;

#[cfg(feature = "interface-link")]
pub use interface::{DEFAULT_ASSOCIATION_TIMEOUT, InterfaceLink};
pub use provision::{
    ConnectRequest, ConnectResponse, LinkCredentials, PLACEHOLDER_SSID, ScanEntry, StartupMode,
    normalize_scan,
};

/// Reports and restores network link availability.
pub trait LinkProvider: Send + Sync {
    /// Whether the link is currently usable.
    fn is_up(&self) -> bool;

    /// Bring the link back. Resolves once it is up or the provider gives up.
    fn reassociate(&self) -> impl Future<Output = Result<(), LinkError>> + Send;

    /// The device's own address on the link, if known.
    fn local_address(&self) -> Option<IpAddr> {
        None
    }
}

/// A link that is always up.
///
/// For hosts where the operating system owns connectivity.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysUp;

impl LinkProvider for AlwaysUp {
    fn is_up(&self) -> bool {
        true
    }

    async fn reassociate(&self) -> Result<(), LinkError> {
        Ok(())
    }
}
