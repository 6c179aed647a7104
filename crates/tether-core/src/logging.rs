//! Logging facilities for tether.
//!
//! tether uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("tether_net=debug")
//!         .init();
//! }
//! ```
//!
//! Every event emitted by the workspace carries one of the [`targets`]
//! below, so a single crate-level directive (`tether_net=info`) or a
//! subsystem directive (`tether_net::handshake=trace`) can be used.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "tether_core::signal";
    /// URL parsing target.
    pub const URL: &str = "tether_net::url";
    /// Upgrade handshake target.
    pub const HANDSHAKE: &str = "tether_net::handshake";
    /// Frame transport target.
    pub const TRANSPORT: &str = "tether_net::transport";
    /// Connection lifecycle target.
    pub const CLIENT: &str = "tether_net::client";
    /// Message dispatcher target.
    pub const DISPATCH: &str = "tether_net::dispatch";
    /// Link provider target.
    pub const LINK: &str = "tether_net::link";
    /// Device configuration target.
    pub const CONFIG: &str = "tether::config";
}

/// Span names used for tracing reconnect cycles.
pub mod span_names {
    /// One full reconnect cycle, from `LinkDown` to `Closing`.
    pub const CYCLE: &str = "tether::cycle";
    /// The connected message loop.
    pub const SESSION: &str = "tether::session";
}
