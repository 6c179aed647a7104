//! Core systems for tether.
//!
//! This crate provides the foundational pieces shared by the tether
//! networking crates:
//!
//! - **Signal/Slot System**: Type-safe event delivery for lifecycle events
//! - **Cancellation**: A cloneable token raced against every suspension point
//! - **Logging**: `tracing` target and span names used across the workspace
//!
//! # Signal/Slot Example
//!
//! ```
//! use tether_core::Signal;
//!
//! let attempts = Signal::<u32>::new();
//! let conn_id = attempts.connect(|n| println!("attempt {n}"));
//! attempts.emit(1);
//! attempts.disconnect(conn_id);
//! ```
//!
//! # Cancellation Example
//!
//! ```
//! use tether_core::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let handle = token.clone();
//! handle.cancel();
//! assert!(token.is_cancelled());
//! ```

mod cancel;
pub mod logging;
pub mod signal;

pub use cancel::CancellationToken;
pub use signal::{ConnectionId, Signal};
