//! Link provider backed by the host's network interfaces.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tether_core::Signal;
use tether_core::logging::targets;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::LinkProvider;
use crate::error::LinkError;

/// How long [`InterfaceLink::reassociate`] waits for the link.
pub const DEFAULT_ASSOCIATION_TIMEOUT: Duration = Duration::from_secs(20);

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Treats the link as up while any non-loopback interface is up and has an
/// address.
///
/// A platform watcher keeps the cached state current and wakes pending
/// [`reassociate`](LinkProvider::reassociate) calls; the interface list is
/// also re-polled once a second in case a change is missed.
///
/// # Signals
///
/// - [`online_state_changed`](Self::online_state_changed): Emitted when the
///   link flips between up and down
pub struct InterfaceLink {
    online: Arc<AtomicBool>,
    changed: Arc<Notify>,
    association_timeout: Duration,
    watch: Mutex<Option<netwatcher::WatchHandle>>,

    /// Signal emitted when the online state changes.
    pub online_state_changed: Arc<Signal<bool>>,
}

impl InterfaceLink {
    /// Create a provider and start watching interfaces.
    pub fn new() -> Result<Self, LinkError> {
        let link = Self {
            online: Arc::new(AtomicBool::new(check_online_state())),
            changed: Arc::new(Notify::new()),
            association_timeout: DEFAULT_ASSOCIATION_TIMEOUT,
            watch: Mutex::new(None),
            online_state_changed: Arc::new(Signal::new()),
        };
        link.start()?;
        Ok(link)
    }

    /// Set how long `reassociate` waits before reporting a timeout.
    pub fn association_timeout(mut self, timeout: Duration) -> Self {
        self.association_timeout = timeout;
        self
    }

    fn start(&self) -> Result<(), LinkError> {
        let online = Arc::clone(&self.online);
        let changed = Arc::clone(&self.changed);
        let signal = Arc::clone(&self.online_state_changed);

        let handle = netwatcher::watch_interfaces(move |_update| {
            let now = check_online_state();
            if online.swap(now, Ordering::SeqCst) != now {
                tracing::info!(target: targets::LINK, online = now, "link state changed");
                changed.notify_waiters();
                signal.emit(now);
            }
        })
        .map_err(|e| LinkError::Unavailable(e.to_string()))?;

        *self.watch.lock() = Some(handle);
        Ok(())
    }

    fn refresh(&self) -> bool {
        let now = check_online_state();
        if self.online.swap(now, Ordering::SeqCst) != now {
            self.online_state_changed.emit(now);
        }
        now
    }
}

impl LinkProvider for InterfaceLink {
    fn is_up(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    async fn reassociate(&self) -> Result<(), LinkError> {
        let deadline = Instant::now() + self.association_timeout;
        loop {
            if self.refresh() {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    target: targets::LINK,
                    timeout = ?self.association_timeout,
                    "link did not come up"
                );
                return Err(LinkError::TimedOut(self.association_timeout));
            }
            let wait = POLL_INTERVAL.min(deadline - now);
            let _ = tokio::time::timeout(wait, self.changed.notified()).await;
        }
    }

    fn local_address(&self) -> Option<IpAddr> {
        let iface = netdev::get_default_interface().ok()?;
        iface
            .ipv4
            .first()
            .map(|net| IpAddr::V4(net.addr()))
            .or_else(|| iface.ipv6.first().map(|net| IpAddr::V6(net.addr())))
    }
}

impl Drop for InterfaceLink {
    fn drop(&mut self) {
        self.watch.lock().take();
    }
}

fn check_online_state() -> bool {
    netdev::get_interfaces()
        .iter()
        .any(|iface| iface.is_up() && !iface.is_loopback() && has_addresses(iface))
}

fn has_addresses(iface: &netdev::Interface) -> bool {
    !iface.ipv4.is_empty() || !iface.ipv6.is_empty()
}
