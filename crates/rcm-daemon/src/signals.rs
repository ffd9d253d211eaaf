//! Signal handling for graceful daemon shutdown.
//!
//! SIGTERM and SIGINT request shutdown; SIGHUP requests a statistics
//! reset. Signal handlers must be async-signal-safe, so they only set
//! static atomic flags which the scan loop polls between scans.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::debug;

static SHUTDOWN_FLAG: AtomicBool = AtomicBool::new(false);
static RESET_FLAG: AtomicBool = AtomicBool::new(false);
static SIGNAL_COUNT: AtomicU32 = AtomicU32::new(0);

/// Handle over the process-wide signal flags.
#[derive(Debug, Clone, Copy)]
pub struct Signals {
    _private: (),
}

impl Signals {
    /// Install the Unix signal handlers and return a handle.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` keeps room for platforms where
    /// registration can fail.
    pub fn install() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            use std::os::raw::c_int;

            extern "C" fn on_shutdown(_: c_int) {
                SIGNAL_COUNT.fetch_add(1, Ordering::Relaxed);
                SHUTDOWN_FLAG.store(true, Ordering::Relaxed);
            }

            extern "C" fn on_reset(_: c_int) {
                SIGNAL_COUNT.fetch_add(1, Ordering::Relaxed);
                RESET_FLAG.store(true, Ordering::Relaxed);
            }

            // SAFETY: the handlers only touch static atomics, which is
            // async-signal-safe.
            #[allow(unsafe_code)]
            unsafe {
                libc::signal(libc::SIGTERM, on_shutdown as libc::sighandler_t);
                libc::signal(libc::SIGINT, on_shutdown as libc::sighandler_t);
                libc::signal(libc::SIGHUP, on_reset as libc::sighandler_t);
            }
            debug!("Unix signal handlers registered");
        }

        Ok(Self { _private: () })
    }

    /// Whether shutdown has been requested.
    #[inline]
    #[must_use]
    pub fn shutdown_requested(self) -> bool {
        SHUTDOWN_FLAG.load(Ordering::Relaxed)
    }

    /// Whether a statistics reset has been requested; clears the flag.
    #[inline]
    #[must_use]
    pub fn take_reset_request(self) -> bool {
        RESET_FLAG.swap(false, Ordering::Relaxed)
    }

    /// Request shutdown from within the process.
    pub fn request_shutdown(self) {
        SHUTDOWN_FLAG.store(true, Ordering::Relaxed);
    }

    /// Total signals received since start.
    #[must_use]
    pub fn signal_count(self) -> u32 {
        SIGNAL_COUNT.load(Ordering::Relaxed)
    }
}
