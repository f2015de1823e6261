//! Cooperative cancellation for resolution and image passes.
//!
//! An `AbortToken` is checked before every fetch and while sleeping between
//! retries. Tripping it makes the running operation return `CyoaError::Aborted`
//! at the next boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::CyoaError;

/// Granularity of abort checks while sleeping.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Shared abort flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortToken {
    flag: Arc<AtomicBool>,
}

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request abort; every clone sees it.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// `Err(Aborted)` once the token has been tripped.
    pub fn check(&self) -> Result<(), CyoaError> {
        if self.is_aborted() {
            Err(CyoaError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Sleep for `d`, waking early with `Err(Aborted)` if the token trips.
    pub fn sleep(&self, d: Duration) -> Result<(), CyoaError> {
        let deadline = Instant::now() + d;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}
