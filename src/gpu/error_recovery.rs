//! GPU Error Monitor
//!
//! wgpu reports most failures asynchronously through the uncaptured error
//! hook. Device and allocation failures are fatal here, so the monitor only
//! records the first one and lets the frame loop escalate it.

use crate::error::{VisibilityError, VisibilityResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct MonitorState {
    failed: AtomicBool,
    error_count: AtomicU32,
    first_error: Mutex<Option<String>>,
}

/// Latches uncaptured device errors until they are checked
#[derive(Clone)]
pub struct GpuErrorMonitor {
    state: Arc<MonitorState>,
}

impl GpuErrorMonitor {
    /// Install the uncaptured error hook on a device
    pub fn install(device: &wgpu::Device) -> Self {
        let state = Arc::new(MonitorState::default());
        let hook_state = state.clone();

        device.on_uncaptured_error(Box::new(move |error| {
            let message = match &error {
                wgpu::Error::OutOfMemory { .. } => {
                    log::error!("[GPU Error Monitor] GPU out of memory!");
                    "GPU out of memory".to_string()
                }
                wgpu::Error::Validation { description, .. } => {
                    log::error!("[GPU Error Monitor] GPU validation error: {}", description);
                    description.clone()
                }
            };
            record_error(&hook_state, message);
        }));

        Self { state }
    }

    /// Number of errors seen since installation
    pub fn error_count(&self) -> u32 {
        self.state.error_count.load(Ordering::Relaxed)
    }

    /// Fail with the first recorded error, if any
    pub fn check(&self) -> VisibilityResult<()> {
        if !self.state.failed.load(Ordering::Acquire) {
            return Ok(());
        }
        let message = self
            .state
            .first_error
            .lock()
            .clone()
            .unwrap_or_else(|| "unknown GPU error".to_string());
        Err(VisibilityError::GpuFatal { message })
    }
}

fn record_error(state: &MonitorState, message: String) {
    state.error_count.fetch_add(1, Ordering::Relaxed);
    let mut first = state.first_error.lock();
    if first.is_none() {
        *first = Some(message);
    }
    state.failed.store(true, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_wins() {
        let monitor = GpuErrorMonitor {
            state: Arc::new(MonitorState::default()),
        };
        assert!(monitor.check().is_ok());

        record_error(&monitor.state, "buffer too large".to_string());
        record_error(&monitor.state, "second".to_string());

        assert_eq!(monitor.error_count(), 2);
        match monitor.check() {
            Err(VisibilityError::GpuFatal { message }) => assert_eq!(message, "buffer too large"),
            other => panic!("unexpected {:?}", other.err()),
        }
    }
}
