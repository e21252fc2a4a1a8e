use crate::browser::BrowserEngine;
use crate::locator::Locator;
use crate::selector::Selector;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tracks which embedded sub-document element lookups currently target.
///
/// `enter` is tolerant: a page rendered without the frame leaves the context
/// where it was. `exit` always lands on the top-level document and never fails.
pub struct FrameContext {
    engine: Arc<dyn BrowserEngine>,
    timeout: Duration,
    poll_interval: Duration,
    current: Mutex<Option<String>>,
}

impl FrameContext {
    pub fn new(engine: Arc<dyn BrowserEngine>, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            engine,
            timeout,
            poll_interval,
            current: Mutex::new(None),
        }
    }

    /// Name of the frame lookups target, `None` for the top-level document
    pub fn current(&self) -> Option<String> {
        self.current.lock().map(|c| c.clone()).unwrap_or(None)
    }

    /// Switch into the frame with the given name or id. Returns whether the switch happened.
    pub async fn enter(&self, frame_name: &str) -> bool {
        let locator = Locator::new(self.engine.clone(), Selector::frame(frame_name))
            .set_default_timeout(self.timeout)
            .set_poll_interval(self.poll_interval);

        let frame = match locator.wait(None).await {
            Ok(frame) => frame,
            Err(e) => {
                info!(frame = frame_name, "Frame not present, staying in current context: {}", e);
                return false;
            }
        };

        match self.engine.switch_to_frame(&frame).await {
            Ok(()) => {
                debug!(frame = frame_name, "Switched into frame");
                self.set_current(Some(frame_name.to_string()));
                true
            }
            Err(e) => {
                warn!(frame = frame_name, "Failed to switch into frame: {}", e);
                false
            }
        }
    }

    /// Return to the top-level document. Idempotent.
    pub async fn exit(&self) {
        if let Err(e) = self.engine.switch_to_default().await {
            warn!("Failed to return to the top-level document: {}", e);
        }
        self.set_current(None);
    }

    fn set_current(&self, frame: Option<String>) {
        if let Ok(mut current) = self.current.lock() {
            *current = frame;
        }
    }
}
