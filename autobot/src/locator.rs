use tracing::{debug, instrument};

use crate::browser::{BrowserEngine, ElementRef};
use crate::errors::AutomationError;
use crate::selector::Selector;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

// Default timeout if none is specified on the locator itself
const DEFAULT_LOCATOR_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A selector plus an explicit bound on how long to wait for it
#[derive(Clone)]
pub struct Locator {
    engine: Arc<dyn BrowserEngine>,
    selector: Selector,
    timeout: Duration,
    poll_interval: Duration,
}

impl Locator {
    pub fn new(engine: Arc<dyn BrowserEngine>, selector: impl Into<Selector>) -> Self {
        Self {
            engine,
            selector: selector.into(),
            timeout: DEFAULT_LOCATOR_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn set_default_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn set_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Wait for an element matching the selector to be present, up to the specified timeout.
    /// If no timeout is provided, uses the locator's default timeout.
    #[instrument(level = "debug", skip(self, timeout), fields(selector = %self.selector))]
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<ElementRef, AutomationError> {
        self.poll(timeout, false).await
    }

    /// Like [`Locator::wait`], but also requires the element to be displayed and enabled.
    #[instrument(level = "debug", skip(self, timeout), fields(selector = %self.selector))]
    pub async fn wait_clickable(
        &self,
        timeout: Option<Duration>,
    ) -> Result<ElementRef, AutomationError> {
        self.poll(timeout, true).await
    }

    /// Wait for the element, then click it once.
    pub async fn click(&self, timeout: Option<Duration>) -> Result<ElementRef, AutomationError> {
        let element = self.wait(timeout).await?;
        self.engine.click(&element).await?;
        Ok(element)
    }

    async fn poll(
        &self,
        timeout: Option<Duration>,
        require_interactable: bool,
    ) -> Result<ElementRef, AutomationError> {
        let effective_timeout = timeout.unwrap_or(self.timeout);
        let deadline = Instant::now() + effective_timeout;
        let mut last_error: Option<AutomationError> = None;

        loop {
            match self.engine.find_elements(&self.selector).await {
                Ok(found) => {
                    for element in found {
                        if !require_interactable {
                            return Ok(element);
                        }
                        match self.engine.is_interactable(&element).await {
                            Ok(true) => return Ok(element),
                            Ok(false) => {}
                            Err(e) => last_error = Some(e),
                        }
                    }
                }
                // Transient lookups failures (navigation in progress, stale frame) are polled through
                Err(e) => last_error = Some(e),
            }

            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        let condition = if require_interactable {
            "clickable"
        } else {
            "present"
        };
        debug!(selector = %self.selector, ?effective_timeout, "Element wait expired");
        Err(AutomationError::ElementNotFound(match last_error {
            Some(e) => format!(
                "Timed out after {effective_timeout:?} waiting for {} to be {condition}. Last error: {e}",
                self.selector
            ),
            None => format!(
                "Timed out after {effective_timeout:?} waiting for {} to be {condition}",
                self.selector
            ),
        }))
    }
}
