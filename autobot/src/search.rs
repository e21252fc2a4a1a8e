use crate::browser::{keys, BrowserEngine};
use crate::errors::AutomationError;
use crate::locator::Locator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Drives the remote quick-search control
pub struct RemoteSearchNavigator {
    engine: Arc<dyn BrowserEngine>,
    search_input: Locator,
}

impl RemoteSearchNavigator {
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        search_input_id: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        let search_input = Locator::new(engine.clone(), search_input_id)
            .set_default_timeout(timeout)
            .set_poll_interval(poll_interval);
        Self {
            engine,
            search_input,
        }
    }

    /// Replace the search content with `case_id` and submit it.
    ///
    /// Whether a record matched is not checked here; the following steps fail
    /// when it did not.
    #[instrument(skip(self))]
    pub async fn search(&self, case_id: &str) -> Result<(), AutomationError> {
        let input = self.search_input.wait(None).await?;
        self.engine.clear(&input).await?;
        self.engine
            .send_keys(&input, &format!("{case_id}{}", keys::ENTER))
            .await?;
        info!("Submitted search for {}", case_id);
        Ok(())
    }
}
