//! Automated inclusion of local PDF receipts into SEI case records
//!
//! Each file named `<segment>.<segment>...pdf` is uploaded as an external
//! document of the record `<segment>/<segment>/...`. The remote form is driven
//! through a WebDriver session; the native file picker, which the page cannot
//! reach, is driven through OS-level keystrokes.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

pub mod batch;
pub mod browser;
pub mod browser_script;
pub mod case_id;
pub mod config;
pub mod dialog;
pub mod discovery;
pub mod errors;
pub mod frame;
pub mod input;
pub mod locator;
pub mod retry;
pub mod search;
pub mod selector;
pub mod workflow;

pub use batch::{BatchReport, BatchRequest, Credentials};
pub use browser::{BrowserEngine, ElementRef};
pub use case_id::CaseId;
pub use config::EngineConfig;
pub use errors::AutomationError;
pub use input::{NativeInput, NativeKey};
pub use locator::Locator;
pub use retry::RetryBudget;
pub use selector::Selector;
pub use workflow::{FileStatus, FileTask, WorkflowState};

/// The main entry point for a batch upload
#[derive(Debug, Clone, Default)]
pub struct Autobot {
    config: EngineConfig,
}

impl Autobot {
    pub fn new(config: EngineConfig) -> Result<Self, AutomationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Upload every matching file of `source_directory` into its case record.
    ///
    /// Per-file failures are recorded in the returned report. Errors are
    /// returned only for run-level problems: bad inputs, browser setup, login,
    /// or closing the session. Cancelling `cancel` stops the run after the
    /// file in progress; the session is still closed.
    #[instrument(skip(self, username, password, cancel))]
    pub async fn run(
        &self,
        username: &str,
        password: &str,
        source_directory: &str,
        cancel: CancellationToken,
    ) -> Result<BatchReport, AutomationError> {
        let request = BatchRequest::new(username, password, source_directory)?;
        let input = input::create_input()?;
        let tasks = batch::prepare_tasks(&request, &self.config)?;
        info!(
            "Starting automation for {} file(s) in {}",
            tasks.len(),
            request.source_directory.display()
        );

        let engine: Arc<dyn BrowserEngine> = browser::create_engine(&self.config).await?;
        batch::run_batch(engine, input, &self.config, &request, tasks, cancel).await
    }
}
