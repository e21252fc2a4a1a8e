use crate::browser::BrowserEngine;
use crate::config::EngineConfig;
use crate::discovery::discover_files;
use crate::errors::AutomationError;
use crate::input::NativeInput;
use crate::locator::Locator;
use crate::workflow::{DocumentInclusionWorkflow, FileStatus, FileTask};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Login data. Only ever held in memory for the duration of a run.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything one run needs from the caller
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub credentials: Credentials,
    pub source_directory: PathBuf,
}

impl BatchRequest {
    /// Validate the raw shell inputs. Empty fields are rejected.
    pub fn new(username: &str, password: &str, source_directory: &str) -> Result<Self, AutomationError> {
        let source_directory = source_directory.trim();
        if username.is_empty() || password.is_empty() || source_directory.is_empty() {
            return Err(AutomationError::InvalidInput(
                "Username, password and source directory are all required".to_string(),
            ));
        }
        let source_directory = std::path::absolute(Path::new(source_directory)).map_err(|e| {
            AutomationError::InvalidInput(format!(
                "Cannot resolve source directory {source_directory}: {e}"
            ))
        })?;
        Ok(Self {
            credentials: Credentials {
                username: username.to_string(),
                password: password.to_string(),
            },
            source_directory,
        })
    }
}

/// Outcome of a run, one entry per discovered file in processing order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub tasks: Vec<FileTask>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.tasks.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(FileStatus::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(FileStatus::Failed)
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, status: FileStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }
}

/// Discover the candidate files of the request and build one task per file.
pub fn prepare_tasks(
    request: &BatchRequest,
    config: &EngineConfig,
) -> Result<Vec<FileTask>, AutomationError> {
    let extension = config.extension();
    let files = discover_files(&request.source_directory, extension)?;
    let tasks: Vec<FileTask> = files
        .iter()
        .map(|name| FileTask::new(&request.source_directory, name, extension))
        .collect();
    for task in tasks.iter().filter(|t| t.status == FileStatus::Failed) {
        warn!(
            file = %task.file_name,
            "Will not process: {}",
            task.last_error.as_deref().unwrap_or_default()
        );
    }
    Ok(tasks)
}

/// Log in and process `tasks` one at a time on an open browser session.
///
/// `cancel` is checked between files: a file already underway runs to its
/// end, the ones after it are marked failed as cancelled. The session is
/// closed on every path. A teardown failure is reported only when nothing
/// else failed first.
#[instrument(skip_all, fields(directory = %request.source_directory.display(), files = tasks.len()))]
pub async fn run_batch(
    engine: Arc<dyn BrowserEngine>,
    input: Arc<dyn NativeInput>,
    config: &EngineConfig,
    request: &BatchRequest,
    tasks: Vec<FileTask>,
    cancel: CancellationToken,
) -> Result<BatchReport, AutomationError> {
    let outcome = run_session(engine.clone(), input, config, request, tasks, &cancel).await;
    let teardown = engine.quit().await;

    match (outcome, teardown) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(e)) => {
            error!("Failed to close the browser session: {}", e);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(teardown_error)) => {
            error!(
                "Failed to close the browser session after an earlier error: {}",
                teardown_error
            );
            Err(e)
        }
    }
}

async fn run_session(
    engine: Arc<dyn BrowserEngine>,
    input: Arc<dyn NativeInput>,
    config: &EngineConfig,
    request: &BatchRequest,
    mut tasks: Vec<FileTask>,
    cancel: &CancellationToken,
) -> Result<BatchReport, AutomationError> {
    if cancel.is_cancelled() {
        cancel_pending(&mut tasks);
        return Ok(BatchReport { tasks });
    }
    login(engine.clone(), config, &request.credentials).await?;

    let workflow = DocumentInclusionWorkflow::new(
        engine,
        input,
        config.clone(),
        request.source_directory.clone(),
    );
    let total = tasks.len();
    info!("Processing {} file(s)", total);
    for (index, task) in tasks.iter_mut().enumerate() {
        if cancel.is_cancelled() {
            warn!(remaining = total - index, "Cancellation requested, skipping the remaining files");
            break;
        }
        workflow.process(task).await;
    }
    cancel_pending(&mut tasks);

    let report = BatchReport { tasks };
    info!(
        total = report.total(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        "Batch finished"
    );
    Ok(report)
}

fn cancel_pending(tasks: &mut [FileTask]) {
    let cancelled = AutomationError::Cancelled("run stopped before this file was processed".to_string());
    for task in tasks.iter_mut().filter(|t| !t.status.is_terminal()) {
        task.fail(&cancelled);
    }
}

/// Authenticate against the remote application's login form
#[instrument(skip_all, fields(username = %credentials.username))]
pub async fn login(
    engine: Arc<dyn BrowserEngine>,
    config: &EngineConfig,
    credentials: &Credentials,
) -> Result<(), AutomationError> {
    let landmarks = &config.landmarks;
    let timings = &config.timings;
    let locate = |id: &str| {
        Locator::new(engine.clone(), id)
            .set_default_timeout(timings.element_timeout)
            .set_poll_interval(timings.poll_interval)
    };

    engine.navigate(&config.base_url).await?;
    let username = locate(&landmarks.username_field).wait(None).await?;
    engine.send_keys(&username, &credentials.username).await?;
    let password = locate(&landmarks.password_field).wait(None).await?;
    engine.send_keys(&password, &credentials.password).await?;
    locate(&landmarks.login_submit).click(None).await?;
    info!("Login submitted");
    Ok(())
}
