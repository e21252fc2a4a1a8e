//! Document-inclusion state machine
//!
//! One [`FileTask`] per discovered file, driven forward through
//! search → include → external → metadata → attach → save. A failure is recorded
//! on the task and never escapes [`DocumentInclusionWorkflow::process`].

use crate::browser::{BrowserEngine, ElementRef};
use crate::browser_script;
use crate::case_id::{self, CaseId};
use crate::config::EngineConfig;
use crate::dialog::{DialogTrigger, NativeDialogInjector};
use crate::errors::AutomationError;
use crate::frame::FrameContext;
use crate::input::{NativeInput, NativeKey};
use crate::locator::Locator;
use crate::retry::run_with_retry;
use crate::search::RemoteSearchNavigator;
use crate::selector::Selector;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl FileStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, FileStatus::Succeeded | FileStatus::Failed)
    }
}

/// Progress of one file through the remote inclusion form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkflowState {
    Idle,
    Searching,
    ActionMenuOpen,
    ExternalDocSelected,
    MetadataFilled,
    FileAttached,
    Submitted,
    Done,
    Failed,
}

impl WorkflowState {
    /// The only state a successful step may lead to
    pub fn successor(self) -> Option<WorkflowState> {
        use WorkflowState::*;
        match self {
            Idle => Some(Searching),
            Searching => Some(ActionMenuOpen),
            ActionMenuOpen => Some(ExternalDocSelected),
            ExternalDocSelected => Some(MetadataFilled),
            MetadataFilled => Some(FileAttached),
            FileAttached => Some(Submitted),
            Submitted => Some(Done),
            Done | Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowState::Done | WorkflowState::Failed)
    }

    /// Forward by one step, or to `Failed` from any non-terminal state
    pub fn can_transition_to(self, next: WorkflowState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == WorkflowState::Failed || self.successor() == Some(next)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileTask {
    pub file_name: String,
    /// `None` when the name violates the naming convention
    #[serde(serialize_with = "serialize_case_id")]
    pub case_id: Option<CaseId>,
    pub absolute_path: PathBuf,
    pub status: FileStatus,
    pub state: WorkflowState,
    /// Last state reached before the task failed
    pub failed_at: Option<WorkflowState>,
    pub last_error: Option<String>,
}

fn serialize_case_id<S: serde::Serializer>(id: &Option<CaseId>, s: S) -> Result<S::Ok, S::Error> {
    match id {
        Some(id) => s.serialize_some(id.as_str()),
        None => s.serialize_none(),
    }
}

impl FileTask {
    /// Build the task for `file_name` found in `source_directory`.
    ///
    /// A name that does not resolve to a case id yields an already failed task.
    pub fn new(source_directory: &Path, file_name: &str, extension: &str) -> Self {
        let mut task = Self {
            file_name: file_name.to_string(),
            case_id: None,
            absolute_path: source_directory.join(file_name),
            status: FileStatus::Pending,
            state: WorkflowState::Idle,
            failed_at: None,
            last_error: None,
        };
        match case_id::resolve(file_name, extension) {
            Ok(id) => task.case_id = Some(id),
            Err(e) => task.fail(&e),
        }
        task
    }

    pub fn advance(&mut self, next: WorkflowState) -> Result<(), AutomationError> {
        if !self.state.can_transition_to(next) {
            return Err(AutomationError::Internal(format!(
                "Illegal workflow transition {:?} -> {:?} for {}",
                self.state, next, self.file_name
            )));
        }
        debug!(file = %self.file_name, from = ?self.state, to = ?next, "Workflow transition");
        self.state = next;
        Ok(())
    }

    pub(crate) fn fail(&mut self, error: &AutomationError) {
        if !self.state.is_terminal() {
            self.failed_at = Some(self.state);
            self.state = WorkflowState::Failed;
        }
        self.status = FileStatus::Failed;
        self.last_error = Some(error.to_string());
    }
}

/// The attach control; clicking it again re-summons the native dialog
struct AttachTrigger<'a> {
    engine: &'a dyn BrowserEngine,
    element: ElementRef,
}

#[async_trait::async_trait]
impl DialogTrigger for AttachTrigger<'_> {
    async fn summon(&self) -> Result<(), AutomationError> {
        info!("Re-triggering the file dialog");
        self.engine.click(&self.element).await
    }
}

pub struct DocumentInclusionWorkflow {
    engine: Arc<dyn BrowserEngine>,
    input: Arc<dyn NativeInput>,
    config: EngineConfig,
    source_directory: PathBuf,
    frame: FrameContext,
    search: RemoteSearchNavigator,
    injector: NativeDialogInjector,
}

impl DocumentInclusionWorkflow {
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        input: Arc<dyn NativeInput>,
        config: EngineConfig,
        source_directory: PathBuf,
    ) -> Self {
        let timings = &config.timings;
        let frame = FrameContext::new(engine.clone(), timings.frame_timeout, timings.poll_interval);
        let search = RemoteSearchNavigator::new(
            engine.clone(),
            &config.landmarks.quick_search,
            timings.element_timeout,
            timings.poll_interval,
        );
        let injector = NativeDialogInjector::new(
            input.clone(),
            timings.keystroke_interval,
            config.retry.max_attempts,
            timings.dialog_settle,
        );
        Self {
            engine,
            input,
            config,
            source_directory,
            frame,
            search,
            injector,
        }
    }

    pub fn frame(&self) -> &FrameContext {
        &self.frame
    }

    /// Drive one file to `Succeeded` or `Failed`. Always leaves the browser in the top-level document.
    #[instrument(skip_all, fields(file = %task.file_name))]
    pub async fn process(&self, task: &mut FileTask) {
        if task.status.is_terminal() {
            info!(
                "Skipping {}: {}",
                task.file_name,
                task.last_error.as_deref().unwrap_or("already processed")
            );
            return;
        }

        self.frame.exit().await;
        task.status = FileStatus::InProgress;
        info!("Processing file: {}", task.file_name);

        match self.drive(task).await {
            Ok(()) => {
                task.status = FileStatus::Succeeded;
                info!("File {} processed successfully", task.file_name);
            }
            Err(e) => {
                error!(
                    file = %task.file_name,
                    state = ?task.state,
                    error = %e,
                    detail = ?e,
                    "Failed to process file"
                );
                task.fail(&e);
            }
        }

        self.frame.exit().await;
    }

    async fn drive(&self, task: &mut FileTask) -> Result<(), AutomationError> {
        let case_id = task.case_id.clone().ok_or_else(|| {
            AutomationError::InvalidName(format!("{} has no case identifier", task.file_name))
        })?;

        self.search.search(case_id.as_str()).await?;
        task.advance(WorkflowState::Searching)?;

        self.open_action_menu().await?;
        task.advance(WorkflowState::ActionMenuOpen)?;

        self.select_external_document().await?;
        task.advance(WorkflowState::ExternalDocSelected)?;

        self.fill_metadata().await?;
        task.advance(WorkflowState::MetadataFilled)?;

        self.attach_file(&case_id).await?;
        task.advance(WorkflowState::FileAttached)?;

        self.submit().await?;
        task.advance(WorkflowState::Submitted)?;

        self.frame.exit().await;
        task.advance(WorkflowState::Done)
    }

    fn locator(&self, selector: impl Into<Selector>) -> Locator {
        Locator::new(self.engine.clone(), selector)
            .set_default_timeout(self.config.timings.element_timeout)
            .set_poll_interval(self.config.timings.poll_interval)
    }

    /// Every attempt restarts from the top-level document, re-enters the
    /// visualization frame and scans the anchors again.
    async fn click_anchor_with_retry(
        &self,
        label: &str,
        predicate: &browser_script::AnchorPredicate,
    ) -> Result<(), AutomationError> {
        let frame = &self.frame;
        let engine = self.engine.as_ref();
        let frame_name = self.config.landmarks.visualization_frame.as_str();
        run_with_retry(label, &self.config.retry, move |attempt| async move {
            info!(attempt, "Looking for '{}'", label);
            frame.exit().await;
            frame.enter(frame_name).await;
            browser_script::click_matching_anchor(engine, predicate).await
        })
        .await
    }

    async fn open_action_menu(&self) -> Result<(), AutomationError> {
        self.click_anchor_with_retry("include document", &self.config.landmarks.include_document)
            .await
    }

    async fn select_external_document(&self) -> Result<(), AutomationError> {
        self.click_anchor_with_retry("external document", &self.config.landmarks.external_document)
            .await
    }

    async fn fill_metadata(&self) -> Result<(), AutomationError> {
        let landmarks = &self.config.landmarks;
        let timings = &self.config.timings;

        self.frame.exit().await;
        self.frame.enter(&landmarks.visualization_frame).await;

        self.locator(landmarks.subtype_select.as_str()).click(None).await?;
        self.locator(Selector::option_with_text(
            &landmarks.subtype_select,
            &self.config.document.subtype,
        ))
        .click(None)
        .await?;
        info!("Selected document subtype '{}'", self.config.document.subtype);
        tokio::time::sleep(timings.selection_settle).await;

        let today = today(&self.config.document.date_format)?;
        self.locator(landmarks.elaboration_date.as_str())
            .wait(None)
            .await?;
        browser_script::set_value_by_id(self.engine.as_ref(), &landmarks.elaboration_date, &today)
            .await?;
        debug!("Elaboration date set to {}", today);
        tokio::time::sleep(timings.date_settle).await;

        self.locator(landmarks.born_digital_option.as_str())
            .click(None)
            .await?;

        self.locator(landmarks.access_level_section.as_str())
            .wait(None)
            .await?;
        self.locator(landmarks.public_access_option.as_str())
            .click(None)
            .await?;
        info!("Metadata filled");
        Ok(())
    }

    async fn attach_file(&self, case_id: &CaseId) -> Result<(), AutomationError> {
        let landmarks = &self.config.landmarks;

        self.locator(landmarks.attachments_form.as_str())
            .wait(None)
            .await?;
        let trigger = self
            .locator(landmarks.attach_trigger.as_str())
            .wait_clickable(None)
            .await?;
        self.engine.click(&trigger).await?;
        info!("File dialog triggered");
        tokio::time::sleep(self.config.timings.dialog_open_settle).await;

        let file_name = case_id.to_file_name();
        let path = self.source_directory.join(&file_name);
        let trigger = AttachTrigger {
            engine: self.engine.as_ref(),
            element: trigger,
        };
        self.injector.type_path(&path, &trigger).await?;
        info!("File {} selected", file_name);
        Ok(())
    }

    async fn submit(&self) -> Result<(), AutomationError> {
        let timings = &self.config.timings;
        tokio::time::sleep(timings.dialog_settle).await;
        self.press(NativeKey::Tab).await?;
        tokio::time::sleep(timings.focus_settle).await;
        self.press(NativeKey::Enter).await?;
        // No completion signal is exposed; the upload gets a fixed window
        tokio::time::sleep(timings.upload_settle).await;
        info!("Document saved");
        Ok(())
    }

    async fn press(&self, key: NativeKey) -> Result<(), AutomationError> {
        self.input.press_key(key).await.map_err(|e| {
            AutomationError::DialogInteraction(format!("Failed to press {key}: {e}"))
        })
    }
}

fn today(format: &str) -> Result<String, AutomationError> {
    let mut out = String::new();
    write!(out, "{}", chrono::Local::now().format(format)).map_err(|_| {
        AutomationError::InvalidInput(format!("Invalid date format '{format}'"))
    })?;
    Ok(out)
}
