use crate::errors::AutomationError;
use crate::input::{NativeInput, NativeKey};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Something that (re)opens the native dialog, typically the page's attach control.
#[async_trait::async_trait]
pub trait DialogTrigger: Send + Sync {
    async fn summon(&self) -> Result<(), AutomationError>;
}

/// Types a path into the native file-open dialog and confirms it.
///
/// Nothing here can see the dialog; success is only observable through the
/// steps that follow.
pub struct NativeDialogInjector {
    input: Arc<dyn NativeInput>,
    /// Delay between synthesized characters
    pub interval: Duration,
    pub attempts: u32,
    /// Pause after (re)summoning the dialog and after typing, before confirming
    pub settle: Duration,
}

impl NativeDialogInjector {
    pub fn new(input: Arc<dyn NativeInput>, interval: Duration, attempts: u32, settle: Duration) -> Self {
        Self {
            input,
            interval,
            attempts,
            settle,
        }
    }

    /// Type `path` into the focused dialog and press Enter.
    ///
    /// Each attempt first requires a focused foreground window; when none is
    /// found, `trigger` is asked to summon the dialog again. Every typing pass
    /// selects the whole field first, so a retry replaces whatever an earlier
    /// pass left behind instead of extending it. A completed pass is never
    /// repeated because the dialog cannot be inspected.
    #[instrument(skip(self, trigger), fields(path = %path.display()))]
    pub async fn type_path(
        &self,
        path: &Path,
        trigger: &dyn DialogTrigger,
    ) -> Result<(), AutomationError> {
        let text = path.to_str().ok_or_else(|| {
            AutomationError::DialogInteraction(format!(
                "Path {} is not valid UTF-8",
                path.display()
            ))
        })?;
        let attempts = self.attempts.max(1);
        let mut last_failure = String::from("no attempt made");

        for attempt in 1..=attempts {
            if !self.input.has_active_window() {
                warn!(attempt, attempts, "No active window detected for the file dialog");
                last_failure = "no active window for the file dialog".to_string();
                if attempt < attempts {
                    trigger.summon().await?;
                    tokio::time::sleep(self.settle).await;
                }
                continue;
            }

            // Leftovers of an interrupted pass must be overwritten, not appended to
            let typed = match self.input.press_key(NativeKey::SelectAll).await {
                Ok(()) => self.input.type_text(text, self.interval).await,
                Err(e) => Err(e),
            };
            match typed {
                Ok(()) => {
                    info!(attempt, "Path typed into the file dialog");
                    tokio::time::sleep(self.settle).await;
                    self.input.press_key(NativeKey::Enter).await.map_err(|e| {
                        AutomationError::DialogInteraction(format!(
                            "Failed to confirm the file dialog: {e}"
                        ))
                    })?;
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, attempts, "Typing into the file dialog failed: {}", e);
                    last_failure = e.to_string();
                }
            }
        }

        Err(AutomationError::DialogInteraction(format!(
            "Gave up after {attempts} attempt(s): {last_failure}"
        )))
    }
}
