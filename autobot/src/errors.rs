use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    /// Missing or unusable run input (directory, credentials, configuration)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File name does not follow the `<segment>.<segment>...pdf` convention
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Native dialog interaction failed: {0}")]
    DialogInteraction(String),

    #[error("WebDriver error ({error}): {message}")]
    WebDriver { error: String, message: String },

    #[error("Platform-specific error: {0}")]
    PlatformError(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The run was asked to stop before this work started
    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AutomationError {
    /// Whether repeating the same step can plausibly succeed.
    ///
    /// Naming-convention violations and bad run inputs are terminal; everything
    /// that comes from the remote page or the OS may be transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            AutomationError::InvalidInput(_)
                | AutomationError::InvalidName(_)
                | AutomationError::UnsupportedPlatform(_)
                | AutomationError::Cancelled(_)
        )
    }
}
