//! OS-level input synthesis
//!
//! The native file picker the browser opens is outside the page, so it can only
//! be driven blind, through synthesized keystrokes. This module is the narrow
//! capability the rest of the engine depends on.

use crate::AutomationError;
use std::sync::Arc;
use std::time::Duration;

pub mod keymap;
#[cfg(any(target_os = "windows", target_os = "macos"))]
pub mod os;

/// Non-character keys the engine needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeKey {
    Enter,
    Tab,
    /// Select everything in the focused field (Ctrl+A, Cmd+A on macOS)
    SelectAll,
}

impl std::fmt::Display for NativeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NativeKey::Enter => f.write_str("enter"),
            NativeKey::Tab => f.write_str("tab"),
            NativeKey::SelectAll => f.write_str("select-all"),
        }
    }
}

#[async_trait::async_trait]
pub trait NativeInput: Send + Sync {
    /// Type `text` into whatever window has the OS focus, pausing `interval` between characters
    async fn type_text(&self, text: &str, interval: Duration) -> Result<(), AutomationError>;

    /// Whether any top-level window currently holds the OS focus
    fn has_active_window(&self) -> bool;

    async fn press_key(&self, key: NativeKey) -> Result<(), AutomationError>;
}

/// Create the input adapter for the current platform
pub fn create_input() -> Result<Arc<dyn NativeInput>, AutomationError> {
    #[cfg(any(target_os = "windows", target_os = "macos"))]
    {
        Ok(Arc::new(os::OsInput::new()))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        Err(AutomationError::UnsupportedPlatform(
            "Native dialog input is only available on Windows and macOS".to_string(),
        ))
    }
}
