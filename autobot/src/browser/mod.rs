use crate::config::EngineConfig;
use crate::{AutomationError, Selector};
use serde_json::Value;
use std::sync::Arc;

pub mod webdriver;

pub use webdriver::WebDriverSession;

/// Opaque reference to an element of the current page, valid until the page navigates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Keys that can be sent to a page element alongside plain text
pub mod keys {
    /// W3C WebDriver code point for the Enter key
    pub const ENTER: &str = "\u{E007}";
}

/// Everything the engine needs from a browser session.
///
/// Lookups are single probes; waiting lives in [`crate::Locator`], so every
/// wait has an explicit, per-call bound.
#[async_trait::async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Load a URL in the current top-level browsing context
    async fn navigate(&self, url: &str) -> Result<(), AutomationError>;

    /// All elements currently matching the selector in the current frame context
    async fn find_elements(&self, selector: &Selector) -> Result<Vec<ElementRef>, AutomationError>;

    async fn click(&self, element: &ElementRef) -> Result<(), AutomationError>;

    async fn clear(&self, element: &ElementRef) -> Result<(), AutomationError>;

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), AutomationError>;

    /// Displayed and enabled
    async fn is_interactable(&self, element: &ElementRef) -> Result<bool, AutomationError>;

    /// Run a synchronous script; `arguments[i]` inside the script maps to `args[i]`
    async fn execute_script(&self, script: &str, args: Vec<Value>)
        -> Result<Value, AutomationError>;

    /// Make the given frame element the context of subsequent lookups
    async fn switch_to_frame(&self, frame: &ElementRef) -> Result<(), AutomationError>;

    /// Return to the top-level document
    async fn switch_to_default(&self) -> Result<(), AutomationError>;

    /// End the session and close the browser
    async fn quit(&self) -> Result<(), AutomationError>;
}

/// Open a browser session through the configured WebDriver endpoint
pub async fn create_engine(
    config: &EngineConfig,
) -> Result<Arc<dyn BrowserEngine>, AutomationError> {
    let session = WebDriverSession::start(&config.webdriver_url, &config.browser_args).await?;
    Ok(Arc::new(session))
}
