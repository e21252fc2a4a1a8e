use super::{BrowserEngine, ElementRef};
use crate::{AutomationError, Selector};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Key under which W3C WebDriver serializes element references
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Lightweight W3C WebDriver client bound to a single session
#[derive(Debug)]
pub struct WebDriverSession {
    base_url: String,
    session_id: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct NewSessionValue {
    #[serde(rename = "sessionId")]
    session_id: String,
}

impl WebDriverSession {
    /// Create a new Chrome session on an already running driver (e.g. `chromedriver --port=9515`)
    pub async fn start(webdriver_url: &str, browser_args: &[String]) -> Result<Self, AutomationError> {
        let base_url = webdriver_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AutomationError::PlatformError(format!("Failed to build HTTP client: {e}")))?;

        let response = client
            .post(format!("{base_url}/session"))
            .json(&new_session_payload(browser_args))
            .send()
            .await
            .map_err(|e| {
                AutomationError::PlatformError(format!(
                    "Failed to reach WebDriver at {base_url}: {e}"
                ))
            })?;
        let value = read_response(response).await?;
        let created: NewSessionValue = serde_json::from_value(value).map_err(|e| {
            AutomationError::PlatformError(format!("Unexpected new-session response: {e}"))
        })?;

        info!(session_id = %created.session_id, "Browser session started");
        Ok(Self {
            base_url,
            session_id: created.session_id,
            client,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, AutomationError> {
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        debug!(%method, %url, "WebDriver command");
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| AutomationError::PlatformError(format!("WebDriver request failed: {e}")))?;
        read_response(response).await
    }

    fn element_path(element: &ElementRef, suffix: &str) -> String {
        format!("/element/{}{}", element.id(), suffix)
    }
}

#[async_trait::async_trait]
impl BrowserEngine for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<(), AutomationError> {
        info!("Navigating to {}", url);
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn find_elements(&self, selector: &Selector) -> Result<Vec<ElementRef>, AutomationError> {
        let (using, value) = selector.to_webdriver();
        let found = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": using, "value": value })),
            )
            .await?;
        element_refs(&found)
    }

    async fn click(&self, element: &ElementRef) -> Result<(), AutomationError> {
        self.command(Method::POST, &Self::element_path(element, "/click"), Some(json!({})))
            .await
            .map(|_| ())
    }

    async fn clear(&self, element: &ElementRef) -> Result<(), AutomationError> {
        self.command(Method::POST, &Self::element_path(element, "/clear"), Some(json!({})))
            .await
            .map(|_| ())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), AutomationError> {
        self.command(
            Method::POST,
            &Self::element_path(element, "/value"),
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    async fn is_interactable(&self, element: &ElementRef) -> Result<bool, AutomationError> {
        let displayed = self
            .command(Method::GET, &Self::element_path(element, "/displayed"), None)
            .await?;
        if displayed.as_bool() != Some(true) {
            return Ok(false);
        }
        let enabled = self
            .command(Method::GET, &Self::element_path(element, "/enabled"), None)
            .await?;
        Ok(enabled.as_bool() == Some(true))
    }

    async fn execute_script(
        &self,
        script: &str,
        args: Vec<Value>,
    ) -> Result<Value, AutomationError> {
        debug!(
            script_bytes = script.len(),
            script_preview = %script.trim().chars().take(80).collect::<String>(),
            "Executing script"
        );
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    async fn switch_to_frame(&self, frame: &ElementRef) -> Result<(), AutomationError> {
        self.command(
            Method::POST,
            "/frame",
            Some(json!({ "id": element_value(frame) })),
        )
        .await
        .map(|_| ())
    }

    async fn switch_to_default(&self) -> Result<(), AutomationError> {
        self.command(Method::POST, "/frame", Some(json!({ "id": null })))
            .await
            .map(|_| ())
    }

    async fn quit(&self) -> Result<(), AutomationError> {
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| AutomationError::PlatformError(format!("Failed to end session: {e}")))?;
        read_response(response).await?;
        info!(session_id = %self.session_id, "Browser session closed");
        Ok(())
    }
}

/// Capabilities for a new Chrome session
pub fn new_session_payload(browser_args: &[String]) -> Value {
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": { "args": browser_args }
            }
        }
    })
}

async fn read_response(response: reqwest::Response) -> Result<Value, AutomationError> {
    let status = response.status();
    let body: Value = response.json().await.map_err(|e| {
        AutomationError::PlatformError(format!(
            "Failed to parse WebDriver response (HTTP {status}): {e}"
        ))
    })?;
    unwrap_value(status.is_success(), body)
}

/// Extract `value` from a WebDriver response body, turning error payloads into errors.
pub fn unwrap_value(success: bool, mut body: Value) -> Result<Value, AutomationError> {
    let value = body.get_mut("value").map(Value::take).unwrap_or(Value::Null);
    let error = value.get("error").and_then(Value::as_str).map(str::to_string);
    match error {
        None if success => Ok(value),
        error => {
            let error = error.unwrap_or_else(|| "unknown error".to_string());
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            warn!(%error, %message, "WebDriver returned an error");
            Err(match error.as_str() {
                "no such element" | "no such frame" => AutomationError::ElementNotFound(message),
                _ => AutomationError::WebDriver { error, message },
            })
        }
    }
}

/// Serialize an element reference the way the driver expects it in payloads
pub fn element_value(element: &ElementRef) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(ELEMENT_KEY.to_string(), Value::String(element.id().to_string()));
    Value::Object(map)
}

/// Decode a list of serialized element references
pub fn element_refs(value: &Value) -> Result<Vec<ElementRef>, AutomationError> {
    let items = value.as_array().ok_or_else(|| {
        AutomationError::PlatformError(format!("Expected an element list, got {value}"))
    })?;
    items
        .iter()
        .map(|item| {
            item.get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(|id| ElementRef(id.to_string()))
                .ok_or_else(|| {
                    AutomationError::PlatformError(format!("Malformed element reference: {item}"))
                })
        })
        .collect()
}
