//! Engine configuration
//!
//! Everything has a default matching the production SEI instance, so an empty
//! YAML file (or no file at all) yields a working configuration.

use crate::browser_script::AnchorPredicate;
use crate::errors::AutomationError;
use crate::retry::RetryBudget;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Login page of the remote application
    pub base_url: String,
    /// Endpoint of an already running WebDriver server (e.g. chromedriver)
    pub webdriver_url: String,
    /// Extra command-line switches handed to the browser
    pub browser_args: Vec<String>,
    /// Extension (without the dot) of the documents to upload
    pub document_extension: String,
    pub retry: RetryBudget,
    pub timings: Timings,
    pub landmarks: Landmarks,
    pub document: DocumentDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sei.funprespjud.com.br/".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            browser_args: vec!["--start-maximized".to_string()],
            document_extension: "pdf".to_string(),
            retry: RetryBudget::default(),
            timings: Timings::default(),
            landmarks: Landmarks::default(),
            document: DocumentDefaults::default(),
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a YAML file, filling unspecified fields with defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, AutomationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AutomationError::InvalidInput(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        let config = Self::from_yaml_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, AutomationError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
            .map_err(|e| AutomationError::InvalidInput(format!("Invalid configuration: {e}")))
    }

    pub fn validate(&self) -> Result<(), AutomationError> {
        if self.retry.max_attempts == 0 {
            return Err(AutomationError::InvalidInput(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.document_extension.trim_start_matches('.').is_empty() {
            return Err(AutomationError::InvalidInput(
                "document_extension must not be empty".to_string(),
            ));
        }
        if self.base_url.is_empty() || self.webdriver_url.is_empty() {
            return Err(AutomationError::InvalidInput(
                "base_url and webdriver_url must be set".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured extension without a leading dot.
    pub fn extension(&self) -> &str {
        self.document_extension.trim_start_matches('.')
    }
}

/// Explicit, per-operation waits. There is no ambient implicit wait.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Upper bound for an element to become present (or clickable)
    #[serde(with = "humantime_serde")]
    pub element_timeout: Duration,
    /// Upper bound for an embedded frame to appear before giving up on it
    #[serde(with = "humantime_serde")]
    pub frame_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Fixed pause after picking the document subtype
    #[serde(with = "humantime_serde")]
    pub selection_settle: Duration,
    /// Fixed pause after assigning the elaboration date
    #[serde(with = "humantime_serde")]
    pub date_settle: Duration,
    /// Fixed pause after clicking the attach trigger, before probing the OS window
    #[serde(with = "humantime_serde")]
    pub dialog_open_settle: Duration,
    /// Delay between synthesized characters
    #[serde(with = "humantime_serde")]
    pub keystroke_interval: Duration,
    /// Fixed pause between typing the path and confirming the native dialog
    #[serde(with = "humantime_serde")]
    pub dialog_settle: Duration,
    /// Fixed pause after moving focus to the save control
    #[serde(with = "humantime_serde")]
    pub focus_settle: Duration,
    /// Fixed pause for the upload to complete after saving
    #[serde(with = "humantime_serde")]
    pub upload_settle: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            element_timeout: Duration::from_secs(10),
            frame_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            selection_settle: Duration::from_secs(1),
            date_settle: Duration::from_secs(2),
            dialog_open_settle: Duration::from_secs(2),
            keystroke_interval: Duration::from_millis(25),
            dialog_settle: Duration::from_secs(2),
            focus_settle: Duration::from_millis(500),
            upload_settle: Duration::from_secs(3),
        }
    }
}

/// Stable identifiers of the remote application. A change on the remote side
/// is a compatibility break; overriding these is the only escape hatch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Landmarks {
    pub username_field: String,
    pub password_field: String,
    pub login_submit: String,
    pub quick_search: String,
    /// Name (or id) of the sub-document hosting the record view and the form
    pub visualization_frame: String,
    pub include_document: AnchorPredicate,
    pub external_document: AnchorPredicate,
    pub subtype_select: String,
    pub elaboration_date: String,
    pub born_digital_option: String,
    pub access_level_section: String,
    pub public_access_option: String,
    pub attachments_form: String,
    pub attach_trigger: String,
}

impl Default for Landmarks {
    fn default() -> Self {
        Self {
            username_field: "txtUsuario".to_string(),
            password_field: "pwdSenha".to_string(),
            login_submit: "sbmAcessar".to_string(),
            quick_search: "txtPesquisaRapida".to_string(),
            visualization_frame: "ifrVisualizacao".to_string(),
            include_document: AnchorPredicate {
                href_contains: Some("acao=documento_escolher_tipo".to_string()),
                icon_src_contains: Some("documento_incluir.svg".to_string()),
                ..AnchorPredicate::default()
            },
            external_document: AnchorPredicate {
                href_contains: Some("acao=documento_receber".to_string()),
                text: Some("Externo".to_string()),
                class_name: Some("ancoraOpcao".to_string()),
                ..AnchorPredicate::default()
            },
            subtype_select: "selSerie".to_string(),
            elaboration_date: "txtDataElaboracao".to_string(),
            born_digital_option: "divOptNato".to_string(),
            access_level_section: "fldNivelAcesso".to_string(),
            public_access_option: "divOptPublico".to_string(),
            attachments_form: "frmAnexos".to_string(),
            attach_trigger: "lblArquivo".to_string(),
        }
    }
}

/// Metadata filled into every included document
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentDefaults {
    /// Visible text of the document subtype option
    pub subtype: String,
    /// `chrono` format of the elaboration date
    pub date_format: String,
}

impl Default for DocumentDefaults {
    fn default() -> Self {
        Self {
            subtype: "Comprovante".to_string(),
            date_format: "%d/%m/%Y".to_string(),
        }
    }
}
