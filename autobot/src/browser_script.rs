//! Script-level interactions with the remote page
//!
//! The inclusion controls are rendered inside generated markup without stable
//! ids, but their link targets, texts and icons are stable. They are located by
//! scanning every anchor against an [`AnchorPredicate`] and clicked from script.

use crate::browser::BrowserEngine;
use crate::errors::AutomationError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

/// Scans `document.getElementsByTagName('a')` for the first anchor matching
/// `arguments[0]` and clicks it. Evaluates to `true` when something was clicked.
/// Must stay in sync with [`AnchorPredicate::matches`].
pub const CLICK_MATCHING_ANCHOR: &str = r#"
var p = arguments[0] || {};
var links = document.getElementsByTagName('a');
for (var i = 0; i < links.length; i++) {
    var link = links[i];
    if (p.hrefContains && (link.href || '').indexOf(p.hrefContains) === -1) continue;
    if (p.iconSrcContains) {
        var icons = link.getElementsByTagName('img');
        var hit = false;
        for (var j = 0; j < icons.length; j++) {
            if ((icons[j].getAttribute('src') || '').indexOf(p.iconSrcContains) !== -1) { hit = true; break; }
        }
        if (!hit) continue;
    }
    if (p.text && (link.textContent || '').trim() !== p.text) continue;
    if (p.className && link.className !== p.className) continue;
    link.click();
    return true;
}
return false;
"#;

/// Assigns `arguments[1]` to the `value` of the element whose id is `arguments[0]`.
pub const SET_VALUE_BY_ID: &str = r#"
var el = document.getElementById(arguments[0]);
if (!el) { return false; }
el.value = arguments[1];
return true;
"#;

/// Fuzzy description of an anchor. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnchorPredicate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href_contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_src_contains: Option<String>,
    /// Exact link text after trimming
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Exact `className`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

/// What the page exposes about one anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorSnapshot {
    pub href: String,
    pub text: String,
    pub class_name: String,
    pub icon_srcs: Vec<String>,
}

impl AnchorPredicate {
    pub fn matches(&self, anchor: &AnchorSnapshot) -> bool {
        if let Some(href) = &self.href_contains {
            if !anchor.href.contains(href.as_str()) {
                return false;
            }
        }
        if let Some(icon) = &self.icon_src_contains {
            if !anchor.icon_srcs.iter().any(|src| src.contains(icon.as_str())) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            if anchor.text.trim() != text {
                return false;
            }
        }
        if let Some(class_name) = &self.class_name {
            if &anchor.class_name != class_name {
                return false;
            }
        }
        true
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

impl std::fmt::Display for AnchorPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// Click the first anchor matching `predicate` in the current frame context.
///
/// Finding nothing is reported as `ElementNotFound` so callers can retry.
pub async fn click_matching_anchor(
    browser: &dyn BrowserEngine,
    predicate: &AnchorPredicate,
) -> Result<(), AutomationError> {
    debug!(predicate = %predicate, "Scanning anchors");
    let clicked = browser
        .execute_script(CLICK_MATCHING_ANCHOR, vec![predicate.to_value()])
        .await?;
    if clicked.as_bool() == Some(true) {
        info!(predicate = %predicate, "Anchor found and clicked");
        Ok(())
    } else {
        Err(AutomationError::ElementNotFound(format!(
            "No anchor matching {predicate}"
        )))
    }
}

/// Assign a field value directly, bypassing keyboard input and masks.
pub async fn set_value_by_id(
    browser: &dyn BrowserEngine,
    id: &str,
    value: &str,
) -> Result<(), AutomationError> {
    let assigned = browser
        .execute_script(SET_VALUE_BY_ID, vec![json!(id), json!(value)])
        .await?;
    if assigned.as_bool() == Some(true) {
        Ok(())
    } else {
        Err(AutomationError::ElementNotFound(format!("#{id}")))
    }
}
