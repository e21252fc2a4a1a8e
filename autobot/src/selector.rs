/// Represents ways to locate an element on the remote page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Select by the `id` attribute
    Id(String),
    /// Select by the `name` attribute
    Name(String),
    /// Select using a CSS selector
    Css(String),
    /// Select using an XPath expression
    XPath(String),
}

impl Selector {
    /// Locator strategy and value as understood by a W3C WebDriver endpoint.
    pub fn to_webdriver(&self) -> (&'static str, String) {
        match self {
            Selector::Id(id) => ("css selector", format!("[id=\"{}\"]", escape_css(id))),
            Selector::Name(name) => ("css selector", format!("[name=\"{}\"]", escape_css(name))),
            Selector::Css(css) => ("css selector", css.clone()),
            Selector::XPath(xpath) => ("xpath", xpath.clone()),
        }
    }

    /// Matches an embedded frame by either its `id` or its `name`.
    pub fn frame(name: &str) -> Self {
        let name = escape_css(name);
        Selector::Css(format!(
            "iframe[id=\"{name}\"], iframe[name=\"{name}\"], frame[id=\"{name}\"], frame[name=\"{name}\"]"
        ))
    }

    /// Matches the `<option>` of a `<select>` by its visible text.
    pub fn option_with_text(select_id: &str, text: &str) -> Self {
        Selector::XPath(format!(
            "//select[@id={}]/option[normalize-space(text())={}]",
            xpath_literal(select_id),
            xpath_literal(text)
        ))
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Id(id) => write!(f, "#{id}"),
            Selector::Name(name) => write!(f, "name:{name}"),
            Selector::Css(css) => write!(f, "css:{css}"),
            Selector::XPath(xpath) => write!(f, "xpath:{xpath}"),
        }
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        let s = s.trim();
        match s {
            _ if s.starts_with('#') => Selector::Id(s[1..].to_string()),
            _ if s.starts_with("id:") => Selector::Id(s[3..].to_string()),
            _ if s.starts_with("name:") => Selector::Name(s[5..].to_string()),
            _ if s.starts_with("css:") => Selector::Css(s[4..].to_string()),
            _ if s.starts_with("xpath:") => Selector::XPath(s[6..].to_string()),
            _ if s.starts_with('/') || s.starts_with("(/") => Selector::XPath(s.to_string()),
            // Bare identifiers are the common case for the landmarks of the remote app
            _ => Selector::Id(s.to_string()),
        }
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::from(s.as_str())
    }
}

/// Quote `value` as an XPath 1.0 string literal. XPath has no escape syntax, so
/// a value holding both quote kinds is spliced together with `concat()`.
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let parts: Vec<String> = value
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

fn escape_css(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
