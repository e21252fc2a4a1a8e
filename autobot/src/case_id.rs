//! File name ⇄ case identifier mapping
//!
//! `12345.000123.2024-25.pdf` names the record `12345/000123/2024-25`. The
//! extension is kept as it appeared so the reverse mapping reproduces the exact
//! file name.

use crate::errors::AutomationError;
use std::fmt;

/// Case identifier of a remote record, derived from a local file name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaseId {
    value: String,
    extension: String,
}

impl CaseId {
    /// Slash-delimited identifier as typed into the remote search
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Extension (without the dot) of the file this id came from
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// File name this identifier was derived from
    pub fn to_file_name(&self) -> String {
        to_file_name(&self.value, &self.extension)
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Strip the trailing `.{extension}` (case-insensitively) and turn every `.` of the stem into `/`.
pub fn resolve(file_name: &str, extension: &str) -> Result<CaseId, AutomationError> {
    let extension = extension.trim_start_matches('.');
    let suffix_len = extension.len() + 1;
    let has_extension = file_name.len() > extension.len()
        && file_name.is_char_boundary(file_name.len() - suffix_len)
        && file_name[file_name.len() - suffix_len..].eq_ignore_ascii_case(&format!(".{extension}"));
    if !has_extension {
        return Err(AutomationError::InvalidName(format!(
            "'{file_name}' does not end in .{extension}"
        )));
    }

    let (stem, original_extension) = file_name.split_at(file_name.len() - suffix_len);
    if stem.is_empty() {
        return Err(AutomationError::InvalidName(format!(
            "'{file_name}' has an empty name before .{extension}"
        )));
    }
    if stem.contains('/') {
        return Err(AutomationError::InvalidName(format!(
            "'{file_name}' contains a path separator"
        )));
    }

    Ok(CaseId {
        value: stem.replace('.', "/"),
        extension: original_extension[1..].to_string(),
    })
}

/// Inverse of [`resolve`]: every `/` becomes `.` and the extension is appended.
pub fn to_file_name(case_id: &str, extension: &str) -> String {
    format!(
        "{}.{}",
        case_id.replace('/', "."),
        extension.trim_start_matches('.')
    )
}
