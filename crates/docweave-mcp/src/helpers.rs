//! Parsing helpers for tool parameters.

use std::sync::OnceLock;

use regex::Regex;

use docweave_kernel::WriteMode;
use docweave_types::DocError;

static DOCUMENT_URL: OnceLock<Regex> = OnceLock::new();

/// Accept a bare document id or a document URL.
pub fn document_id(input: &str) -> String {
    let input = input.trim();
    let re = DOCUMENT_URL.get_or_init(|| {
        Regex::new(r"/document/(?:u/\d+/)?d/([A-Za-z0-9_-]+)").expect("Invalid document URL regex")
    });
    re.captures(input)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| input.to_string())
}

/// Parse a write mode; absent means replace.
pub fn parse_mode(mode: Option<&str>) -> Result<WriteMode, DocError> {
    match mode {
        None => Ok(WriteMode::Replace),
        Some(s) => s.parse().map_err(|_| {
            DocError::InvalidParams(format!("invalid mode '{s}'. Use: replace or append"))
        }),
    }
}

/// Tool error text.
pub fn error_text(err: &DocError) -> String {
    format!("Error: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_from_url() {
        assert_eq!(
            document_id("https://docs.google.com/document/d/1AbC-d_9/edit#heading=h.x"),
            "1AbC-d_9"
        );
        assert_eq!(document_id("https://docs.google.com/document/u/1/d/XYZ/view"), "XYZ");
        assert_eq!(document_id("  plain-id "), "plain-id");
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode(None).unwrap(), WriteMode::Replace);
        assert_eq!(parse_mode(Some("append")).unwrap(), WriteMode::Append);
        assert!(matches!(parse_mode(Some("merge")), Err(DocError::InvalidParams(_))));
    }
}
