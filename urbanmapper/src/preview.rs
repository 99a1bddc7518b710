use crate::error::{Result, UrbanError};

/// Preview of a loader or layer configuration.
///
/// `Ascii` is a human-readable text block, `Json` a structured mapping. Both
/// forms of the same object describe the same configuration state.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    Ascii(String),
    Json(serde_json::Value),
}

impl Preview {
    pub fn as_ascii(&self) -> Option<&str> {
        match self {
            Preview::Ascii(text) => Some(text),
            Preview::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Preview::Ascii(_) => None,
            Preview::Json(value) => Some(value),
        }
    }
}

/// Supported preview format selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewFormat {
    Ascii,
    Json,
}

impl PreviewFormat {
    /// Parses a format selector; any value other than `"ascii"` or `"json"`
    /// is a validation error.
    pub fn parse(format: &str) -> Result<Self> {
        match format {
            "ascii" => Ok(PreviewFormat::Ascii),
            "json" => Ok(PreviewFormat::Json),
            other => Err(UrbanError::validation(format!(
                "unsupported preview format '{other}' (expected 'ascii' or 'json')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_formats() {
        assert_eq!(PreviewFormat::parse("ascii").unwrap(), PreviewFormat::Ascii);
        assert_eq!(PreviewFormat::parse("json").unwrap(), PreviewFormat::Json);
    }

    #[test]
    fn test_parse_unknown_format() {
        let err = PreviewFormat::parse("html").unwrap_err();
        assert!(err.is_validation());
    }
}
