use serde_json::Value;

use crate::errors::AppError;

/// The three document types the service is instantiated for. Each kind maps
/// to its own table and its own cache-key family; everything else about them
/// is handled by the one generic service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Resume,
    CoverLetter,
    DisclosureLetter,
}

impl DocumentKind {
    /// Cache-key family prefix, also the HTTP resource segment.
    pub fn resource(&self) -> &'static str {
        match self {
            DocumentKind::Resume => "resumes",
            DocumentKind::CoverLetter => "cover-letters",
            DocumentKind::DisclosureLetter => "disclosure-letters",
        }
    }

    /// Backing table. A closed set, so interpolating it into SQL is safe.
    pub fn table(&self) -> &'static str {
        match self {
            DocumentKind::Resume => "resumes",
            DocumentKind::CoverLetter => "cover_letters",
            DocumentKind::DisclosureLetter => "disclosure_letters",
        }
    }

    /// Human-readable name used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Resume => "resume",
            DocumentKind::CoverLetter => "cover letter",
            DocumentKind::DisclosureLetter => "disclosure letter",
        }
    }

    /// Structural validation of the kind-specific payload. The content itself
    /// stays opaque to the consistency core; this only rejects shapes the
    /// renderer downstream cannot work with.
    pub fn validate_payload(&self, payload: &Value) -> Result<(), AppError> {
        let obj = payload
            .as_object()
            .ok_or_else(|| AppError::Validation("payload must be a JSON object".into()))?;
        match self {
            DocumentKind::Resume => Ok(()),
            DocumentKind::CoverLetter | DocumentKind::DisclosureLetter => {
                if let Some(body) = obj.get("body") {
                    if !body.is_string() {
                        return Err(AppError::Validation("payload.body must be a string".into()));
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_must_be_object() {
        assert!(DocumentKind::Resume.validate_payload(&json!([1, 2])).is_err());
        assert!(DocumentKind::Resume.validate_payload(&json!({})).is_ok());
    }

    #[test]
    fn test_letter_body_must_be_string() {
        let kind = DocumentKind::CoverLetter;
        assert!(kind.validate_payload(&json!({"body": 42})).is_err());
        assert!(kind.validate_payload(&json!({"body": "Dear team"})).is_ok());
        assert!(kind.validate_payload(&json!({})).is_ok());
    }
}
