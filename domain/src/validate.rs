//! Draft validation mirroring the link form contract.

use url::Url;

use crate::{LinkDraft, LinkPayload, ValidationError};

/// Validate an original URL: it must parse as an absolute URL.
pub fn validate_original_url(s: &str) -> Result<(), ValidationError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }
    Url::parse(trimmed)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidUrl(format!("{trimmed:?}: {e}")))
}

pub fn validate_remark(s: &str) -> Result<(), ValidationError> {
    if s.trim().is_empty() {
        return Err(ValidationError::EmptyRemark);
    }
    Ok(())
}

/// Validate a draft and turn it into the body sent to the backend.
///
/// A disabled expiration clears any date still present in the draft.
pub fn validate_draft(draft: &LinkDraft) -> Result<LinkPayload, ValidationError> {
    validate_original_url(&draft.original_url)?;
    validate_remark(&draft.remark)?;
    Ok(LinkPayload {
        original_url: draft.original_url.trim().to_string(),
        remark: draft.remark.clone(),
        expiration_date: if draft.expiration_enabled {
            draft.expiration_date
        } else {
            None
        },
    })
}
