//! Request extractors that reject with the `AppError` envelope
//!
//! Drop-in replacements for `Json`, `Query` and `Path` in handler arguments.
//! Responses keep using `axum::Json`.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Path parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Field named by a serde error message, if any
pub(crate) fn rejected_field(detail: &str) -> Option<&str> {
    for marker in ["missing field `", "unknown field `"] {
        if let Some((_, rest)) = detail.split_once(marker) {
            return rest.split('`').next();
        }
    }

    // serde_path_to_error prefixes data errors with `path: `
    let (_, data) = detail.split_once("target type: ")?;
    let (path, _) = data.split_once(": ")?;
    let is_path = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'));
    is_path.then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_field() {
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: missing field `quantity` at line 1 column 80"
            ),
            Some("quantity")
        );
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: reason: unknown variant `lost`, expected one of `count_correction`, `damage` at line 1 column 60"
            ),
            Some("reason")
        );
        assert_eq!(
            rejected_field("Failed to deserialize query string: invalid digit found in string"),
            None
        );
        assert_eq!(rejected_field("Failed to parse the request body as JSON"), None);
    }
}
