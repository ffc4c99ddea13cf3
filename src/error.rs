use reqwest::StatusCode;

use crate::format::Format;

/// Failures a caller may want to tell apart.
///
/// Client operations return `anyhow::Result`; these sit at the root of the
/// returned error and can be recovered with
/// `err.downcast_ref::<covidapi::Error>()`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API answered with a non-2xx status. The body is not inspected.
    #[error("{} (url: {url})", status_line(.status))]
    Status { status: StatusCode, url: String },

    /// The response format cannot be handed back to the caller.
    #[error("format '{0}' is unsupported")]
    UnsupportedFormat(Format),

    #[error("request cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// `404 Not Found`, as an HTTP status line reads.
pub(crate) fn status_line(status: &StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_reads_like_a_status_line() {
        let err = Error::Status {
            status: StatusCode::NOT_FOUND,
            url: "https://example.test/v1/data".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "404 Not Found (url: https://example.test/v1/data)"
        );
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn unsupported_format_names_the_format() {
        let err = Error::UnsupportedFormat(Format::Xml);
        assert_eq!(err.to_string(), "format 'xml' is unsupported");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn unknown_status_has_no_reason() {
        let status = StatusCode::from_u16(599).unwrap();
        assert_eq!(status_line(&status), "599");
    }
}
