//! Conversion of internal errors into the client wire shape.
//!
//! Transport glue calls [`report`] on any [`AuthError`] that escapes an
//! action and serializes the result. The detail inside
//! [`AuthError::Server`] is logged here and never crosses the boundary.

use serde::Serialize;

use crate::AuthError;

/// The error body clients receive.
///
/// `code` is a stable machine-readable string clients branch on; `message`
/// is for display; `field` names the offending input for validation
/// failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientError {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

/// Maps an error onto the wire shape and logs it at the right severity.
///
/// Expected outcomes log at `warn` with their client-visible message.
/// Server errors log their detail at `error` and surface only a generic
/// message.
pub fn report(err: &AuthError) -> ClientError {
    match err {
        AuthError::Server(detail) => {
            log::error!(
                target: "umbra_auth",
                "msg=\"server error\" detail=\"{detail}\""
            );
            ClientError {
                code: err.code(),
                message: "Internal server error".to_owned(),
                field: None,
            }
        }
        AuthError::Validation(validation) => {
            log::warn!(
                target: "umbra_auth",
                "msg=\"request rejected\" code={} field={}",
                err.code(),
                validation.field()
            );
            ClientError {
                code: err.code(),
                message: err.to_string(),
                field: Some(validation.field()),
            }
        }
        _ => {
            log::warn!(
                target: "umbra_auth",
                "msg=\"request rejected\" code={}",
                err.code()
            );
            ClientError {
                code: err.code(),
                message: err.to_string(),
                field: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidationError;

    #[test]
    fn test_report_expected_errors_keep_their_message() {
        let reported = report(&AuthError::Unauthenticated);
        assert_eq!(reported.code, "UNAUTHENTICATED");
        assert_eq!(reported.message, "Authentication required");
        assert_eq!(reported.field, None);

        let reported = report(&AuthError::InvalidCredentials);
        assert_eq!(reported.code, "INVALID_CREDENTIALS");
        assert_eq!(reported.message, "Invalid email or password");
    }

    #[test]
    fn test_report_validation_carries_field() {
        let reported = report(&AuthError::Validation(ValidationError::PasswordTooShort(8)));
        assert_eq!(reported.code, "VALIDATION_FAILED");
        assert_eq!(reported.message, "Password must be at least 8 characters");
        assert_eq!(reported.field, Some("password"));
    }

    #[test]
    fn test_report_server_error_hides_detail() {
        let reported = report(&AuthError::Server("db connection refused".to_owned()));
        assert_eq!(reported.code, "SERVER_ERROR");
        assert_eq!(reported.message, "Internal server error");
        assert_eq!(reported.field, None);
        assert!(!reported.message.contains("db connection refused"));
    }

    #[test]
    fn test_client_error_serialization_omits_absent_field() {
        let json = serde_json::to_value(report(&AuthError::CsrfInvalid)).unwrap();
        assert_eq!(json["code"], "CSRF_INVALID");
        assert!(json.get("field").is_none());

        let json =
            serde_json::to_value(report(&AuthError::Validation(ValidationError::EmailTaken)))
                .unwrap();
        assert_eq!(json["field"], "email");
    }
}
