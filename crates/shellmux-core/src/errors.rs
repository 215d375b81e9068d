use thiserror::Error;

/// Structured error taxonomy surfaced by the PTY shell factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Unsupported schema, non-local host for a local schema, unresolvable host.
    BadParameter,
    /// Prompted for an unknown password/passphrase, or an identification-exchange failure.
    AuthenticationFailed,
    /// Generic "auth" failure reported by the underlying tool.
    AuthorizationFailed,
    /// The underlying tool reported access denial.
    PermissionDenied,
    /// Master could not be established, a copy exited non-zero, or an unclassified failure.
    NoSuccess,
    /// A previously live master could not be recovered.
    IncorrectState,
}

/// Error produced by any stage of the factory: classification, profile building,
/// registry lookup, the dialog engine, or the operation dispatcher.
#[derive(Debug, Clone, Error)]
#[error("{code:?}: {message}")]
pub struct ShellMuxError {
    pub code: ErrorCode,
    pub message: String,
    pub detail: Option<String>,
}

impl ShellMuxError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(
        code: ErrorCode,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    pub fn bad_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadParameter, message)
    }

    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthenticationFailed, message)
    }

    pub fn no_success(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoSuccess, message)
    }

    pub fn incorrect_state(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::IncorrectState, message)
    }

    /// Re-expresses the plain-text classification rules from §4.6/§7 as a pure
    /// function: a `NoSuccess` with no more specific cause gets reclassified by
    /// sniffing its lowercased message. Any other code passes through unchanged.
    pub fn classify(self) -> Self {
        if self.code != ErrorCode::NoSuccess {
            return self;
        }

        let lower = self.message.to_ascii_lowercase();

        // `auth` is tested before `pass` so "authentication" does not fall
        // through to the password bucket.
        if lower.contains("auth") {
            return Self {
                code: ErrorCode::AuthorizationFailed,
                ..self
            };
        }
        if lower.contains("ssh_exchange_identification") {
            return Self::with_detail(
                ErrorCode::AuthenticationFailed,
                format!(
                    "too frequent login attempts, or sshd misconfiguration: {}",
                    self.message
                ),
                self.detail.unwrap_or_default(),
            );
        }
        if lower.contains("pass") {
            return Self {
                code: ErrorCode::AuthenticationFailed,
                ..self
            };
        }
        if lower.contains("denied") {
            return Self {
                code: ErrorCode::PermissionDenied,
                ..self
            };
        }
        if lower.contains("shared connection") || lower.contains("pty allocation") {
            return Self {
                message: format!("Insufficient system resources: {}", self.message),
                ..self
            };
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_wins_over_pass_substring() {
        let err = ShellMuxError::no_success("authentication failed: password required").classify();
        assert_eq!(err.code, ErrorCode::AuthorizationFailed);
    }

    #[test]
    fn pass_without_auth_classifies_as_authentication_failed() {
        let err = ShellMuxError::no_success("bad password given").classify();
        assert_eq!(err.code, ErrorCode::AuthenticationFailed);
    }

    #[test]
    fn denied_classifies_as_permission_denied() {
        let err = ShellMuxError::no_success("permission denied (publickey)").classify();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[test]
    fn shared_connection_exhaustion_stays_no_success_with_annotated_message() {
        let err = ShellMuxError::no_success(
            "mux_client_request_session: session request failed on shared connection",
        )
        .classify();
        assert_eq!(err.code, ErrorCode::NoSuccess);
        assert!(err.message.starts_with("Insufficient system resources:"));
    }

    #[test]
    fn more_specific_codes_pass_through_unchanged() {
        let err = ShellMuxError::bad_parameter("cannot handle schema 'xyz://'").classify();
        assert_eq!(err.code, ErrorCode::BadParameter);
    }

    #[test]
    fn ssh_exchange_identification_is_authentication_failed() {
        let err = ShellMuxError::no_success("ssh_exchange_identification: read: connection reset")
            .classify();
        assert_eq!(err.code, ErrorCode::AuthenticationFailed);
        assert!(err.message.contains("too frequent login attempts"));
    }
}
