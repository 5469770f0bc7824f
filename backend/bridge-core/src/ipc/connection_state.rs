//! Per-connection authentication state.

use common::RedactedSecret;

pub(crate) struct ConnectionState {
    authenticated: bool,
    expected_token: RedactedSecret,
}

impl ConnectionState {
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            expected_token: RedactedSecret::new(token),
        }
    }

    /// Marks the connection authenticated when `token` matches.
    pub(crate) fn validate_token(&mut self, token: &str) -> bool {
        if token == self.expected_token.expose() {
            self.authenticated = true;
            true
        } else {
            false
        }
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
