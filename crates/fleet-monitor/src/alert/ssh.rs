use regex::Regex;

use crate::error::AlertError;

const LOGIN_PATTERN: &str = r"sshd\[\d+\]: Accepted \S+ for (?P<user>\S+) from (?P<addr>\S+)";
const LOGOUT_PATTERN: &str = r"sshd\[\d+\]: pam_unix\(sshd:session\): session closed for user (?P<user>\S+)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SshEvent {
    Login,
    Logout,
}

impl SshEvent {
    pub fn title(&self) -> &'static str {
        match self {
            SshEvent::Login => "SSH Login",
            SshEvent::Logout => "SSH Logout",
        }
    }
}

/// Recognizes sshd login and logout lines in syslog content.
#[derive(Debug, Clone)]
pub struct SshMatcher {
    login: Regex,
    logout: Regex,
}

impl SshMatcher {
    pub fn new() -> Result<Self, AlertError> {
        Ok(Self {
            login: Regex::new(LOGIN_PATTERN)?,
            logout: Regex::new(LOGOUT_PATTERN)?,
        })
    }

    pub fn classify(&self, line: &str) -> Option<SshEvent> {
        if self.login.is_match(line) {
            Some(SshEvent::Login)
        } else if self.logout.is_match(line) {
            Some(SshEvent::Logout)
        } else {
            None
        }
    }
}
