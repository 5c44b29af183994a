use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// One row of the permissions sheet: `email` may respond to events titled `title`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEventPermission {
    pub title: String,
    pub email: Option<String>,
    pub is_test: bool,
}

impl UserEventPermission {
    pub fn new(title: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            email: Some(email.into()),
            is_test: false,
        }
    }

    pub fn test_record(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            email: None,
            is_test: true,
        }
    }

    fn grants(&self, email: &str, policy: AuthorizationPolicy) -> bool {
        match policy {
            AuthorizationPolicy::Strict => self.email.as_deref() == Some(email),
            AuthorizationPolicy::AllowTestRecords => {
                self.is_test || self.email.as_deref() == Some(email)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthorizationPolicy {
    /// Title and email must both match a record.
    #[default]
    Strict,
    /// A record flagged as test data grants access to anyone for its title.
    AllowTestRecords,
}

impl AuthorizationPolicy {
    pub fn from_allow_test_records(allow: bool) -> Self {
        if allow {
            Self::AllowTestRecords
        } else {
            Self::Strict
        }
    }
}

/// Server-side check that `email` may respond to `event_title`.
pub fn authorize(
    email: &str,
    event_title: &str,
    permissions: &[UserEventPermission],
    policy: AuthorizationPolicy,
) -> bool {
    permissions
        .iter()
        .any(|permission| permission.title == event_title && permission.grants(email, policy))
}

/// Titles `email` may respond to, in sheet order, without duplicates.
pub fn permitted_titles<'a>(
    email: &str,
    permissions: &'a [UserEventPermission],
    policy: AuthorizationPolicy,
) -> Vec<&'a str> {
    let mut titles: Vec<&str> = Vec::new();
    for permission in permissions.iter().filter(|p| p.grants(email, policy)) {
        if !titles.contains(&permission.title.as_str()) {
            titles.push(&permission.title);
        }
    }
    titles
}

fn email_pattern() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
            .expect("email pattern is valid")
    })
}

pub fn is_valid_email(value: &str) -> bool {
    !value.starts_with('.') && !value.contains("..") && email_pattern().is_match(value)
}
