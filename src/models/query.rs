use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::user::{Availability, UserStatus};

/// Filterable fields accepted by `GET /users`. Anything outside this list is
/// rejected at deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: Option<UserStatus>,
    pub availability: Option<Availability>,
    /// Case-insensitive substring match on name or email.
    pub search: Option<String>,
    /// Accepted for compatibility, always replaced by the caller's organisation.
    pub organisation: Option<String>,
}

/// Columns to overwrite on an update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub status: Option<UserStatus>,
    pub availability: Option<Availability>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserPatch {
    /// Names of the columns this patch overwrites, for audit details.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.email.is_some() {
            fields.push("email");
        }
        if self.password_hash.is_some() {
            fields.push("password");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.availability.is_some() {
            fields.push("availability");
        }
        if self.last_login_at.is_some() {
            fields.push("last_login_at");
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }
}
