use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::models::user::UserRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    Hr,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Hr => "hr",
        }
    }

    /// Unknown or missing stored roles fall back to `Employee`.
    pub fn from_stored(raw: &str) -> Role {
        match raw {
            "hr" => Role::Hr,
            "employee" => Role::Employee,
            other => {
                warn!("Unknown stored role '{other}', treating as employee");
                Role::Employee
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated identity and its role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

impl Principal {
    pub fn is_hr(&self) -> bool {
        self.role == Role::Hr
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserProfile {
    #[serde(flatten)]
    pub principal: Principal,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        UserProfile {
            principal: Principal {
                user_id: row.id,
                email: row.email,
                display_name: row.display_name,
                role: Role::from_stored(&row.role),
            },
            created_at: row.created_at,
        }
    }
}

/// A signed-in session; the token is presented as a bearer credential.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: Uuid,
    pub principal: Principal,
}

/// Auth state changes broadcast to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Principal),
    SignedOut { user_id: Uuid, token: Uuid },
    RoleChanged { user_id: Uuid, role: Role },
}

/// Lower-cases and trims an email address so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
