use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn parse(input: &str) -> Option<Role> {
        match input.trim() {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

/// Stored staff account as it appears in the users file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffAccount {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Plaintext credential from older users files. Replaced by
    /// `password_hash` on the next successful login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub name: String,
    pub role: Role,
}

impl StaffAccount {
    pub fn profile(&self) -> StaffProfile {
        StaffProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

/// What callers get to see of an account; never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffProfile {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StaffDocument {
    #[serde(default)]
    pub users: Vec<StaffAccount>,
}
