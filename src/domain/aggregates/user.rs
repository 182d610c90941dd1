//! User Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::domain::aggregates::order::UnknownVariant;
use crate::domain::value_objects::{Address, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    pub address: Option<Address>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role { #[default] User, Admin }

impl Role {
    pub fn as_str(self) -> &'static str {
        match self { Self::User => "USER", Self::Admin => "ADMIN" }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl User {
    pub fn register(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: String,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(), username: username.into(), email: email.into(), password_hash,
            first_name: first_name.into(), last_name: last_name.into(), role: Role::User,
            address: None, phone: None, created_at: now, updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User::register("ada", "ada@example.com", "$2b$10$hash".into(), "Ada", "Lovelace");
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "USER");
        assert_eq!(json["firstName"], "Ada");
    }
}
