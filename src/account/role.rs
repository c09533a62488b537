/// Account roles
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Standing of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Trusted,
    Member,
    Restricted,
    Banned,
}

/// A role string outside the closed set
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Trusted,
        Role::Member,
        Role::Restricted,
        Role::Banned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Trusted => "trusted",
            Role::Member => "member",
            Role::Restricted => "restricted",
            Role::Banned => "banned",
        }
    }

    /// Whether holders may issue moderation actions
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "trusted" => Ok(Role::Trusted),
            "member" => Ok(Role::Member),
            "restricted" => Ok(Role::Restricted),
            "banned" => Ok(Role::Banned),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
