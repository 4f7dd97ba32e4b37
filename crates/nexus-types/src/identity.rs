// Social identity and the canonical identity key

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of social identifier a wallet is provisioned for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialType {
    Email,
    Phone,
    Twitter,
    Discord,
    Telegram,
}

impl SocialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocialType::Email => "email",
            SocialType::Phone => "phone",
            SocialType::Twitter => "twitter",
            SocialType::Discord => "discord",
            SocialType::Telegram => "telegram",
        }
    }
}

impl fmt::Display for SocialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SocialType {
    type Err = UnknownSocialType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "email" => Ok(SocialType::Email),
            "phone" | "sms" => Ok(SocialType::Phone),
            "twitter" | "x" => Ok(SocialType::Twitter),
            "discord" => Ok(SocialType::Discord),
            "telegram" => Ok(SocialType::Telegram),
            other => Err(UnknownSocialType(other.to_string())),
        }
    }
}

/// Returned when parsing an unrecognized social type string
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown social type: {0}")]
pub struct UnknownSocialType(pub String);

/// A social identity: the pair of raw identifier and its kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub social_id: String,
    pub social_type: SocialType,
}

impl Identity {
    pub fn new(social_id: impl Into<String>, social_type: SocialType) -> Self {
        Self {
            social_id: social_id.into(),
            social_type,
        }
    }

    /// Canonical identity key, e.g. `email:alice@example.com`.
    ///
    /// Email addresses and handles are lowercased so the same user never
    /// maps to two records; phone numbers are kept verbatim.
    pub fn identity_key(&self) -> IdentityKey {
        let id = match self.social_type {
            SocialType::Phone => self.social_id.clone(),
            _ => self.social_id.to_lowercase(),
        };
        IdentityKey(format!("{}:{}", self.social_type, id))
    }
}

/// Canonical string identifying a user across chains
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey(pub String);

impl IdentityKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IdentityKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_key_is_canonical() {
        let a = Identity::new("Alice@Example.com", SocialType::Email);
        let b = Identity::new("alice@example.com", SocialType::Email);
        assert_eq!(a.identity_key(), b.identity_key());
        assert_eq!(a.identity_key().as_str(), "email:alice@example.com");
    }

    #[test]
    fn social_type_parsing() {
        assert_eq!("email".parse::<SocialType>().unwrap(), SocialType::Email);
        assert_eq!("X".parse::<SocialType>().unwrap(), SocialType::Twitter);
        assert!("carrier-pigeon".parse::<SocialType>().is_err());
    }
}
