use std::fmt;
use std::str::FromStr;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::domain::error::ParseValueError;
use crate::domain::user::UserAccount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[display("available")]
    Available,
    #[default]
    #[display("unavailable")]
    Unavailable,
}

impl FromStr for Availability {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "unavailable" => Ok(Self::Unavailable),
            _ => Err(ParseValueError::new("availability", s)),
        }
    }
}

/// A `users` document flagged `isDonor`. A missing status decodes as unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorProfile {
    #[serde(flatten)]
    pub account: UserAccount,
    #[serde(default)]
    pub available_organs: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_donation: Option<String>,
    #[serde(default)]
    pub total_donations: u32,
    #[serde(default)]
    pub status: Availability,
}

impl fmt::Display for DonorProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} - {} ({})",
            self.full_name(),
            self.blood_type().unwrap_or("?"),
            self.available_organs.join(", "),
            self.location,
            self.status
        )
    }
}

impl DonorProfile {
    pub fn id(&self) -> &str {
        &self.account.id
    }

    pub fn full_name(&self) -> &str {
        &self.account.full_name
    }

    pub fn blood_type(&self) -> Option<&str> {
        self.account.blood_type.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.status == Availability::Available
    }

    pub fn offers(&self, organ: &str) -> bool {
        self.available_organs.iter().any(|o| o == organ)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_organs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checkup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_donation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_donations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Availability>,
}
