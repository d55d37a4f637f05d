use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::domain::clock::now_millis;

/// An account document in the `users` collection, keyed by the identity uid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[display("{full_name} <{email}>")]
pub struct UserAccount {
    #[serde(default)]
    pub id: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub is_donor: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checkup: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn new(id: String, email: String, full_name: String) -> Self {
        Self {
            id,
            email,
            full_name,
            is_donor: false,
            blood_type: None,
            organs: None,
            last_checkup: None,
            created_at: now_millis(),
        }
    }
}

/// Partial account update; only the populated fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checkup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_donor: Option<bool>,
}
