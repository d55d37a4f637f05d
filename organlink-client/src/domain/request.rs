use std::str::FromStr;

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::domain::clock::now_millis;
use crate::domain::error::ParseValueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[display("low")]
    Low,
    #[default]
    #[display("medium")]
    Medium,
    #[display("high")]
    High,
}

impl FromStr for Urgency {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParseValueError::new("urgency level", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    #[display("pending")]
    Pending,
    #[display("matched")]
    Matched,
    #[display("completed")]
    Completed,
}

impl RequestStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Matched => 1,
            Self::Completed => 2,
        }
    }

    /// Status only moves forward: pending -> matched -> completed.
    pub fn can_advance_to(self, next: Self) -> bool {
        next.rank() > self.rank()
    }
}

impl FromStr for RequestStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "matched" => Ok(Self::Matched),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseValueError::new("request status", s)),
        }
    }
}

/// A document in the `requests` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[display("{organ_type} needed ({blood_type}, {urgency_level}) for {full_name} at {hospital_name} [{status}]")]
pub struct OrganRequest {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub age: u32,
    pub contact_number: String,
    pub hospital_name: String,
    pub hospital_address: String,
    pub organ_type: String,
    pub blood_type: String,
    #[serde(default)]
    pub urgency_level: Urgency,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl OrganRequest {
    /// Stamps a submitted request. Status is always pending and the creation
    /// time is taken here, whatever the submitter sent.
    pub fn submit(new: NewOrganRequest) -> Self {
        Self {
            id: String::new(),
            user_id: new.user_id,
            full_name: new.full_name,
            age: new.age,
            contact_number: new.contact_number,
            hospital_name: new.hospital_name,
            hospital_address: new.hospital_address,
            organ_type: new.organ_type,
            blood_type: new.blood_type,
            urgency_level: new.urgency_level,
            is_urgent: new.is_urgent,
            additional_info: new.additional_info,
            status: RequestStatus::Pending,
            created_at: now_millis(),
        }
    }
}

/// Request fields supplied by the requester. `id`, `status` and `createdAt`
/// are assigned on submission; any such keys in the input are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganRequest {
    pub user_id: String,
    pub full_name: String,
    pub age: u32,
    pub contact_number: String,
    pub hospital_name: String,
    pub hospital_address: String,
    pub organ_type: String,
    pub blood_type: String,
    #[serde(default)]
    pub urgency_level: Urgency,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

/// Merge-patch for a request. `createdAt` is immutable and has no field here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organ_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency_level: Option<Urgency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_urgent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RequestStatus>,
}
