//! Client-side checks for the app's forms. Each failing field gets one
//! message, keyed by the field name used on the form.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::{is_known_blood_type, is_known_organ};
use crate::domain::donor::{Availability, DonorProfilePatch};
use crate::domain::error::ValidationErrors;
use crate::domain::request::{NewOrganRequest, Urgency};
use crate::domain::user::UserDataPatch;

fn required(errors: &mut ValidationErrors, field: &'static str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.add(field, message);
    }
}

fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Raw input of the organ request form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestForm {
    pub full_name: String,
    pub age: String,
    pub contact_number: String,
    pub hospital_name: String,
    pub hospital_address: String,
    pub organ_type: String,
    pub blood_type: String,
    #[serde(default)]
    pub urgency_level: Urgency,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default)]
    pub additional_info: String,
}

impl RequestForm {
    pub fn validate(&self, user_id: &str) -> Result<NewOrganRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        required(&mut errors, "fullName", &self.full_name, "Full name is required");
        let age = match self.age.trim() {
            "" => {
                errors.add("age", "Age is required");
                0
            }
            raw => raw.parse::<u32>().unwrap_or_else(|_| {
                errors.add("age", "Age must be a number");
                0
            }),
        };
        required(
            &mut errors,
            "contactNumber",
            &self.contact_number,
            "Contact number is required",
        );
        required(
            &mut errors,
            "hospitalName",
            &self.hospital_name,
            "Hospital name is required",
        );
        required(
            &mut errors,
            "hospitalAddress",
            &self.hospital_address,
            "Hospital address is required",
        );
        required(&mut errors, "organType", &self.organ_type, "Organ type is required");
        if !self.organ_type.is_empty() && !is_known_organ(&self.organ_type) {
            errors.add("organType", "Select a listed organ type");
        }
        required(&mut errors, "bloodType", &self.blood_type, "Blood type is required");
        if !self.blood_type.is_empty() && !is_known_blood_type(&self.blood_type) {
            errors.add("bloodType", "Select a listed blood type");
        }

        errors.into_result(NewOrganRequest {
            user_id: user_id.to_string(),
            full_name: self.full_name.trim().to_string(),
            age,
            contact_number: self.contact_number.trim().to_string(),
            hospital_name: self.hospital_name.trim().to_string(),
            hospital_address: self.hospital_address.trim().to_string(),
            organ_type: self.organ_type.clone(),
            blood_type: self.blood_type.clone(),
            urgency_level: self.urgency_level,
            is_urgent: self.is_urgent,
            additional_info: optional_text(&self.additional_info),
        })
    }
}

/// Raw input of the donor profile form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorProfileForm {
    pub full_name: String,
    pub blood_type: String,
    pub available_organs: Vec<String>,
    pub location: String,
    pub last_checkup: String,
    pub status: Availability,
}

impl Default for DonorProfileForm {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            blood_type: String::new(),
            available_organs: Vec::new(),
            location: String::new(),
            last_checkup: String::new(),
            status: Availability::Available,
        }
    }
}

impl DonorProfileForm {
    /// Adds `organ` when absent, removes it when present.
    pub fn toggle_organ(&mut self, organ: &str) {
        match self.available_organs.iter().position(|o| o == organ) {
            Some(index) => {
                self.available_organs.remove(index);
            }
            None => self.available_organs.push(organ.to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        required(&mut errors, "fullName", &self.full_name, "Full name is required");
        required(&mut errors, "bloodType", &self.blood_type, "Blood type is required");
        if !self.blood_type.is_empty() && !is_known_blood_type(&self.blood_type) {
            errors.add("bloodType", "Select a listed blood type");
        }
        if self.available_organs.is_empty() {
            errors.add("availableOrgans", "Please select at least one organ");
        } else if let Some(organ) = self.available_organs.iter().find(|o| !is_known_organ(o)) {
            errors.add("availableOrgans", format!("Unknown organ: {organ}"));
        }
        required(&mut errors, "location", &self.location, "Location is required");
        required(
            &mut errors,
            "lastCheckup",
            &self.last_checkup,
            "Last checkup date is required",
        );

        errors.into_result(())
    }

    /// Account fields written when the user becomes a donor.
    pub fn account_patch(&self) -> UserDataPatch {
        UserDataPatch {
            full_name: Some(self.full_name.trim().to_string()),
            blood_type: Some(self.blood_type.clone()),
            organs: Some(self.available_organs.clone()),
            last_checkup: Some(self.last_checkup.trim().to_string()),
            is_donor: Some(true),
        }
    }

    /// Donor fields written after the account update; new donors start with
    /// no recorded donations.
    pub fn donor_patch(&self) -> DonorProfilePatch {
        DonorProfilePatch {
            available_organs: Some(self.available_organs.clone()),
            location: Some(self.location.trim().to_string()),
            status: Some(self.status),
            total_donations: Some(0),
            ..DonorProfilePatch::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        required(&mut errors, "email", &self.email, "Please enter your email");
        required(&mut errors, "password", &self.password, "Please enter your password");
        errors.into_result(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub const MIN_PASSWORD_LEN: usize = 6;

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        required(&mut errors, "fullName", &self.full_name, "Full name is required");
        if !self.email.contains('@') {
            errors.add("email", "Enter a valid email address");
        }
        if self.password.chars().count() < Self::MIN_PASSWORD_LEN {
            errors.add("password", "Password must be at least 6 characters");
        }
        if self.password != self.confirm_password {
            errors.add("confirmPassword", "Passwords do not match");
        }

        errors.into_result(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request_form() -> RequestForm {
        RequestForm {
            full_name: " Sam Roe ".into(),
            age: "41".into(),
            contact_number: "555-0100".into(),
            hospital_name: "St. Mary".into(),
            hospital_address: "1 Main St".into(),
            organ_type: "Kidney".into(),
            blood_type: "O+".into(),
            urgency_level: Urgency::High,
            is_urgent: true,
            additional_info: "  ".into(),
        }
    }

    #[test]
    fn valid_request_form_builds_submission() {
        let new = request_form().validate("u1").unwrap();
        assert_eq!(new.user_id, "u1");
        assert_eq!(new.full_name, "Sam Roe");
        assert_eq!(new.age, 41);
        assert_eq!(new.additional_info, None);
    }

    #[rstest]
    #[case("", "Age is required")]
    #[case("forty", "Age must be a number")]
    #[case("-3", "Age must be a number")]
    fn age_must_be_present_and_numeric(#[case] age: &str, #[case] message: &str) {
        let form = RequestForm {
            age: age.into(),
            ..request_form()
        };
        let errors = form.validate("u1").unwrap_err();
        assert_eq!(errors.get("age"), Some(message));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn empty_request_form_reports_every_required_field() {
        let errors = RequestForm::default().validate("u1").unwrap_err();
        let fields: Vec<_> = errors.fields().map(|(field, _)| field).collect();
        assert_eq!(
            fields,
            [
                "age",
                "bloodType",
                "contactNumber",
                "fullName",
                "hospitalAddress",
                "hospitalName",
                "organType"
            ]
        );
    }

    #[test]
    fn donor_form_requires_an_organ_and_checkup() {
        let form = DonorProfileForm {
            full_name: "Ana Diaz".into(),
            blood_type: "O+".into(),
            location: "Springfield".into(),
            ..DonorProfileForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("availableOrgans"), Some("Please select at least one organ"));
        assert_eq!(errors.get("lastCheckup"), Some("Last checkup date is required"));
    }

    #[test]
    fn toggle_organ_adds_then_removes() {
        let mut form = DonorProfileForm::default();
        form.toggle_organ("Kidney");
        form.toggle_organ("Liver");
        form.toggle_organ("Kidney");
        assert_eq!(form.available_organs, ["Liver"]);
    }

    #[test]
    fn donor_patches_flag_account_and_reset_donations() {
        let form = DonorProfileForm {
            full_name: "Ana Diaz".into(),
            blood_type: "O+".into(),
            available_organs: vec!["Kidney".into()],
            location: "Springfield".into(),
            last_checkup: "2024-05-01".into(),
            status: Availability::Available,
        };
        assert!(form.validate().is_ok());
        assert_eq!(form.account_patch().is_donor, Some(true));
        assert_eq!(form.donor_patch().total_donations, Some(0));
    }

    #[rstest]
    #[case("", "secret1", Some("email"))]
    #[case("ana@example.com", "", Some("password"))]
    #[case("ana@example.com", "secret1", None)]
    fn login_form_requires_both_fields(
        #[case] email: &str,
        #[case] password: &str,
        #[case] failing: Option<&str>,
    ) {
        let form = LoginForm {
            email: email.into(),
            password: password.into(),
        };
        match (form.validate(), failing) {
            (Ok(()), None) => {}
            (Err(errors), Some(field)) => assert!(errors.get(field).is_some()),
            (result, expected) => panic!("unexpected {result:?} for {expected:?}"),
        }
    }

    #[test]
    fn register_form_checks_password_confirmation() {
        let form = RegisterForm {
            full_name: "Ana Diaz".into(),
            email: "ana@example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret2".into(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("confirmPassword"), Some("Passwords do not match"));
        assert_eq!(errors.len(), 1);
    }
}
