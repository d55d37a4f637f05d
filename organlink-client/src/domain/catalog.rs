//! Selectable values offered by the request and donor forms.

pub const BLOOD_TYPES: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

pub const ORGAN_TYPES: [&str; 6] = ["Kidney", "Liver", "Heart", "Lung", "Cornea", "Bone Marrow"];

pub fn is_known_blood_type(value: &str) -> bool {
    BLOOD_TYPES.contains(&value)
}

pub fn is_known_organ(value: &str) -> bool {
    ORGAN_TYPES.contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookups_are_exact() {
        assert!(is_known_blood_type("AB-"));
        assert!(!is_known_blood_type("ab-"));
        assert!(is_known_organ("Bone Marrow"));
        assert!(!is_known_organ("Pancreas"));
    }
}
