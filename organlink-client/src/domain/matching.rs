//! Filtering and donor/request matching.
//!
//! Every function here is a single pass over an already materialised list.
//! A criterion that is `None` or empty matches everything, and results keep
//! the order of the input.

use serde::{Deserialize, Serialize};

use crate::domain::donor::DonorProfile;
use crate::domain::request::{OrganRequest, RequestStatus, Urgency};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorFilter {
    pub blood_type: Option<String>,
    pub organ_type: Option<String>,
    pub search_query: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilter {
    pub blood_type: Option<String>,
    pub organ_type: Option<String>,
    pub urgency: Option<Urgency>,
    pub search_query: Option<String>,
}

fn active(criterion: &Option<String>) -> Option<&str> {
    criterion.as_deref().filter(|value| !value.is_empty())
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

impl DonorFilter {
    pub fn matches(&self, donor: &DonorProfile) -> bool {
        let blood_type = active(&self.blood_type).is_none_or(|bt| donor.blood_type() == Some(bt));
        let organ_type = active(&self.organ_type).is_none_or(|organ| donor.offers(organ));
        let search = active(&self.search_query).is_none_or(|query| {
            let query = query.to_lowercase();
            contains_ignore_case(donor.full_name(), &query)
                || contains_ignore_case(&donor.location, &query)
        });

        blood_type && organ_type && search && donor.is_available()
    }
}

impl RequestFilter {
    pub fn matches(&self, request: &OrganRequest) -> bool {
        let blood_type = active(&self.blood_type).is_none_or(|bt| request.blood_type == bt);
        let organ_type = active(&self.organ_type).is_none_or(|organ| request.organ_type == organ);
        let urgency = self.urgency.is_none_or(|level| request.urgency_level == level);
        let search = active(&self.search_query).is_none_or(|query| {
            let query = query.to_lowercase();
            contains_ignore_case(&request.full_name, &query)
                || contains_ignore_case(&request.hospital_name, &query)
                || contains_ignore_case(&request.organ_type, &query)
        });

        blood_type && organ_type && urgency && search
    }
}

/// Available donors satisfying every supplied criterion.
pub fn filter_donors<'a>(donors: &'a [DonorProfile], filter: &DonorFilter) -> Vec<&'a DonorProfile> {
    donors.iter().filter(|donor| filter.matches(donor)).collect()
}

pub fn filter_requests<'a>(
    requests: &'a [OrganRequest],
    filter: &RequestFilter,
) -> Vec<&'a OrganRequest> {
    requests
        .iter()
        .filter(|request| filter.matches(request))
        .collect()
}

/// A donor matches when the blood type string is identical, the requested
/// organ is offered and the donor is available. No ABO compatibility rules.
pub fn is_match(request: &OrganRequest, donor: &DonorProfile) -> bool {
    donor.blood_type() == Some(request.blood_type.as_str())
        && donor.offers(&request.organ_type)
        && donor.is_available()
}

pub fn match_donors_for_request<'a>(
    request: &OrganRequest,
    donors: &'a [DonorProfile],
) -> Vec<&'a DonorProfile> {
    donors.iter().filter(|donor| is_match(request, donor)).collect()
}

pub fn user_requests<'a>(requests: &'a [OrganRequest], user_id: &str) -> Vec<&'a OrganRequest> {
    requests
        .iter()
        .filter(|request| request.user_id == user_id)
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    pub total: usize,
    pub pending: usize,
    pub matched: usize,
    pub completed: usize,
}

pub fn request_stats(requests: &[OrganRequest]) -> RequestStats {
    requests
        .iter()
        .fold(RequestStats::default(), |mut stats, request| {
            stats.total += 1;
            match request.status {
                RequestStatus::Pending => stats.pending += 1,
                RequestStatus::Matched => stats.matched += 1,
                RequestStatus::Completed => stats.completed += 1,
            }
            stats
        })
}
