use serde::Serialize;

use crate::domain::donor::DonorProfile;
use crate::domain::matching::{RequestStats, match_donors_for_request, request_stats};
use crate::domain::request::OrganRequest;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMatches {
    pub request: OrganRequest,
    pub donors: Vec<DonorProfile>,
}

/// Hospital dashboard: totals, status counts, and the matching donors for
/// every request in feed order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalDashboard {
    pub donor_count: usize,
    pub request_count: usize,
    pub stats: RequestStats,
    pub entries: Vec<RequestMatches>,
}

impl HospitalDashboard {
    pub fn build(requests: &[OrganRequest], donors: &[DonorProfile]) -> Self {
        let entries = requests
            .iter()
            .map(|request| RequestMatches {
                request: request.clone(),
                donors: match_donors_for_request(request, donors)
                    .into_iter()
                    .cloned()
                    .collect(),
            })
            .collect();

        Self {
            donor_count: donors.len(),
            request_count: requests.len(),
            stats: request_stats(requests),
            entries,
        }
    }
}
