//! Per-run snapshot of list members and their survey responses
//!
//! The bulk survey download is slow, so it happens at most once per run and
//! is indexed by contact id. Nothing here is re-fetched mid-run.

use std::collections::HashMap;
use std::sync::Mutex;

use shared::{ContactId, Member, SurveyAnswers, SurveyResponse};
use tracing::{debug, error, info};

use crate::traits::MailingList;

#[derive(Debug, Default)]
pub struct MemberDirectory {
    total_items: usize,
    respondents: Vec<Member>,
    responses: HashMap<ContactId, SurveyResponse>,
    answers: Mutex<HashMap<String, SurveyAnswers>>,
}

impl MemberDirectory {
    /// Fetch the member listing and, when it is not empty, the survey responses
    ///
    /// Failures are logged and leave the corresponding part of the snapshot empty.
    pub async fn load<M: MailingList + ?Sized>(api: &M) -> Self {
        info!("directory: Getting list members info");
        let listing = match api.list_members().await {
            Ok(listing) => listing,
            Err(e) => {
                error!("directory: {}", e);
                return Self::default();
            }
        };
        if listing.total_items == 0 {
            return Self::from_snapshot(0, listing.members, Vec::new());
        }

        info!("directory: Getting survey responses...(may take a while)");
        let responses = match api.survey_responses().await {
            Ok(responses) => responses,
            Err(e) => {
                error!("directory: {}", e);
                Vec::new()
            }
        };
        Self::from_snapshot(listing.total_items, listing.members, responses)
    }

    /// Build the index; list order is kept and the first response per contact wins
    pub fn from_snapshot(total_items: usize, members: Vec<Member>, responses: Vec<SurveyResponse>) -> Self {
        let mut index: HashMap<ContactId, SurveyResponse> = HashMap::with_capacity(responses.len());
        for response in responses {
            index.entry(response.contact.contact_id.clone()).or_insert(response);
        }

        let respondents: Vec<Member> = members
            .into_iter()
            .filter(|member| {
                let has_response = index.contains_key(&member.contact_id);
                if !has_response {
                    debug!("directory: No survey response for contact_id '{}'.", member.contact_id);
                }
                has_response
            })
            .collect();

        Self {
            total_items,
            respondents,
            responses: index,
            answers: Mutex::new(HashMap::new()),
        }
    }

    /// Total reported by the provider, before matching against responses
    pub fn total_items(&self) -> usize {
        self.total_items
    }

    /// Members with a survey response, in list order
    pub fn respondents(&self) -> &[Member] {
        &self.respondents
    }

    pub fn contact_id(&self, index: usize) -> Option<&str> {
        self.respondents.get(index).map(|m| m.contact_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.respondents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.respondents.is_empty()
    }

    pub fn response(&self, contact_id: &str) -> Option<&SurveyResponse> {
        self.responses.get(contact_id)
    }

    pub fn cached_answers(&self, response_id: &str) -> Option<SurveyAnswers> {
        self.answers.lock().ok()?.get(response_id).cloned()
    }

    pub fn cache_answers(&self, response_id: &str, answers: SurveyAnswers) {
        if let Ok(mut cache) = self.answers.lock() {
            cache.insert(response_id.to_string(), answers);
        }
    }
}
