//! Per-member field resolution
//!
//! Contact details come from the survey snapshot held by [`MemberDirectory`];
//! age and invitation state additionally consult the member's live tags.
//! Nothing here fails: a field that cannot be resolved is
//! [`FieldValue::Unknown`], which every branch treats as false.

use chrono::{DateTime, FixedOffset};
use shared::{MemberTag, SubscriptionStatus, SurveyAnswers};
use tracing::{debug, error};

use crate::config::AutomationSettings;
use crate::core::directory::MemberDirectory;
use crate::traits::MailingList;

/// Fields that can be resolved for a contact
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Email,
    Status,
    FullName,
    ResponseId,
    SubmittedAt,
    AdultVerified,
    DiscourseHandle,
    InviteMarker,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Status(SubscriptionStatus),
    Timestamp(DateTime<FixedOffset>),
    Flag(bool),
    Unknown,
}

impl FieldValue {
    pub fn is_true(&self) -> bool {
        matches!(self, FieldValue::Flag(true))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, FieldValue::Unknown)
    }
}

/// Forum handle from a multi-line free-text answer: the last non-empty line
/// with all spaces removed
pub fn handle_from_answer(answer: &str) -> Option<String> {
    answer
        .lines()
        .map(|line| line.replace(' ', "").trim().to_string())
        .filter(|line| !line.is_empty())
        .last()
}

/// Affirmative answer to the age question
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer.starts_with("yes") || matches!(answer.as_str(), "y" | "true" | "18+")
}

pub struct EligibilityResolver<'a, M: ?Sized> {
    api: &'a M,
    directory: &'a MemberDirectory,
    settings: &'a AutomationSettings,
}

impl<'a, M: MailingList + ?Sized> EligibilityResolver<'a, M> {
    pub fn new(api: &'a M, directory: &'a MemberDirectory, settings: &'a AutomationSettings) -> Self {
        Self {
            api,
            directory,
            settings,
        }
    }

    pub async fn resolve(&self, contact_id: &str, field: Field) -> FieldValue {
        let value = match field {
            Field::Email => self.email(contact_id).map(FieldValue::Text),
            Field::Status => self.status(contact_id).map(FieldValue::Status),
            Field::FullName => self.full_name(contact_id).map(FieldValue::Text),
            Field::ResponseId => self.response_id(contact_id).map(FieldValue::Text),
            Field::SubmittedAt => self.submitted_at(contact_id).map(FieldValue::Timestamp),
            Field::AdultVerified => self.adult_verified(contact_id).await.map(FieldValue::Flag),
            Field::DiscourseHandle => self.discourse_handle(contact_id).await.map(FieldValue::Text),
            Field::InviteMarker => self.invite_marker(contact_id).await.map(FieldValue::Flag),
        };
        value.unwrap_or(FieldValue::Unknown)
    }

    pub fn email(&self, contact_id: &str) -> Option<String> {
        self.directory
            .response(contact_id)
            .map(|r| r.contact.email.trim().to_string())
    }

    pub fn status(&self, contact_id: &str) -> Option<SubscriptionStatus> {
        self.directory.response(contact_id)?.contact.status
    }

    pub fn full_name(&self, contact_id: &str) -> Option<String> {
        self.directory
            .response(contact_id)
            .map(|r| r.contact.full_name.trim().to_string())
    }

    pub fn response_id(&self, contact_id: &str) -> Option<String> {
        self.directory.response(contact_id).map(|r| r.response_id.clone())
    }

    pub fn submitted_at(&self, contact_id: &str) -> Option<DateTime<FixedOffset>> {
        self.directory.response(contact_id)?.submitted_at
    }

    /// Age eligibility: the survey's age answer when present, else the
    /// provider's adult tag
    pub async fn adult_verified(&self, contact_id: &str) -> Option<bool> {
        if let Some(question_id) = &self.settings.age_question_id {
            let answer = self
                .answers(contact_id)
                .await
                .and_then(|answers| answers.answer(question_id).map(str::to_string))
                .filter(|answer| !answer.trim().is_empty());
            if let Some(answer) = answer {
                return Some(is_affirmative(&answer));
            }
            debug!("eligibility: No age answer for contact_id '{}', falling back to tag.", contact_id);
        }

        let adult = &self.settings.tags.adult;
        self.tags(contact_id).await.map(|tags| tags.iter().any(|t| adult.matches(t)))
    }

    pub async fn invite_marker(&self, contact_id: &str) -> Option<bool> {
        let marker = &self.settings.tags.invite_marker;
        self.tags(contact_id).await.map(|tags| tags.iter().any(|t| marker.matches(t)))
    }

    pub async fn discourse_handle(&self, contact_id: &str) -> Option<String> {
        let answers = self.answers(contact_id).await?;
        answers
            .answer(&self.settings.discourse_question_id)
            .and_then(handle_from_answer)
    }

    pub async fn is_adult(&self, contact_id: &str) -> bool {
        self.adult_verified(contact_id).await.unwrap_or(false)
    }

    pub async fn has_invite_marker(&self, contact_id: &str) -> bool {
        self.invite_marker(contact_id).await.unwrap_or(false)
    }

    /// Permanent exclusion; an unreadable tag set counts as not excluded
    pub async fn has_no_send(&self, contact_id: &str) -> bool {
        let no_send = &self.settings.tags.no_send;
        self.tags(contact_id)
            .await
            .is_some_and(|tags| tags.iter().any(|t| &t.name == no_send))
    }

    async fn tags(&self, contact_id: &str) -> Option<Vec<MemberTag>> {
        match self.api.member_tags(contact_id).await {
            Ok(tags) => Some(tags),
            Err(e) => {
                error!("eligibility: {}", e);
                None
            }
        }
    }

    /// Response detail, fetched once per response per run
    async fn answers(&self, contact_id: &str) -> Option<SurveyAnswers> {
        let response_id = self.response_id(contact_id)?;
        if let Some(answers) = self.directory.cached_answers(&response_id) {
            return Some(answers);
        }
        match self.api.survey_answers(&response_id).await {
            Ok(answers) => {
                self.directory.cache_answers(&response_id, answers.clone());
                Some(answers)
            }
            Err(e) => {
                error!("eligibility: {}", e);
                None
            }
        }
    }
}
