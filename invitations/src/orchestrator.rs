//! Reconciliation orchestrator
//!
//! Drives one automation run: reconcile every survey respondent's
//! subscription and tags, make sure a single draft campaign carries the
//! next Open Evening's date and link, send it, wait for sending to finish
//! and archive the invited members. Everything runs strictly in sequence.

use chrono::{Local, NaiveDate};
use std::collections::BTreeSet;

use shared::{Campaign, CampaignStatus, CalendarEvent, ContactId, LogSink, SubscriptionStatus};
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::core::audit::{membership_row, AuditEntry, AuditLinks};
use crate::core::calendar::select_open_evening;
use crate::core::{ContentSynchronizer, EligibilityResolver, MemberDirectory, Scheduler};
use crate::error::{InvitationError, InvitationResult};
use crate::reporting::{render_status_table, AuditReporter, StatusRow};
use crate::traits::{Forum, MailingList};

/// What the eligibility branch did for one member
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EligibilityOutcome {
    /// First invitation: stamp and marker applied
    Invited,
    /// Already carried the marker; stamp and marker applied again
    Restamped,
    /// Not age verified: NoSend applied and unsubscribed
    Excluded,
}

/// Flags selecting what a run does
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub status: bool,
    pub auto: bool,
    pub force: bool,
    pub quiet: bool,
    pub campaign_info: bool,
}

impl RunOptions {
    pub fn any(&self) -> bool {
        self.status || self.auto || self.force || self.quiet || self.campaign_info
    }
}

/// Main orchestrator over the two REST collaborators
pub struct Orchestrator<M, F>
where
    M: MailingList,
    F: Forum,
{
    mailing_list: M,
    forum: F,
    settings: Settings,
    scheduler: Scheduler,
    synchronizer: ContentSynchronizer,
    today: NaiveDate,
}

impl<M, F> Orchestrator<M, F>
where
    M: MailingList,
    F: Forum,
{
    /// Create new orchestrator with injected collaborators
    pub fn new(mailing_list: M, forum: F, settings: Settings) -> InvitationResult<Self> {
        let scheduler = Scheduler::new(settings.automation.reference_date);
        let synchronizer = ContentSynchronizer::new(&settings.automation.calendar_url)?;
        Ok(Self {
            mailing_list,
            forum,
            settings,
            scheduler,
            synchronizer,
            today: Local::now().date_naive(),
        })
    }

    /// Pin the run date
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn mailing_list(&self) -> &M {
        &self.mailing_list
    }

    pub fn forum(&self) -> &F {
        &self.forum
    }

    /// Snapshot of members and survey responses for this run
    pub async fn load_directory(&self) -> MemberDirectory {
        MemberDirectory::load(&self.mailing_list).await
    }

    /// Next Open Evening published on the forum calendar, if any
    pub async fn next_open_evening(&self) -> Option<CalendarEvent> {
        debug!("calendar: Getting URL and Date from the forum calendar.");
        match self.forum.calendar_topics().await {
            Ok(topics) => select_open_evening(&topics, self.today, &self.settings.automation.calendar_url),
            Err(e) => {
                error!("calendar: Could not retrieve Open Evening info: {}", e);
                None
            }
        }
    }

    /// Full reconcile → tag → send → archive pass
    ///
    /// Returns the contact ids that were archived. Only a failed campaign
    /// send aborts the pass; tags already applied are left in place.
    pub async fn automate(&self, directory: &MemberDirectory) -> InvitationResult<BTreeSet<ContactId>> {
        let resolver = EligibilityResolver::new(&self.mailing_list, directory, &self.settings.automation);
        let count = directory.len();
        if count == 0 {
            info!("automate: No Survey results. Nothing to do. Everything's Chimpy!");
            return Ok(BTreeSet::new());
        }
        info!("automate: Started automation for {} list members.", count);

        let mut outcomes = Vec::with_capacity(count);
        for index in 0..count {
            let Some(contact_id) = directory.contact_id(index) else {
                continue;
            };
            self.refresh_subscription(&resolver, index, contact_id).await;
            outcomes.push(self.apply_eligibility(&resolver, index, contact_id).await);
        }
        let tally = |wanted: EligibilityOutcome| outcomes.iter().filter(|o| **o == wanted).count();
        info!(
            "automate: {} invited, {} re-stamped, {} excluded.",
            tally(EligibilityOutcome::Invited),
            tally(EligibilityOutcome::Restamped),
            tally(EligibilityOutcome::Excluded)
        );

        let draft = self.ensure_draft().await.ok_or_else(|| InvitationError::CampaignSend {
            campaign_id: String::new(),
            reason: "no draft campaign available".to_string(),
        })?;
        self.synchronize_draft(&draft).await;

        if let Err(e) = self.mailing_list.send_campaign(&draft.id).await {
            error!("automate: Sending campaign '{}' failed - halting automation: {}", draft.id, e);
            return Err(InvitationError::CampaignSend {
                campaign_id: draft.id.clone(),
                reason: e.to_string(),
            });
        }
        self.wait_while_sending().await;

        info!("automate: Successfully processed {} list members.", count);
        info!(
            "automate: Successfully sent campaign: [{}]({})",
            draft.id,
            self.settings.mailchimp.report_url(draft.web_id)
        );

        let mut archived = BTreeSet::new();
        for index in (0..count).rev() {
            let Some(contact_id) = directory.contact_id(index) else {
                continue;
            };
            if resolver.has_invite_marker(contact_id).await {
                if let Err(e) = self.mailing_list.archive(contact_id).await {
                    error!("automate: {}", e);
                }
                archived.insert(contact_id.to_string());
            } else if !resolver.is_adult(contact_id).await {
                warn!("automate: Member {} not 18+, left unsubscribed and not archived.", index);
            }
        }
        Ok(archived)
    }

    /// Unsubscribe/subscribe pair for anyone not reported as subscribed
    ///
    /// The provider only re-triggers its confirmation flow this way, not on a
    /// direct status write.
    async fn refresh_subscription(
        &self,
        resolver: &EligibilityResolver<'_, M>,
        index: usize,
        contact_id: &str,
    ) {
        if resolver.status(contact_id) == Some(SubscriptionStatus::Subscribed) {
            debug!("automate: List member {} already subscribed.", index);
            return;
        }
        let email = resolver.email(contact_id).unwrap_or_default();
        self.set_status(contact_id, &email, SubscriptionStatus::Unsubscribed).await;
        tokio::time::sleep(self.settings.automation.settle_delay).await;
        self.set_status(contact_id, &email, SubscriptionStatus::Subscribed).await;
    }

    async fn apply_eligibility(
        &self,
        resolver: &EligibilityResolver<'_, M>,
        index: usize,
        contact_id: &str,
    ) -> EligibilityOutcome {
        let tags = &self.settings.automation.tags;
        let has_marker = resolver.has_invite_marker(contact_id).await;

        if resolver.has_no_send(contact_id).await {
            warn!("automate: Member {} tagged '{}', not invited.", index, tags.no_send);
        } else if resolver.is_adult(contact_id).await {
            self.add_tag(contact_id, &tags.stamp(self.today)).await;
            self.add_tag(contact_id, &tags.invite_marker.name).await;
            return if has_marker {
                EligibilityOutcome::Restamped
            } else {
                EligibilityOutcome::Invited
            };
        } else {
            warn!("automate: Member {} not 18+", index);
        }

        if has_marker {
            if let Err(e) = self.mailing_list.remove_tag(contact_id, &tags.invite_marker.name).await {
                error!("automate: {}", e);
            }
        }
        self.add_tag(contact_id, &tags.no_send).await;
        // only subscribed members will be invited
        let email = resolver.email(contact_id).unwrap_or_default();
        self.set_status(contact_id, &email, SubscriptionStatus::Unsubscribed).await;
        EligibilityOutcome::Excluded
    }

    async fn add_tag(&self, contact_id: &str, tag: &str) {
        match self.mailing_list.add_tag(contact_id, tag).await {
            Ok(()) => debug!("automate: Added tag '{}' to contact_id '{}'.", tag, contact_id),
            Err(e) => error!("automate: {}", e),
        }
    }

    async fn set_status(&self, contact_id: &str, email: &str, status: SubscriptionStatus) {
        match self.mailing_list.set_status(contact_id, status).await {
            Ok(()) => debug!("automate: Set '{}' to {}.", email, status),
            Err(e) => error!("automate: Failed setting '{}' to {}: {}", email, status, e),
        }
    }

    /// Newest draft, creating one when none exists; surplus drafts are deleted
    async fn ensure_draft(&self) -> Option<Campaign> {
        match self.mailing_list.campaigns(CampaignStatus::Draft, 10).await {
            Ok(page) => {
                let mut drafts = page.campaigns.into_iter();
                if let Some(newest) = drafts.next() {
                    for surplus in drafts {
                        warn!("automate: Deleting surplus draft campaign '{}'.", surplus.id);
                        if let Err(e) = self.mailing_list.delete_campaign(&surplus.id).await {
                            error!("automate: {}", e);
                        }
                    }
                    return Some(newest);
                }
            }
            Err(e) => {
                error!("automate: Could not query draft campaigns: {}", e);
                return None;
            }
        }

        let title = format!("{} {}", self.settings.mailchimp.campaign.title_prefix, self.today);
        match self.mailing_list.create_campaign(&title).await {
            Ok(campaign) => {
                info!("automate: Created draft campaign '{}'.", campaign.id);
                Some(campaign)
            }
            Err(e) => {
                error!("automate: {}", e);
                None
            }
        }
    }

    /// Patch the draft so it advertises the validated next Open Evening
    async fn synchronize_draft(&self, draft: &Campaign) {
        let calendar_event = self.next_open_evening().await;
        let Some(event) = self.scheduler.authoritative_event(calendar_event, self.today) else {
            error!("automate: No valid Open Evening event, campaign content not updated.");
            return;
        };

        let current = match self.mailing_list.campaign_content(&draft.id).await {
            Ok(content) => content,
            Err(e) => {
                error!("automate: {}", e);
                return;
            }
        };

        // A freshly created draft only has the template; carry the last invitation forward
        let source = if self.synchronizer.extract_url(&current).is_some() {
            current.clone()
        } else {
            match self.last_sent_content().await {
                Some(content) => content,
                None => current.clone(),
            }
        };

        let updated = self.synchronizer.synchronize(&source, &event, self.today);
        if updated != current {
            if let Err(e) = self.mailing_list.set_campaign_content(&draft.id, &updated).await {
                error!("automate: {}", e);
            }
        }
    }

    async fn last_sent_campaign(&self) -> Option<Campaign> {
        match self.mailing_list.campaigns(CampaignStatus::Sent, 1).await {
            Ok(page) => page.latest().cloned(),
            Err(e) => {
                error!("campaign: Can not get last sent campaign: {}", e);
                None
            }
        }
    }

    async fn last_sent_content(&self) -> Option<String> {
        let campaign = self.last_sent_campaign().await?;
        match self.mailing_list.campaign_content(&campaign.id).await {
            Ok(content) => Some(content),
            Err(e) => {
                error!("campaign: {}", e);
                None
            }
        }
    }

    /// Block until no campaign of the list is sending
    async fn wait_while_sending(&self) {
        loop {
            match self.mailing_list.campaigns(CampaignStatus::Sending, 1).await {
                Ok(page) if page.total_items > 0 => {
                    debug!(
                        "automate: Campaign still sending. Waiting {}s...",
                        self.settings.automation.poll_interval.as_secs()
                    );
                    tokio::time::sleep(self.settings.automation.poll_interval).await;
                }
                Ok(_) => break,
                Err(e) => {
                    error!("automate: Could not check sending state: {}", e);
                    break;
                }
            }
        }
    }

    /// Table of every respondent's state
    pub async fn status(&self, directory: &MemberDirectory) -> Vec<StatusRow> {
        if directory.is_empty() {
            info!("status: We have no survey results. Nothing to do.");
            return Vec::new();
        }
        info!("status: There are currently {} survey results.", directory.len());

        let resolver = EligibilityResolver::new(&self.mailing_list, directory, &self.settings.automation);
        let mut rows = Vec::with_capacity(directory.len());
        for (index, member) in directory.respondents().iter().enumerate() {
            let contact_id = member.contact_id.as_str();
            rows.push(StatusRow {
                index,
                email: resolver.email(contact_id).unwrap_or_default(),
                status: resolver.status(contact_id),
                adult: resolver.is_adult(contact_id).await,
                response_id: resolver.response_id(contact_id).unwrap_or_default(),
                invited: resolver.has_invite_marker(contact_id).await,
            });
        }
        rows
    }

    /// Log the last sent campaign next to the calendar's event
    pub async fn campaign_info(&self, calendar_event: Option<&CalendarEvent>) {
        let Some(campaign) = self.last_sent_campaign().await else {
            return;
        };
        let send_time = campaign.send_time.clone().unwrap_or_default();
        let (sent_date, sent_clock) = send_time.split_once('T').unwrap_or((send_time.as_str(), ""));
        let sent_clock = sent_clock.split('+').next().unwrap_or_default();

        info!(
            "Most recent campaign_id: [{}]({}). Sent: {}, {}",
            campaign.id,
            self.settings.mailchimp.report_url(campaign.web_id),
            sent_date,
            sent_clock
        );
        if let Some(content) = self.last_sent_content().await {
            match self.synchronizer.extract_url(&content) {
                Some(url) => info!("OE URL from most recent campaign: {}", url),
                None => warn!("OE URL from most recent campaign: not found"),
            }
        }
        match calendar_event {
            Some(event) => info!("Most recent OE Discourse event: {}", event.url),
            None => warn!("Most recent OE Discourse event: none"),
        }
    }

    /// Membership-table entries for archived members
    pub async fn collect_member_info(&self, directory: &MemberDirectory, archived: &BTreeSet<ContactId>) -> Vec<AuditEntry> {
        let resolver = EligibilityResolver::new(&self.mailing_list, directory, &self.settings.automation);
        let campaign_id = self.last_sent_campaign().await.map(|c| c.id).unwrap_or_default();

        let mut entries = Vec::with_capacity(archived.len());
        for contact_id in archived {
            let adult = resolver.is_adult(contact_id).await;
            entries.push(AuditEntry {
                date: self.today,
                contact_id: contact_id.clone(),
                full_name: resolver.full_name(contact_id).unwrap_or_default(),
                email: resolver.email(contact_id).unwrap_or_default(),
                response_id: resolver.response_id(contact_id).unwrap_or_default(),
                discourse_handle: resolver.discourse_handle(contact_id).await.unwrap_or_default(),
                campaign_id: adult.then(|| campaign_id.clone()),
            });
        }
        entries
    }

    fn audit_links(&self, report_web_id: u64) -> AuditLinks {
        let mailchimp = &self.settings.mailchimp;
        AuditLinks {
            website_url: self.settings.automation.website_url.clone(),
            forum_url: self.settings.discourse.base_url.clone(),
            contact_url: mailchimp.contact_url(""),
            survey_result_url: mailchimp.survey_result_url("{response_id}"),
            report_url: mailchimp.report_url(report_web_id),
        }
    }

    /// One invocation of the CLI driver
    ///
    /// Returns the archived contact ids. A failed campaign send is returned
    /// as an error and skips all audit publishing.
    pub async fn run(&self, options: RunOptions, sink: &LogSink) -> InvitationResult<BTreeSet<ContactId>> {
        let directory = if options.status || options.auto {
            self.load_directory().await
        } else {
            MemberDirectory::default()
        };

        if options.status {
            let rows = self.status(&directory).await;
            if !rows.is_empty() {
                println!("{}", render_status_table(&rows));
            }
        }

        let calendar_event = if options.any() {
            self.next_open_evening().await
        } else {
            None
        };
        let open_evening_today = calendar_event.as_ref().map(|e| e.date) == Some(self.today);

        let mut archived = BTreeSet::new();
        if options.auto {
            if open_evening_today {
                warn!("Today is Open Evening! No invitation unless argument -f / --force is used.");
            } else if !options.force {
                if self.scheduler.has_valid_upcoming_event(calendar_event.as_ref(), self.today) {
                    debug!("Found calendar event for next Open Eve. **Everything's Chimpy!**");
                    archived = self.automate(&directory).await?;
                } else {
                    warn!(
                        "No valid event for next Open Eve on the forum. **No Invitations will be sent** \
                         unless the calendar event is created."
                    );
                }
            }
            if options.force {
                warn!("automate: started with --force argument.");
                archived = self.automate(&directory).await?;
            }
        } else if options.force {
            info!("argument -f / --force needs to be called together with -a / --auto");
        }

        if options.campaign_info {
            self.campaign_info(calendar_event.as_ref()).await;
        }

        if open_evening_today {
            warn!("Today is open evening. Campaign content and url need updating!");
        }

        let reporter = AuditReporter::new(&self.forum, &self.settings, self.today);
        if !archived.is_empty() {
            let web_id = self.last_sent_campaign().await.map(|c| c.web_id).unwrap_or_default();
            let links = self.audit_links(web_id);
            let rows: Vec<String> = self
                .collect_member_info(&directory, &archived)
                .await
                .iter()
                .map(|entry| membership_row(entry, &links))
                .collect();
            reporter.publish_membership_table(&rows).await;
        }

        if options.any() && !options.quiet {
            reporter.publish_logs(&sink.drain(), Local::now().naive_local()).await;
        }

        Ok(archived)
    }
}
