//! Contribution reminders for groups whose next deadline is close.

use std::sync::Arc;

use chrono::Duration;
use mockable::Clock;
use tracing::info;

use super::access::approved_members;
use super::notifier::Notifier;
use super::ports::{GroupRepository, MemberRepository, ServicePorts};
use super::{Error, NotificationKind};

/// Days ahead of a deadline at which reminders start.
pub const DEFAULT_REMINDER_WINDOW_DAYS: u32 = 5;

/// Totals from one reminder sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderSummary {
    /// Active groups with a deadline inside the window.
    pub groups: usize,
    /// Notifications attempted.
    pub reminders: usize,
}

/// Sends `contribution_reminder` notifications.
#[derive(Clone)]
pub struct ContributionReminderService {
    groups: Arc<dyn GroupRepository>,
    members: Arc<dyn MemberRepository>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    window_days: u32,
}

impl ContributionReminderService {
    /// Build the service with a reminder window in days.
    #[must_use]
    pub fn new(ports: &ServicePorts, window_days: u32) -> Self {
        Self {
            groups: Arc::clone(&ports.groups),
            members: Arc::clone(&ports.members),
            notifier: Notifier::new(Arc::clone(&ports.notifications)),
            clock: Arc::clone(&ports.clock),
            window_days,
        }
    }

    /// Notify every approved member of each group due within the window.
    ///
    /// # Errors
    /// Propagates repository failures; notification failures are logged.
    pub async fn send_reminders(&self) -> Result<ReminderSummary, Error> {
        let now = self.clock.utc();
        let cutoff = now + Duration::days(i64::from(self.window_days));
        let due = self.groups.list_due_before(cutoff).await?;
        let mut summary = ReminderSummary::default();
        for group in due {
            let (Some(deadline), Some(terms)) = (group.next_contribution_date, group.terms.as_ref())
            else {
                continue;
            };
            let members = approved_members(self.members.as_ref(), group.id).await?;
            let message = format!(
                "Your contribution of {} for round {} of {} is due {}",
                terms.contribution_amount,
                group.current_round,
                group.name,
                deadline.format("%Y-%m-%d"),
            );
            self.notifier
                .broadcast(
                    &members,
                    None,
                    group.id,
                    NotificationKind::ContributionReminder,
                    "Contribution due soon",
                    &message,
                )
                .await;
            summary.groups += 1;
            summary.reminders += members.len();
        }
        info!(groups = summary.groups, reminders = summary.reminders, "contribution reminders sent");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rstest::rstest;

    use super::*;
    use crate::domain::service_fixtures::{Mocks, active_group, approved, fixture_timestamp};
    use crate::domain::{MemberStatus, UserId};

    #[rstest]
    #[tokio::test]
    async fn reminds_every_approved_member_of_due_groups() {
        let group = active_group(vec![UserId::random()]);
        let group_id = group.id;
        let roster: Vec<_> = (0..3).map(|_| approved(group_id, UserId::random())).collect();

        let mut mocks = Mocks::default();
        mocks
            .groups
            .expect_list_due_before()
            .withf(|cutoff| *cutoff == fixture_timestamp() + Duration::days(5))
            .times(1)
            .return_once(move |_| Ok(vec![group]));
        mocks
            .members
            .expect_list()
            .withf(move |id, status| *id == group_id && *status == Some(MemberStatus::Approved))
            .return_once(move |_, _| Ok(roster));
        mocks
            .notifications
            .expect_notify()
            .withf(|n| {
                n.kind == NotificationKind::ContributionReminder && n.message.contains("100.0")
            })
            .times(3)
            .returning(|_| Ok(()));

        let service = ContributionReminderService::new(&mocks.ports(), DEFAULT_REMINDER_WINDOW_DAYS);
        let summary = service.send_reminders().await.expect("sweep succeeds");
        assert_eq!(summary, ReminderSummary { groups: 1, reminders: 3 });
    }

    #[rstest]
    #[tokio::test]
    async fn empty_sweep_sends_nothing() {
        let mut mocks = Mocks::default();
        mocks.groups.expect_list_due_before().return_once(|_| Ok(Vec::new()));
        mocks.notifications.expect_notify().never();

        let service = ContributionReminderService::new(&mocks.ports(), 1);
        let summary = service.send_reminders().await.expect("sweep succeeds");
        assert_eq!(summary, ReminderSummary::default());
    }
}
