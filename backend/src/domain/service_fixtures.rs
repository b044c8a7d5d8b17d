//! Shared fixtures for domain service unit tests.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use super::ports::{
    MockGroupRepository, MockLedgerGateway, MockMemberRepository, MockNotificationInbox,
    MockNotificationSink, MockPayoutRepository, MockRoundLedgerRepository, MockUserDirectory, ServicePorts,
};
use super::{
    ContributionTerms, DisplayName, EmailAddress, Group, GroupId, GroupStatus, Member, MemberRole,
    MemberStatus, Money, UserId, UserIdentity, WalletAddress,
};

pub(crate) const MEMBER_WALLET: &str = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";

pub(crate) fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub(crate) fn wallet() -> WalletAddress {
    WalletAddress::new(MEMBER_WALLET).expect("valid wallet")
}

pub(crate) fn identity(id: UserId) -> UserIdentity {
    UserIdentity {
        id,
        display_name: DisplayName::new("Achieng").expect("valid name"),
        email: EmailAddress::new(format!("{}@example.com", id.as_uuid().simple()))
            .expect("valid email"),
        wallet: wallet(),
    }
}

pub(crate) fn money(text: &str) -> Money {
    text.parse().expect("valid amount")
}

pub(crate) fn member(group_id: GroupId, user_id: UserId, role: MemberRole, status: MemberStatus) -> Member {
    Member {
        group_id,
        user_id,
        wallet: wallet(),
        role,
        status,
        joined_at: fixture_timestamp(),
    }
}

pub(crate) fn approved(group_id: GroupId, user_id: UserId) -> Member {
    member(group_id, user_id, MemberRole::Member, MemberStatus::Approved)
}

pub(crate) fn admin(group_id: GroupId, user_id: UserId) -> Member {
    member(group_id, user_id, MemberRole::Admin, MemberStatus::Approved)
}

/// Pending, approved group created by `creator`.
pub(crate) fn pending_group(creator: UserId) -> Group {
    Group {
        id: GroupId::random(),
        name: "Harambee".to_owned(),
        description: "Weekly savings".to_owned(),
        creator_id: creator,
        wallet: wallet(),
        min_members: 3,
        max_members: 5,
        is_approved: true,
        status: GroupStatus::Pending,
        terms: None,
        current_round: 0,
        next_contribution_date: None,
        created_at: fixture_timestamp(),
    }
}

/// Active group paying `100` per round in the given order.
pub(crate) fn active_group(order: Vec<UserId>) -> Group {
    let mut group = pending_group(order[0]);
    group.status = GroupStatus::Active;
    group.terms = Some(ContributionTerms {
        contribution_amount: money("100"),
        period_days: 7,
        payout_order: order,
    });
    group.current_round = 1;
    group.next_contribution_date = Some(fixture_timestamp() + chrono::Duration::days(7));
    group
}

/// Mocks for every port; tests set expectations then call [`Mocks::ports`].
#[derive(Default)]
pub(crate) struct Mocks {
    pub(crate) groups: MockGroupRepository,
    pub(crate) members: MockMemberRepository,
    pub(crate) rounds: MockRoundLedgerRepository,
    pub(crate) payouts: MockPayoutRepository,
    pub(crate) users: MockUserDirectory,
    pub(crate) ledger: MockLedgerGateway,
    pub(crate) notifications: MockNotificationSink,
    pub(crate) inbox: MockNotificationInbox,
}

impl Mocks {
    /// Accept any notification.
    pub(crate) fn quiet_notifications(mut self) -> Self {
        self.notifications.expect_notify().returning(|_| Ok(()));
        self
    }

    pub(crate) fn ports(self) -> ServicePorts {
        ServicePorts {
            groups: Arc::new(self.groups),
            members: Arc::new(self.members),
            rounds: Arc::new(self.rounds),
            payouts: Arc::new(self.payouts),
            users: Arc::new(self.users),
            ledger: Arc::new(self.ledger),
            notifications: Arc::new(self.notifications),
            inbox: Arc::new(self.inbox),
            clock: Arc::new(FixtureClock {
                utc_now: fixture_timestamp(),
            }),
        }
    }
}
