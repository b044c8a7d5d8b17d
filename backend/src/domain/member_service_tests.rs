//! Tests for membership records, join requests, reviews and nomination.

use rstest::rstest;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::MemberRepositoryError;
use crate::domain::service_fixtures::{
    Mocks, admin, approved, fixture_timestamp, identity, member, pending_group, wallet,
};
use crate::domain::Group;

fn expect_group(mocks: &mut Mocks, group: Group) {
    mocks
        .groups
        .expect_find_by_id()
        .returning(move |_| Ok(Some(group.clone())));
}

/// Serve `find` from a fixed roster.
fn expect_roster(mocks: &mut Mocks, roster: Vec<Member>) {
    mocks.members.expect_find().returning(move |_, user| {
        Ok(roster.iter().find(|m| m.user_id == user).cloned())
    });
}

#[rstest]
#[tokio::test]
async fn add_member_maps_duplicates_to_conflict() {
    let mut mocks = Mocks::default();
    mocks
        .members
        .expect_add()
        .returning(|_| Err(MemberRepositoryError::duplicate_member()));

    let err = MembershipService::new(&mocks.ports())
        .add_member(
            GroupId::random(),
            UserId::random(),
            wallet(),
            MemberRole::Member,
            MemberStatus::Pending,
        )
        .await
        .expect_err("duplicate");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[case::approve(MemberStatus::Pending, MemberStatus::Approved, true)]
#[case::reject(MemberStatus::Pending, MemberStatus::Rejected, true)]
#[case::reapprove(MemberStatus::Approved, MemberStatus::Approved, false)]
#[case::unreject(MemberStatus::Rejected, MemberStatus::Approved, false)]
#[tokio::test]
async fn set_member_status_guards_terminal_states(
    #[case] current: MemberStatus,
    #[case] next: MemberStatus,
    #[case] allowed: bool,
) {
    let group_id = GroupId::random();
    let row = member(group_id, UserId::random(), MemberRole::Member, current);
    let user_id = row.user_id;
    let mut mocks = Mocks::default();
    expect_roster(&mut mocks, vec![row]);
    mocks
        .members
        .expect_set_status()
        .times(usize::from(allowed))
        .returning(|_, _, _| Ok(()));

    let result = MembershipService::new(&mocks.ports())
        .set_member_status(group_id, user_id, next)
        .await;

    if allowed {
        assert_eq!(result.expect("transition").status, next);
    } else {
        assert_eq!(result.expect_err("terminal").code(), ErrorCode::PreconditionFailed);
    }
}

#[rstest]
#[tokio::test]
async fn admin_check_reflects_role() {
    let group_id = GroupId::random();
    let boss = admin(group_id, UserId::random());
    let plain = approved(group_id, UserId::random());
    let (boss_id, plain_id) = (boss.user_id, plain.user_id);
    let mut mocks = Mocks::default();
    expect_roster(&mut mocks, vec![boss, plain]);
    let service = MembershipService::new(&mocks.ports());

    assert!(service.is_admin_or_creator(group_id, boss_id).await.expect("lookup"));
    assert!(!service.is_admin_or_creator(group_id, plain_id).await.expect("lookup"));
    assert!(!service
        .is_admin_or_creator(group_id, UserId::random())
        .await
        .expect("lookup"));
}

#[rstest]
#[tokio::test]
async fn join_creates_pending_member_and_notifies_admins() {
    let group = pending_group(UserId::random());
    let group_id = group.id;
    let creator = member(group_id, group.creator_id, MemberRole::Creator, MemberStatus::Approved);
    let plain = approved(group_id, UserId::random());
    let applicant = UserId::random();

    let mut mocks = Mocks::default();
    expect_group(&mut mocks, group);
    mocks.users.expect_find().returning(|id| Ok(Some(identity(id))));
    expect_roster(&mut mocks, Vec::new());
    mocks.members.expect_count_approved().return_const(Ok(2_u32));
    mocks
        .members
        .expect_add()
        .withf(move |m| {
            m.user_id == applicant
                && m.status == MemberStatus::Pending
                && m.role == MemberRole::Member
                && m.joined_at == fixture_timestamp()
        })
        .times(1)
        .returning(|_| Ok(()));
    mocks
        .members
        .expect_list()
        .returning(move |_, _| Ok(vec![creator.clone(), plain.clone()]));
    mocks
        .notifications
        .expect_notify()
        .withf(|n| n.kind == NotificationKind::JoinRequest)
        .times(1)
        .returning(|_| Ok(()));

    let joined = MembershipService::new(&mocks.ports())
        .join_group(group_id, applicant)
        .await
        .expect("joined");
    assert_eq!(joined.status, MemberStatus::Pending);
}

#[rstest]
#[case::pending(MemberStatus::Pending, "join request already pending")]
#[case::approved(MemberStatus::Approved, "already a member")]
#[case::rejected(MemberStatus::Rejected, "join request was rejected")]
#[tokio::test]
async fn join_with_existing_record_conflicts(#[case] status: MemberStatus, #[case] message: &str) {
    let group = pending_group(UserId::random());
    let group_id = group.id;
    let applicant = UserId::random();
    let mut mocks = Mocks::default();
    expect_group(&mut mocks, group);
    mocks.users.expect_find().returning(|id| Ok(Some(identity(id))));
    expect_roster(
        &mut mocks,
        vec![member(group_id, applicant, MemberRole::Member, status)],
    );
    mocks.members.expect_add().never();

    let err = MembershipService::new(&mocks.ports())
        .join_group(group_id, applicant)
        .await
        .expect_err("existing record");
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(err.message(), message);
}

#[rstest]
#[tokio::test]
async fn join_full_group_fails() {
    let group = pending_group(UserId::random());
    let group_id = group.id;
    let mut mocks = Mocks::default();
    expect_group(&mut mocks, group);
    mocks.users.expect_find().returning(|id| Ok(Some(identity(id))));
    expect_roster(&mut mocks, Vec::new());
    mocks.members.expect_count_approved().return_const(Ok(5_u32));
    mocks.members.expect_add().never();

    let err = MembershipService::new(&mocks.ports())
        .join_group(group_id, UserId::random())
        .await
        .expect_err("full");
    assert_eq!(err.code(), ErrorCode::PreconditionFailed);
    assert_eq!(err.message(), "group is full");
}

#[rstest]
#[tokio::test]
async fn approval_reaching_minimum_tells_the_creator() {
    let mut group = pending_group(UserId::random());
    group.is_approved = false;
    let group_id = group.id;
    let creator_id = group.creator_id;
    let creator = member(group_id, creator_id, MemberRole::Creator, MemberStatus::Approved);
    let applicant = member(group_id, UserId::random(), MemberRole::Member, MemberStatus::Pending);
    let applicant_id = applicant.user_id;

    let mut mocks = Mocks::default();
    expect_group(&mut mocks, group);
    expect_roster(&mut mocks, vec![creator, applicant]);
    let mut counts = vec![3_u32, 2].into_iter();
    mocks
        .members
        .expect_count_approved()
        .times(2)
        .returning(move |_| Ok(counts.next_back().unwrap_or(3)));
    mocks
        .members
        .expect_set_status()
        .withf(move |_, user, status| *user == applicant_id && *status == MemberStatus::Approved)
        .times(1)
        .returning(|_, _, _| Ok(()));
    mocks
        .notifications
        .expect_notify()
        .withf(move |n| n.user_id == applicant_id && n.kind == NotificationKind::MembershipApproved)
        .times(1)
        .returning(|_| Ok(()));
    mocks
        .notifications
        .expect_notify()
        .withf(move |n| n.user_id == creator_id && n.kind == NotificationKind::GroupReady)
        .times(1)
        .returning(|_| Ok(()));

    let reviewed = MembershipService::new(&mocks.ports())
        .review_member(MemberReview {
            group_id,
            actor: creator_id,
            user_id: applicant_id,
            approve: true,
        })
        .await
        .expect("reviewed");
    assert_eq!(reviewed.status, MemberStatus::Approved);
}

#[rstest]
#[tokio::test]
async fn approvals_beyond_minimum_do_not_renotify_the_creator() {
    let mut group = pending_group(UserId::random());
    group.is_approved = false;
    let group_id = group.id;
    let creator_id = group.creator_id;
    let creator = member(group_id, creator_id, MemberRole::Creator, MemberStatus::Approved);
    let applicant = member(group_id, UserId::random(), MemberRole::Member, MemberStatus::Pending);
    let applicant_id = applicant.user_id;

    let mut mocks = Mocks::default();
    expect_group(&mut mocks, group);
    expect_roster(&mut mocks, vec![creator, applicant]);
    let mut counts = vec![4_u32, 3].into_iter();
    mocks
        .members
        .expect_count_approved()
        .times(2)
        .returning(move |_| Ok(counts.next_back().unwrap_or(4)));
    mocks
        .members
        .expect_set_status()
        .times(1)
        .returning(|_, _, _| Ok(()));
    mocks
        .notifications
        .expect_notify()
        .withf(|n| n.kind == NotificationKind::MembershipApproved)
        .times(1)
        .returning(|_| Ok(()));
    mocks
        .notifications
        .expect_notify()
        .withf(|n| n.kind == NotificationKind::GroupReady)
        .never();

    MembershipService::new(&mocks.ports())
        .review_member(MemberReview {
            group_id,
            actor: creator_id,
            user_id: applicant_id,
            approve: true,
        })
        .await
        .expect("reviewed");
}

#[rstest]
#[tokio::test]
async fn plain_members_cannot_review() {
    let group = pending_group(UserId::random());
    let group_id = group.id;
    let plain = approved(group_id, UserId::random());
    let plain_id = plain.user_id;
    let mut mocks = Mocks::default();
    expect_group(&mut mocks, group);
    expect_roster(&mut mocks, vec![plain]);
    mocks.members.expect_set_status().never();

    let err = MembershipService::new(&mocks.ports())
        .review_member(MemberReview {
            group_id,
            actor: plain_id,
            user_id: UserId::random(),
            approve: false,
        })
        .await
        .expect_err("not admin");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn failed_notification_does_not_fail_rejection() {
    let group = pending_group(UserId::random());
    let group_id = group.id;
    let boss = admin(group_id, UserId::random());
    let applicant = member(group_id, UserId::random(), MemberRole::Member, MemberStatus::Pending);
    let (boss_id, applicant_id) = (boss.user_id, applicant.user_id);
    let mut mocks = Mocks::default();
    expect_group(&mut mocks, group);
    expect_roster(&mut mocks, vec![boss, applicant]);
    mocks.members.expect_set_status().returning(|_, _, _| Ok(()));
    mocks
        .notifications
        .expect_notify()
        .returning(|_| Err(crate::domain::ports::NotificationError::delivery("inbox offline")));

    let reviewed = MembershipService::new(&mocks.ports())
        .review_member(MemberReview {
            group_id,
            actor: boss_id,
            user_id: applicant_id,
            approve: false,
        })
        .await
        .expect("rejection succeeds");
    assert_eq!(reviewed.status, MemberStatus::Rejected);
}

fn nomination(group_id: GroupId, nominator_id: UserId, nominee_id: UserId) -> AdminNomination {
    AdminNomination {
        group_id,
        nominator_id,
        nominee_id,
        status: NominationStatus::Pending,
        created_at: fixture_timestamp(),
    }
}

#[rstest]
#[case::first(1, false)]
#[case::second(2, true)]
#[tokio::test]
async fn second_distinct_nomination_promotes(#[case] nominators: usize, #[case] promoted: bool) {
    let group = pending_group(UserId::random());
    let group_id = group.id;
    let voter = approved(group_id, UserId::random());
    let nominee = approved(group_id, UserId::random());
    let (voter_id, nominee_id) = (voter.user_id, nominee.user_id);
    let mut pending: Vec<_> = (1..nominators)
        .map(|_| nomination(group_id, UserId::random(), nominee_id))
        .collect();
    pending.push(nomination(group_id, voter_id, nominee_id));

    let mut mocks = Mocks::default();
    expect_group(&mut mocks, group);
    expect_roster(&mut mocks, vec![voter, nominee]);
    mocks.members.expect_add_nomination().times(1).returning(|_| Ok(()));
    mocks
        .members
        .expect_pending_nominations()
        .returning(move |_, _| Ok(pending.clone()));
    mocks
        .members
        .expect_promote_to_admin()
        .times(usize::from(promoted))
        .returning(|_, _| Ok(()));
    mocks
        .notifications
        .expect_notify()
        .withf(move |n| n.user_id == nominee_id && n.kind == NotificationKind::AdminPromotion)
        .times(usize::from(promoted))
        .returning(|_| Ok(()));

    let outcome = MembershipService::new(&mocks.ports())
        .nominate_admin(group_id, voter_id, nominee_id)
        .await
        .expect("nominated");
    assert_eq!(
        outcome,
        NominationOutcome {
            nominations: nominators,
            promoted,
        }
    );
}

#[rstest]
#[tokio::test]
async fn nominations_reject_self_and_existing_admins() {
    let group = pending_group(UserId::random());
    let group_id = group.id;
    let voter = approved(group_id, UserId::random());
    let boss = admin(group_id, UserId::random());
    let (voter_id, boss_id) = (voter.user_id, boss.user_id);
    let mut mocks = Mocks::default();
    expect_group(&mut mocks, group);
    expect_roster(&mut mocks, vec![voter, boss]);
    mocks.members.expect_add_nomination().never();
    let service = MembershipService::new(&mocks.ports());

    let own = service
        .nominate_admin(group_id, voter_id, voter_id)
        .await
        .expect_err("self");
    assert_eq!(own.code(), ErrorCode::InvalidRequest);

    let existing = service
        .nominate_admin(group_id, voter_id, boss_id)
        .await
        .expect_err("already admin");
    assert_eq!(existing.code(), ErrorCode::Conflict);
}
