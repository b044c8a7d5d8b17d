//! Integration tests for `DieselRoundLedgerRepository`.
//!
//! Contributions and round snapshots are written against embedded
//! PostgreSQL through the shared template-database fixture.

use chama_backend::domain::ports::{RoundLedgerRepository, RoundLedgerRepositoryError};
use chama_backend::domain::{
    ContributionId, ContributionStatus, GroupId, RoundContribution, RoundPhase, TxHash, UserId,
};
use chama_backend::outbound::persistence::DieselRoundLedgerRepository;
use futures_util::future::join_all;
use rstest::{fixture, rstest};

mod pg_support;

use pg_support::{PgContext, fixture_timestamp, money, pg_context, seed_active_group};

#[fixture]
fn context() -> Option<PgContext> {
    pg_context()
}

fn contribution(group_id: GroupId, user_id: UserId, round: u32) -> RoundContribution {
    RoundContribution {
        id: ContributionId::random(),
        group_id,
        user_id,
        round,
        amount: money("100"),
        status: ContributionStatus::Confirmed,
        tx_hash: Some(TxHash::new(format!("tx-{user_id}")).expect("hash")),
        created_at: fixture_timestamp(),
    }
}

#[rstest]
fn duplicate_contribution_is_rejected(context: Option<PgContext>) {
    let Some(context) = context else {
        eprintln!("SKIP-TEST-CLUSTER: duplicate_contribution_is_rejected skipped");
        return;
    };
    context.runtime.block_on(async {
        let seeded = seed_active_group(&context.pool, 3).await;
        let repository = DieselRoundLedgerRepository::new(context.pool.clone());
        let payer = seeded.members[1];

        let status = repository
            .record_contribution(&contribution(seeded.group.id, payer, 1), money("100"))
            .await
            .expect("first contribution");
        assert_eq!(status.contributors_count, 1);
        assert_eq!(status.required_count, 3);
        assert_eq!(status.status, RoundPhase::Collecting);

        let err = repository
            .record_contribution(&contribution(seeded.group.id, payer, 1), money("100"))
            .await
            .expect_err("second confirmed contribution");
        assert_eq!(err, RoundLedgerRepositoryError::duplicate_contribution());

        let stored = repository
            .round_status(seeded.group.id, 1)
            .await
            .expect("status query")
            .expect("snapshot stored");
        assert_eq!(stored.contributors_count, 1);
        assert_eq!(stored.total_received, money("100"));
        let rows = repository
            .contributions(seeded.group.id, 1)
            .await
            .expect("contributions");
        assert_eq!(rows.len(), 1);
    });
}

#[rstest]
fn concurrent_first_contributions_all_reach_the_snapshot(context: Option<PgContext>) {
    let Some(context) = context else {
        eprintln!(
            "SKIP-TEST-CLUSTER: concurrent_first_contributions_all_reach_the_snapshot skipped"
        );
        return;
    };
    context.runtime.block_on(async {
        let seeded = seed_active_group(&context.pool, 3).await;
        let group_id = seeded.group.id;

        let writes = seeded.members.iter().map(|member| {
            let repository = DieselRoundLedgerRepository::new(context.pool.clone());
            let row = contribution(group_id, *member, 1);
            async move { repository.record_contribution(&row, money("100")).await }
        });
        for result in join_all(writes).await {
            result.expect("contribution recorded");
        }

        let status = DieselRoundLedgerRepository::new(context.pool.clone())
            .round_status(group_id, 1)
            .await
            .expect("status query")
            .expect("snapshot stored");
        assert_eq!(status.contributors_count, 3);
        assert_eq!(status.total_received, money("300"));
        assert_eq!(status.status, RoundPhase::ReadyForPayout);
    });
}

#[rstest]
fn authorisation_survives_a_rebuild(context: Option<PgContext>) {
    let Some(context) = context else {
        eprintln!("SKIP-TEST-CLUSTER: authorisation_survives_a_rebuild skipped");
        return;
    };
    context.runtime.block_on(async {
        let seeded = seed_active_group(&context.pool, 3).await;
        let group_id = seeded.group.id;
        let repository = DieselRoundLedgerRepository::new(context.pool.clone());

        let missing = repository
            .authorize_payout(group_id, 1, fixture_timestamp())
            .await
            .expect("authorise query");
        assert!(missing.is_none());

        for member in &seeded.members {
            repository
                .record_contribution(&contribution(group_id, *member, 1), money("100"))
                .await
                .expect("contribution recorded");
        }
        let authorised = repository
            .authorize_payout(group_id, 1, fixture_timestamp())
            .await
            .expect("authorise query")
            .expect("snapshot exists");
        assert!(authorised.payout_authorized);

        let rebuilt = repository
            .rebuild_status(group_id, 1, money("100"), fixture_timestamp())
            .await
            .expect("rebuild");
        assert!(rebuilt.payout_authorized);
        assert_eq!(rebuilt.contributors_count, 3);
    });
}
