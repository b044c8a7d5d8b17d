//! Embedded PostgreSQL fixtures for the Diesel adapter suites.
//!
//! Every test gets a fresh database cloned from a template that already has
//! the migrations applied. The template name carries a hash of the
//! migrations directory so schema changes provision a new one.
//!
//! Set `SKIP_TEST_CLUSTER=1` to skip these suites where PostgreSQL cannot
//! be started.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use chama_backend::domain::ports::{
    GroupActivation, GroupRepository, MemberRepository, UserDirectory,
};
use chama_backend::domain::{
    ContributionTerms, DisplayName, EmailAddress, Group, GroupDraft, GroupId, Member, MemberRole,
    MemberStatus, Money, UserId, UserIdentity, WalletAddress,
};
use chama_backend::outbound::persistence::{
    DbPool, DieselGroupRepository, DieselMemberRepository, DieselUserDirectory, PoolConfig,
    run_migrations,
};
use chrono::{DateTime, TimeZone, Utc};
use pg_embedded_setup_unpriv::test_support::hash_directory;
use pg_embedded_setup_unpriv::{BootstrapResult, ClusterHandle, TemporaryDatabase};
use tokio::runtime::Runtime;
use uuid::Uuid;

const SHARED_CLUSTER_RETRIES: usize = 5;
const RETRY_DELAY: Duration = Duration::from_millis(500);
const TEMPLATE_NAME_PREFIX: &str = "chama_template";

static TEMPLATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Pool over a throwaway database plus the runtime that drives it.
pub struct PgContext {
    pub runtime: Runtime,
    pub pool: DbPool,
    _database: TemporaryDatabase,
}

/// An active group with approved members, created through the adapters.
pub struct SeededGroup {
    pub group: Group,
    /// Creator first, then the other members in payout order.
    pub members: Vec<UserId>,
}

pub fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

pub fn money(text: &str) -> Money {
    text.parse().expect("valid amount")
}

fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip with a marker when `SKIP_TEST_CLUSTER` is truthy, fail otherwise.
fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}

/// Keeps the cluster password stable across test binaries sharing a data
/// directory.
fn ensure_stable_password() {
    if std::env::var_os("PG_PASSWORD").is_none() {
        // SAFETY: runs before the cluster bootstrap spawns any threads.
        unsafe {
            std::env::set_var("PG_PASSWORD", "chama_embedded_test");
        }
    }
}

fn shared_cluster_handle() -> BootstrapResult<&'static ClusterHandle> {
    ensure_stable_password();
    let mut attempt = 1;
    loop {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => return Ok(handle),
            Err(error) if attempt >= SHARED_CLUSTER_RETRIES => return Err(error),
            Err(_) => {
                std::thread::sleep(RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}

fn template_database_name() -> Result<String, String> {
    let migrations = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations");
    let hash = hash_directory(migrations).map_err(|err| format!("hash migrations: {err}"))?;
    let short_hash = hash.get(..8).unwrap_or(&hash);
    Ok(format!("{TEMPLATE_NAME_PREFIX}_{short_hash}"))
}

/// Create the migrated template once per migrations hash.
fn ensure_template_database(cluster: &ClusterHandle, runtime: &Runtime) -> Result<String, String> {
    let template_name = template_database_name()?;
    let _lock = TEMPLATE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());

    let exists = cluster
        .database_exists(template_name.as_str())
        .map_err(|err| format!("template check: {err:?}"))?;
    if !exists {
        cluster
            .create_database(template_name.as_str())
            .map_err(|err| format!("create template: {err:?}"))?;
        let url = cluster.connection().database_url(&template_name);
        runtime
            .block_on(run_migrations(&url))
            .map_err(|err| format!("migrate template: {err}"))?;
    }
    Ok(template_name)
}

fn setup() -> Result<PgContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = shared_cluster_handle().map_err(|err| format!("{err:?}"))?;
    let template = ensure_template_database(cluster, &runtime)?;
    let db_name = format!("test_{}", Uuid::new_v4().simple());
    let database = cluster
        .temporary_database_from_template(db_name.as_str(), template.as_str())
        .map_err(|err| format!("create database from template: {err:?}"))?;

    let config = PoolConfig::new(database.url())
        .with_max_size(4)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(DbPool::new(config))
        .map_err(|err| err.to_string())?;
    Ok(PgContext {
        runtime,
        pool,
        _database: database,
    })
}

/// Fresh migrated database, or `None` when the cluster is skipped.
pub fn pg_context() -> Option<PgContext> {
    match setup() {
        Ok(context) => Some(context),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn wallet(seed: usize) -> WalletAddress {
    let letter = char::from(b'A' + u8::try_from(seed % 26).expect("letter index"));
    WalletAddress::new(format!("G{}", letter.to_string().repeat(55))).expect("valid wallet")
}

/// Register a user whose wallet is derived from `seed`.
pub async fn register(pool: &DbPool, seed: usize) -> UserIdentity {
    let id = UserId::random();
    let identity = UserIdentity {
        id,
        display_name: DisplayName::new(format!("Member {seed}")).expect("valid name"),
        email: EmailAddress::new(format!("{}@example.test", id.as_uuid().simple()))
            .expect("valid email"),
        wallet: wallet(seed),
    };
    DieselUserDirectory::new(pool.clone())
        .register(&identity)
        .await
        .expect("register user");
    identity
}

/// Register `size` users, form an approved group with them and activate it
/// at `100` per round in registration order.
pub async fn seed_active_group(pool: &DbPool, size: usize) -> SeededGroup {
    let mut identities = Vec::with_capacity(size);
    for seed in 0..size {
        identities.push(register(pool, seed).await);
    }
    let creator = &identities[0];
    let now = fixture_timestamp();
    let count = u32::try_from(size).expect("group size");
    let group = Group::create(
        GroupId::random(),
        creator.id,
        GroupDraft {
            name: "Harambee".to_owned(),
            description: "Weekly savings".to_owned(),
            wallet: wallet(25),
            min_members: count,
            max_members: count,
        },
        now,
    );
    let membership = |identity: &UserIdentity, role| Member {
        group_id: group.id,
        user_id: identity.id,
        wallet: identity.wallet.clone(),
        role,
        status: MemberStatus::Approved,
        joined_at: now,
    };

    let groups = DieselGroupRepository::new(pool.clone());
    let members = DieselMemberRepository::new(pool.clone());
    groups
        .create(&group, &membership(creator, MemberRole::Creator))
        .await
        .expect("create group");
    for identity in &identities[1..] {
        members
            .add(&membership(identity, MemberRole::Member))
            .await
            .expect("add member");
    }
    groups.mark_approved(group.id).await.expect("approve group");

    let terms = ContributionTerms {
        contribution_amount: money("100"),
        period_days: 7,
        payout_order: identities.iter().map(|identity| identity.id).collect(),
    };
    let schedule = terms.schedule(group.id, now, count).expect("schedule");
    groups
        .activate(&GroupActivation {
            group_id: group.id,
            terms,
            next_contribution_date: now + chrono::Duration::days(7),
            schedule,
        })
        .await
        .expect("activate group");

    let group = groups
        .find_by_id(group.id)
        .await
        .expect("load group")
        .expect("group stored");
    SeededGroup {
        group,
        members: identities.into_iter().map(|identity| identity.id).collect(),
    }
}
