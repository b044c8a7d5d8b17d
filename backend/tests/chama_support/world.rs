//! Scenario world backed by the in-memory store and a scripted ledger.
//!
//! Steps are synchronous, so every service call runs on a current-thread
//! runtime owned by the world.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chama_backend::domain::{
    ActivateGroupRequest, ApprovalPolicy, CreateGroupRequest, CreatePayoutRequest, DisplayName,
    EmailAddress, Error, ErrorCode, Group, GroupId, GroupLifecycleService, MemberReview,
    MembershipService, Money, PayoutEngine, PayoutRequestId, RecordContributionRequest,
    RegisterUserRequest, RoundLedgerService, SigningRef, UserId, UserService, VoteReceipt,
    WalletAddress,
};
use chama_backend::outbound::memory::{MemoryNotificationSink, MemoryStore, ScriptedLedger};
use mockable::DefaultClock;
use tokio::runtime::Runtime;

/// Wallet for the `index`th registered person; one letter repeated.
pub fn wallet(index: usize) -> WalletAddress {
    let letter = char::from(b'A' + u8::try_from(index % 26).expect("index fits"));
    WalletAddress::new(format!("G{}", letter.to_string().repeat(55))).expect("valid wallet")
}

/// Wallet every scenario group collects into.
pub fn group_wallet() -> WalletAddress {
    WalletAddress::new(format!("G{}", "7".repeat(55))).expect("valid wallet")
}

pub fn money(value: &str) -> Money {
    value.parse().expect("valid amount")
}

pub struct ChamaWorld {
    runtime: Runtime,
    pub ledger: ScriptedLedger,
    pub inbox: MemoryNotificationSink,
    pub users: UserService,
    pub groups: GroupLifecycleService,
    pub members: MembershipService,
    pub rounds: RoundLedgerService,
    pub payouts: PayoutEngine,
    people: RefCell<HashMap<String, UserId>>,
    group: RefCell<Option<GroupId>>,
    request: RefCell<Option<PayoutRequestId>>,
    pub last_error: RefCell<Option<Error>>,
    pub last_vote: RefCell<Option<VoteReceipt>>,
}

impl ChamaWorld {
    pub fn new() -> Self {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("tokio runtime");
        let ledger = ScriptedLedger::new();
        let inbox = MemoryNotificationSink::new();
        let ports = MemoryStore::new().service_ports(
            Arc::new(ledger.clone()),
            Arc::new(inbox.clone()),
            Arc::new(DefaultClock),
        );
        Self {
            runtime,
            ledger,
            inbox,
            users: UserService::new(&ports),
            groups: GroupLifecycleService::new(&ports),
            members: MembershipService::new(&ports),
            rounds: RoundLedgerService::new(&ports),
            payouts: PayoutEngine::new(&ports, ApprovalPolicy::default()),
            people: RefCell::new(HashMap::new()),
            group: RefCell::new(None),
            request: RefCell::new(None),
            last_error: RefCell::new(None),
            last_vote: RefCell::new(None),
        }
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Register `name` and remember their id.
    pub fn register(&self, name: &str) -> UserId {
        let index = self.people.borrow().len();
        let identity = self
            .block_on(self.users.register(RegisterUserRequest {
                display_name: DisplayName::new(name).expect("display name"),
                email: EmailAddress::new(format!("{}@example.test", name.to_lowercase()))
                    .expect("email"),
                wallet: wallet(index),
            }))
            .expect("registration succeeds");
        self.people.borrow_mut().insert(name.to_owned(), identity.id);
        identity.id
    }

    pub fn user(&self, name: &str) -> UserId {
        *self
            .people
            .borrow()
            .get(name)
            .unwrap_or_else(|| panic!("{name} is not registered"))
    }

    pub fn wallet_of(&self, name: &str) -> WalletAddress {
        let id = self.user(name);
        self.block_on(self.users.current(id))
            .expect("identity exists")
            .wallet
    }

    pub fn group_id(&self) -> GroupId {
        self.group.borrow().expect("group formed")
    }

    pub fn group(&self) -> Group {
        self.block_on(self.groups.get_group(self.group_id()))
            .expect("group loads")
    }

    pub fn request_id(&self) -> PayoutRequestId {
        self.request.borrow().expect("payout request created")
    }

    /// Active group created by the first name, everyone approved, paying
    /// out in the listed order.
    pub fn form_active_group(&self, names: &[&str], amount: &str) {
        let ids: Vec<UserId> = names.iter().map(|name| self.register(name)).collect();
        let (creator, joiners) = ids.split_first().expect("at least one member");
        let count = u32::try_from(ids.len()).expect("member count fits");
        let group = self
            .block_on(self.groups.create_group(CreateGroupRequest {
                actor: *creator,
                name: "Harambee Circle".to_owned(),
                description: "Monthly savings".to_owned(),
                wallet: group_wallet(),
                min_members: Some(count),
                max_members: Some(count),
            }))
            .expect("group created");
        for joiner in joiners {
            self.block_on(self.members.join_group(group.id, *joiner))
                .expect("join succeeds");
            self.block_on(self.members.review_member(MemberReview {
                group_id: group.id,
                actor: *creator,
                user_id: *joiner,
                approve: true,
            }))
            .expect("review succeeds");
        }
        self.block_on(self.groups.approve_group(group.id, *creator))
            .expect("approval succeeds");
        self.block_on(self.groups.activate_group(ActivateGroupRequest {
            group_id: group.id,
            actor: *creator,
            contribution_amount: money(amount),
            period_days: 30,
            payout_order: ids.clone(),
        }))
        .expect("activation succeeds");
        *self.group.borrow_mut() = Some(group.id);
    }

    /// Promote `nominee` with nominations from two other members.
    pub fn promote(&self, nominee: &str, nominators: [&str; 2]) {
        let nominee = self.user(nominee);
        for nominator in nominators {
            self.block_on(
                self.members
                    .nominate_admin(self.group_id(), self.user(nominator), nominee),
            )
            .expect("nomination succeeds");
        }
    }

    pub fn contribute(&self, name: &str, round: u32, amount: &str) -> Result<(), Error> {
        let outcome = self.block_on(self.rounds.record_contribution(RecordContributionRequest {
            group_id: self.group_id(),
            actor: self.user(name),
            round,
            amount: money(amount),
            signing: SigningRef::new(format!("vault://{name}")),
        }));
        self.remember(outcome.map(drop))
    }

    pub fn authorize(&self, admin: &str, round: u32) -> Result<(), Error> {
        let outcome = self.block_on(self.rounds.authorize_round_payout(
            self.group_id(),
            self.user(admin),
            round,
        ));
        self.remember(outcome.map(drop))
    }

    pub fn request_payout(&self, admin: &str, recipient: &str, amount: &str) -> Result<(), Error> {
        let round = self.group().current_round;
        let outcome = self.block_on(self.payouts.create_payout_request(CreatePayoutRequest {
            group_id: self.group_id(),
            actor: self.user(admin),
            recipient_id: self.user(recipient),
            amount: money(amount),
            round,
        }));
        let outcome = outcome.map(|request| {
            *self.request.borrow_mut() = Some(request.id);
        });
        self.remember(outcome)
    }

    pub fn vote(&self, admin: &str, approve: bool) -> Result<(), Error> {
        let outcome = self.block_on(
            self.payouts
                .record_vote(self.request_id(), self.user(admin), approve),
        );
        let outcome = outcome.map(|receipt| {
            *self.last_vote.borrow_mut() = Some(receipt);
        });
        self.remember(outcome)
    }

    fn remember(&self, outcome: Result<(), Error>) -> Result<(), Error> {
        if let Err(err) = &outcome {
            *self.last_error.borrow_mut() = Some(err.clone());
        }
        outcome
    }

    pub fn assert_last_error(&self, code: ErrorCode) {
        let error = self.last_error.borrow();
        let error = error.as_ref().expect("an operation failed");
        assert_eq!(error.code(), code, "unexpected error: {error}");
    }
}
