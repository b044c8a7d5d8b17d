//! Domain model and services for rotating savings groups.
//!
//! The domain is transport and storage agnostic: services depend only on the
//! port traits in [`ports`], and adapters live under `inbound` and
//! `outbound`.

mod access;
mod error;
mod group;
mod group_service;
mod identity;
mod ids;
mod invitation;
mod ledger;
mod member_service;
mod membership;
pub mod money;
mod notification;
mod notification_service;
mod notifier;
mod payout;
mod payout_service;
pub mod ports;
mod port_errors;
mod reminder_service;
mod round;
mod round_ledger_service;
#[cfg(test)]
pub(crate) mod service_fixtures;
pub(crate) mod text_enum;
mod trace_id;
mod user_service;

pub use error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use group::{
    ContributionTerms, DEFAULT_MAX_MEMBERS, DEFAULT_MIN_MEMBERS, Group, GroupDraft, GroupStatus,
    RoundAdvance,
};
pub use group_service::{ActivateGroupRequest, CreateGroupRequest, GroupLifecycleService};
pub use identity::{
    DISPLAY_NAME_MAX, DISPLAY_NAME_MIN, DisplayName, EmailAddress, IdentityValidationError,
    UserIdentity, WalletAddress,
};
pub use ids::{ContributionId, GroupId, InvalidIdError, InvitationId, PayoutRequestId, UserId};
pub use invitation::{INVITATION_TTL_DAYS, Invitation, InvitationStatus};
pub use ledger::{EmptyTxHashError, SigningRef, TransferRequest, TransferSource, TxHash};
pub use member_service::{
    ADMIN_PROMOTION_NOMINATIONS, MemberReview, MembershipService, NominationOutcome,
};
pub use membership::{AdminNomination, Member, MemberRole, MemberStatus, NominationStatus};
pub use money::{Money, MoneyError};
pub use notification::{InboxEntry, Notification, NotificationKind};
pub use notification_service::NotificationService;
pub use payout::{
    ApprovalPolicy, DEFAULT_APPROVAL_THRESHOLD, PayoutApproval, PayoutRequest,
    PayoutScheduleEntry, PayoutStatus, ScheduleStatus, VoteOutcome, VoteTally,
};
pub use payout_service::{CreatePayoutRequest, PayoutEngine, VoteReceipt};
pub use reminder_service::{
    ContributionReminderService, DEFAULT_REMINDER_WINDOW_DAYS, ReminderSummary,
};
pub use round::{
    ContributionStatus, MemberPaymentStatus, PayoutFlags, RoundContribution, RoundPhase,
    RoundReport, RoundStatus, RoundStatusInput,
};
pub use round_ledger_service::{
    ContributionReceipt, RecordContributionRequest, RoundAuthorization, RoundLedgerService,
    contribution_token,
};
pub use text_enum::UnknownVariantError;
pub use trace_id::TraceId;
pub use user_service::{RegisterUserRequest, UserService};
