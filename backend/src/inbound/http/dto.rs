//! Response payloads shared by the HTTP handlers.
//!
//! Domain types stay free of OpenAPI derives; these mirrors render ids and
//! amounts as strings and timestamps as RFC 3339.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    ContributionTerms, Group, InboxEntry, Invitation, Member, MemberPaymentStatus, PayoutApproval,
    PayoutRequest, PayoutScheduleEntry, RoundContribution, RoundReport, RoundStatus, UserIdentity,
    VoteTally,
};

/// Registered identity.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub id: String,
    #[schema(example = "Wanjiru")]
    pub display_name: String,
    pub email: String,
    pub wallet: String,
}

impl From<UserIdentity> for UserResponse {
    fn from(identity: UserIdentity) -> Self {
        Self {
            id: identity.id.to_string(),
            display_name: identity.display_name.as_ref().to_owned(),
            email: identity.email.as_ref().to_owned(),
            wallet: identity.wallet.as_ref().to_owned(),
        }
    }
}

/// Contribution terms fixed at activation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TermsResponse {
    #[schema(example = "100.0")]
    pub contribution_amount: String,
    pub period_days: u32,
    pub payout_order: Vec<String>,
}

impl From<ContributionTerms> for TermsResponse {
    fn from(terms: ContributionTerms) -> Self {
        Self {
            contribution_amount: terms.contribution_amount.to_string(),
            period_days: terms.period_days,
            payout_order: terms.payout_order.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Group detail.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub creator_id: String,
    pub wallet: String,
    pub min_members: u32,
    pub max_members: u32,
    pub is_approved: bool,
    #[schema(example = "active")]
    pub status: String,
    pub terms: Option<TermsResponse>,
    pub current_round: u32,
    pub next_contribution_date: Option<String>,
    pub created_at: String,
}

impl From<Group> for GroupResponse {
    fn from(group: Group) -> Self {
        Self {
            id: group.id.to_string(),
            name: group.name,
            description: group.description,
            creator_id: group.creator_id.to_string(),
            wallet: group.wallet.as_ref().to_owned(),
            min_members: group.min_members,
            max_members: group.max_members,
            is_approved: group.is_approved,
            status: group.status.as_str().to_owned(),
            terms: group.terms.map(TermsResponse::from),
            current_round: group.current_round,
            next_contribution_date: group.next_contribution_date.map(|at| at.to_rfc3339()),
            created_at: group.created_at.to_rfc3339(),
        }
    }
}

/// Membership record.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub group_id: String,
    pub user_id: String,
    pub wallet: String,
    #[schema(example = "member")]
    pub role: String,
    #[schema(example = "approved")]
    pub status: String,
    pub joined_at: String,
}

impl From<Member> for MemberResponse {
    fn from(member: Member) -> Self {
        Self {
            group_id: member.group_id.to_string(),
            user_id: member.user_id.to_string(),
            wallet: member.wallet.as_ref().to_owned(),
            role: member.role.as_str().to_owned(),
            status: member.status.as_str().to_owned(),
            joined_at: member.joined_at.to_rfc3339(),
        }
    }
}

/// One slot of the rotation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntryResponse {
    pub round: u32,
    pub recipient_id: String,
    pub amount: String,
    pub due_date: String,
    #[schema(example = "scheduled")]
    pub status: String,
    pub paid_at: Option<String>,
    pub tx_hash: Option<String>,
}

impl From<PayoutScheduleEntry> for ScheduleEntryResponse {
    fn from(entry: PayoutScheduleEntry) -> Self {
        Self {
            round: entry.round,
            recipient_id: entry.recipient_id.to_string(),
            amount: entry.amount.to_string(),
            due_date: entry.due_date.to_rfc3339(),
            status: entry.status.as_str().to_owned(),
            paid_at: entry.paid_at.map(|at| at.to_rfc3339()),
            tx_hash: entry.tx_hash.map(String::from),
        }
    }
}

/// A recorded contribution.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContributionResponse {
    pub id: String,
    pub user_id: String,
    pub round: u32,
    pub amount: String,
    #[schema(example = "confirmed")]
    pub status: String,
    pub tx_hash: Option<String>,
    pub created_at: String,
}

impl From<RoundContribution> for ContributionResponse {
    fn from(contribution: RoundContribution) -> Self {
        Self {
            id: contribution.id.to_string(),
            user_id: contribution.user_id.to_string(),
            round: contribution.round,
            amount: contribution.amount.to_string(),
            status: contribution.status.as_str().to_owned(),
            tx_hash: contribution.tx_hash.map(String::from),
            created_at: contribution.created_at.to_rfc3339(),
        }
    }
}

/// Aggregate state of a round.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundStatusResponse {
    pub group_id: String,
    pub round: u32,
    pub total_required: String,
    pub total_received: String,
    pub contributors_count: u32,
    pub required_count: u32,
    #[schema(example = "collecting")]
    pub status: String,
    pub payout_authorized: bool,
}

impl From<RoundStatus> for RoundStatusResponse {
    fn from(status: RoundStatus) -> Self {
        Self {
            group_id: status.group_id.to_string(),
            round: status.round,
            total_required: status.total_required.to_string(),
            total_received: status.total_received.to_string(),
            contributors_count: status.contributors_count,
            required_count: status.required_count,
            status: status.status.as_str().to_owned(),
            payout_authorized: status.payout_authorized,
        }
    }
}

/// Paid/unpaid line for one approved member.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberPaymentResponse {
    pub user_id: String,
    pub has_paid: bool,
    pub contribution: Option<ContributionResponse>,
}

impl From<MemberPaymentStatus> for MemberPaymentResponse {
    fn from(line: MemberPaymentStatus) -> Self {
        Self {
            user_id: line.member.user_id.to_string(),
            has_paid: line.has_paid,
            contribution: line.contribution.map(ContributionResponse::from),
        }
    }
}

/// Round status with the member breakdown.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundReportResponse {
    pub status: RoundStatusResponse,
    pub members: Vec<MemberPaymentResponse>,
    pub total_members: u32,
    pub paid_members: u32,
}

impl From<RoundReport> for RoundReportResponse {
    fn from(report: RoundReport) -> Self {
        Self {
            status: report.status.into(),
            members: report.members.into_iter().map(Into::into).collect(),
            total_members: report.total_members,
            paid_members: report.paid_members,
        }
    }
}

/// Vote cast on a payout request.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    pub admin_id: String,
    pub approved: bool,
    pub voted_at: String,
}

impl From<PayoutApproval> for ApprovalResponse {
    fn from(approval: PayoutApproval) -> Self {
        Self {
            admin_id: approval.admin_id.to_string(),
            approved: approval.approved,
            voted_at: approval.voted_at.to_rfc3339(),
        }
    }
}

/// Payout request with its votes.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequestResponse {
    pub id: String,
    pub group_id: String,
    pub recipient_id: String,
    pub amount: String,
    pub round: u32,
    #[schema(example = "pending")]
    pub status: String,
    pub tx_hash: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub approvals: Vec<ApprovalResponse>,
}

impl From<PayoutRequest> for PayoutRequestResponse {
    fn from(request: PayoutRequest) -> Self {
        Self {
            id: request.id.to_string(),
            group_id: request.group_id.to_string(),
            recipient_id: request.recipient_id.to_string(),
            amount: request.amount.to_string(),
            round: request.round,
            status: request.status.as_str().to_owned(),
            tx_hash: request.tx_hash.map(String::from),
            created_by: request.created_by.to_string(),
            created_at: request.created_at.to_rfc3339(),
            approvals: request.approvals.into_iter().map(Into::into).collect(),
        }
    }
}

/// Running vote counts.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TallyResponse {
    pub approvals: u32,
    pub rejections: u32,
}

impl From<VoteTally> for TallyResponse {
    fn from(tally: VoteTally) -> Self {
        Self {
            approvals: tally.approvals,
            rejections: tally.rejections,
        }
    }
}

/// Notification as shown in the user's inbox.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: i64,
    pub group_id: String,
    #[schema(example = "group_invitation")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

impl From<InboxEntry> for NotificationResponse {
    fn from(entry: InboxEntry) -> Self {
        Self {
            id: entry.id,
            group_id: entry.notification.group_id.to_string(),
            kind: entry.notification.kind.as_str().to_owned(),
            title: entry.notification.title,
            message: entry.notification.message,
            is_read: entry.is_read,
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Invitation to join a group.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvitationResponse {
    pub id: String,
    pub group_id: String,
    pub inviter_id: String,
    pub email: String,
    #[schema(example = "pending")]
    pub status: String,
    pub created_at: String,
    pub expires_at: String,
}

impl From<Invitation> for InvitationResponse {
    fn from(invitation: Invitation) -> Self {
        Self {
            id: invitation.id.to_string(),
            group_id: invitation.group_id.to_string(),
            inviter_id: invitation.inviter_id.to_string(),
            email: invitation.email.as_ref().to_owned(),
            status: invitation.status.as_str().to_owned(),
            created_at: invitation.created_at.to_rfc3339(),
            expires_at: invitation.expires_at.to_rfc3339(),
        }
    }
}
