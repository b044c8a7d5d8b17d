//! Authorization gates shared by privileged operations.

use super::ports::{GroupRepository, MemberRepository};
use super::{Error, Group, GroupId, Member, MemberStatus, UserId};

pub(crate) async fn load_group(groups: &dyn GroupRepository, id: GroupId) -> Result<Group, Error> {
    groups
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("group {id} not found")))
}

/// Approved membership of `user_id`, or `Forbidden`.
pub(crate) async fn require_approved_member(
    members: &dyn MemberRepository,
    group_id: GroupId,
    user_id: UserId,
) -> Result<Member, Error> {
    match members.find(group_id, user_id).await? {
        Some(member) if member.is_approved() => Ok(member),
        _ => Err(Error::forbidden("not an approved member of this group")),
    }
}

/// Membership of an admin or the creator, or `Forbidden`.
pub(crate) async fn require_admin_or_creator(
    members: &dyn MemberRepository,
    group_id: GroupId,
    user_id: UserId,
) -> Result<Member, Error> {
    match members.find(group_id, user_id).await? {
        Some(member) if member.is_admin_or_creator() => Ok(member),
        _ => Err(Error::forbidden("only group admins can perform this action")),
    }
}

pub(crate) async fn approved_members(
    members: &dyn MemberRepository,
    group_id: GroupId,
) -> Result<Vec<Member>, Error> {
    Ok(members.list(group_id, Some(MemberStatus::Approved)).await?)
}
