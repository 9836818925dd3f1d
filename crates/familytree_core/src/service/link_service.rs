//! Family linking use-case service.
//!
//! # Responsibility
//! - Validate a join token against the acting family without side effects.
//! - Link two families through a join token and expose the combined view.
//!
//! # Invariants
//! - Only the acting family's creator may link.
//! - A family pair is linked at most once, in either direction.
//! - Precondition and transport failures are returned as values with a
//!   user-facing message; nothing here panics or propagates raw errors.
//! - `link_family` is the only mutating operation.

use crate::model::family::{FamilyId, FamilyLink};
use crate::model::member::{Member, MemberId};
use crate::repo::family_repo::{
    FamilyRepoError, FamilyRepoResult, FamilyRepository, JoinIdOwner,
};
use log::{error, info, warn};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Caller identity for link operations. Replaces any global "current family".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingContext {
    pub family_id: FamilyId,
    pub member_id: MemberId,
}

impl ActingContext {
    pub fn new(family_id: impl Into<String>, member_id: impl Into<String>) -> Self {
        Self {
            family_id: family_id.into(),
            member_id: member_id.into(),
        }
    }
}

/// Reasons a validation or link attempt is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkFailure {
    /// Token is blank after trim.
    EmptyToken,
    /// No member holds the token.
    TokenNotFound,
    /// Token belongs to a member of the acting family.
    OwnFamily,
    /// Acting family does not exist.
    ActingFamilyNotFound,
    /// Acting member is not part of the acting family.
    ActingMemberNotFound,
    /// Acting member is not the family creator.
    NotFamilyCreator,
    /// The two families are already linked.
    AlreadyLinked { family_name: String },
    /// Data-access collaborator failed.
    Unavailable,
}

impl LinkFailure {
    /// Stable machine-readable code for logs and FFI callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyToken => "empty_token",
            Self::TokenNotFound => "token_not_found",
            Self::OwnFamily => "own_family",
            Self::ActingFamilyNotFound => "acting_family_not_found",
            Self::ActingMemberNotFound => "acting_member_not_found",
            Self::NotFamilyCreator => "not_family_creator",
            Self::AlreadyLinked { .. } => "already_linked",
            Self::Unavailable => "unavailable",
        }
    }
}

impl Display for LinkFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyToken => write!(f, "Please enter a Join ID."),
            Self::TokenNotFound => write!(f, "No family member was found with this Join ID."),
            Self::OwnFamily => write!(f, "This Join ID belongs to your own family."),
            Self::ActingFamilyNotFound => write!(f, "Your family could not be found."),
            Self::ActingMemberNotFound => {
                write!(f, "Your member record could not be found in this family.")
            }
            Self::NotFamilyCreator => {
                write!(f, "Only the family creator is authorized to link families.")
            }
            Self::AlreadyLinked { family_name } => {
                write!(f, "Your family is already linked with the {family_name} family.")
            }
            Self::Unavailable => write!(
                f,
                "Unable to reach the family service. Please check your connection and try again."
            ),
        }
    }
}

/// Result of the side-effect-free validation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinIdValidation {
    pub is_valid: bool,
    /// Display name of the token holder, when resolved.
    pub member_name: Option<String>,
    /// Name of the token holder's family, when resolved.
    pub family_name: Option<String>,
    /// Whether the token holder created their family.
    pub is_family_creator: bool,
    /// User-facing message; shown verbatim.
    pub message: String,
    pub failure: Option<LinkFailure>,
}

impl JoinIdValidation {
    fn accepted(owner: &JoinIdOwner) -> Self {
        let member_name = owner.member.display_name();
        Self {
            is_valid: true,
            message: format!(
                "This Join ID belongs to {member_name} of the {} family.",
                owner.family_name
            ),
            member_name: Some(member_name),
            family_name: Some(owner.family_name.clone()),
            is_family_creator: owner.member.is_family_creator,
            failure: None,
        }
    }

    fn rejected(failure: LinkFailure, owner: Option<&JoinIdOwner>) -> Self {
        Self {
            is_valid: false,
            member_name: owner.map(|owner| owner.member.display_name()),
            family_name: owner.map(|owner| owner.family_name.clone()),
            is_family_creator: owner.is_some_and(|owner| owner.member.is_family_creator),
            message: failure.to_string(),
            failure: Some(failure),
        }
    }
}

/// Summary of the family on the other side of a new link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedFamilySummary {
    pub id: FamilyId,
    pub name: String,
    pub member_count: usize,
}

/// Result of the mutating link step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkResult {
    pub success: bool,
    /// User-facing message; shown verbatim.
    pub message: String,
    pub linked_family: Option<LinkedFamilySummary>,
    /// Members newly visible in the acting family's combined view.
    pub linked_members_count: usize,
    pub failure: Option<LinkFailure>,
}

impl LinkResult {
    fn failed(failure: LinkFailure) -> Self {
        Self {
            success: false,
            message: failure.to_string(),
            linked_family: None,
            linked_members_count: 0,
            failure: Some(failure),
        }
    }
}

/// Link service facade over a family repository.
pub struct LinkService<R: FamilyRepository> {
    repo: R,
}

impl<R: FamilyRepository> LinkService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validates a join token for the acting family. Repeatable, read-only.
    pub fn validate_join_id(&self, token: &str, acting: &ActingContext) -> JoinIdValidation {
        match self.check_preconditions(token, acting) {
            Ok(owner) => {
                info!(
                    "event=validate_join_id module=service status=ok target_family={}",
                    owner.family_id
                );
                JoinIdValidation::accepted(&owner)
            }
            Err((failure, owner)) => {
                warn!(
                    "event=validate_join_id module=service status=rejected code={}",
                    failure.code()
                );
                JoinIdValidation::rejected(failure, owner.as_ref())
            }
        }
    }

    /// Links the acting family to the family holding `token`.
    ///
    /// Re-checks every precondition; a prior validation is not trusted.
    /// On success the caller is expected to refetch the combined view.
    pub fn link_family(&self, token: &str, acting: &ActingContext) -> LinkResult {
        let owner = match self.check_preconditions(token, acting) {
            Ok(owner) => owner,
            Err((failure, _)) => {
                warn!(
                    "event=link_family module=service status=rejected code={}",
                    failure.code()
                );
                return LinkResult::failed(failure);
            }
        };

        let link = FamilyLink {
            family_id: acting.family_id.clone(),
            linked_family_id: owner.family_id.clone(),
            join_id: owner.member.join_id.clone(),
            linked_by: acting.member_id.clone(),
            linked_at: now_epoch_ms(),
        };

        match self.repo.record_link(&link) {
            Ok(()) => {}
            Err(FamilyRepoError::DuplicateLink { .. }) => {
                warn!("event=link_family module=service status=rejected code=already_linked");
                return LinkResult::failed(LinkFailure::AlreadyLinked {
                    family_name: owner.family_name,
                });
            }
            Err(err) => return LinkResult::failed(unavailable("link_family", &err)),
        }

        let member_count = match self.repo.list_members(owner.family_id.as_str()) {
            Ok(members) => members.len(),
            Err(err) => return LinkResult::failed(unavailable("link_family", &err)),
        };

        info!(
            "event=link_family module=service status=ok target_family={} linked_members={}",
            owner.family_id, member_count
        );
        LinkResult {
            success: true,
            message: format!("Successfully linked with the {} family.", owner.family_name),
            linked_family: Some(LinkedFamilySummary {
                id: owner.family_id,
                name: owner.family_name,
                member_count,
            }),
            linked_members_count: member_count,
            failure: None,
        }
    }

    /// Returns own members followed by members of every linked family.
    ///
    /// Linked members are decorated with `is_linked_member` and
    /// `source_family`. Members are deduplicated by id, first seen wins.
    pub fn combined_members(&self, family_id: &str) -> FamilyRepoResult<Vec<Member>> {
        combine_members(&self.repo, family_id)
    }

    fn check_preconditions(
        &self,
        token: &str,
        acting: &ActingContext,
    ) -> Result<JoinIdOwner, Rejection> {
        let token = token.trim();
        if token.is_empty() {
            return Err(reject(LinkFailure::EmptyToken));
        }

        let family = self
            .repo
            .get_family(acting.family_id.as_str())
            .map_err(|err| reject(unavailable("check_preconditions", &err)))?
            .ok_or_else(|| reject(LinkFailure::ActingFamilyNotFound))?;
        let acting_member = family
            .member(acting.member_id.as_str())
            .ok_or_else(|| reject(LinkFailure::ActingMemberNotFound))?;
        if !acting_member.is_family_creator {
            return Err(reject(LinkFailure::NotFamilyCreator));
        }

        let owner = self
            .repo
            .find_join_id_owner(token)
            .map_err(|err| reject(unavailable("check_preconditions", &err)))?
            .ok_or_else(|| reject(LinkFailure::TokenNotFound))?;
        if owner.family_id == family.id {
            return Err((LinkFailure::OwnFamily, Some(owner)));
        }

        let already_linked = family
            .linked_families
            .iter()
            .any(|link| link.other_side(family.id.as_str()) == Some(owner.family_id.as_str()));
        if already_linked {
            let failure = LinkFailure::AlreadyLinked {
                family_name: owner.family_name.clone(),
            };
            return Err((failure, Some(owner)));
        }

        Ok(owner)
    }
}

/// Failure plus the token holder, when it was already resolved.
type Rejection = (LinkFailure, Option<JoinIdOwner>);

fn reject(failure: LinkFailure) -> Rejection {
    (failure, None)
}

/// Builds the combined member view for one family.
pub(crate) fn combine_members<R: FamilyRepository>(
    repo: &R,
    family_id: &str,
) -> FamilyRepoResult<Vec<Member>> {
    let family = repo
        .get_family(family_id)?
        .ok_or_else(|| FamilyRepoError::FamilyNotFound(family_id.to_string()))?;

    let mut seen = HashSet::new();
    let mut combined = Vec::with_capacity(family.members.len());
    for mut member in family.members.iter().cloned() {
        if seen.insert(member.id.clone()) {
            member.is_linked_member = Some(false);
            combined.push(member);
        }
    }

    for linked_id in family.linked_family_ids() {
        let Some(linked) = repo.get_family(linked_id)? else {
            warn!("event=combine_members module=service status=missing_linked_family");
            continue;
        };
        for mut member in linked.members {
            if seen.insert(member.id.clone()) {
                member.is_linked_member = Some(true);
                member.source_family = Some(linked.name.clone());
                combined.push(member);
            }
        }
    }

    Ok(combined)
}

fn unavailable(operation: &str, err: &FamilyRepoError) -> LinkFailure {
    error!(
        "event={operation} module=service status=error error_code=repo_failed error={err}"
    );
    LinkFailure::Unavailable
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
