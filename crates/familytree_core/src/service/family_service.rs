//! Family use-case service.
//!
//! # Responsibility
//! - Create families and members with stable ids and join tokens.
//! - Assemble the render view: combined members, laid-out tree, statistics.
//!
//! # Invariants
//! - The view is rebuilt from repository state on every call.
//! - Generated join ids are uppercase alphanumeric with a 3-digit ordinal.
//! - A generated join id is never one already held by a stored member.

use crate::model::family::{Family, FamilyStatistics};
use crate::model::member::Member;
use crate::repo::family_repo::{FamilyRepoError, FamilyRepository};
use crate::service::link_service::combine_members;
use crate::tree::builder::TreeNode;
use crate::tree::build_layout;
use crate::tree::layout::LayoutConfig;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const JOIN_ID_PREFIX_MAX_CHARS: usize = 8;
const JOIN_ID_FALLBACK_PREFIX: &str = "MEMBER";

static NON_ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("valid join id regex"));

/// Errors from family service operations.
#[derive(Debug)]
pub enum FamilyServiceError {
    /// Family name is blank after trim.
    InvalidFamilyName,
    /// Target family does not exist.
    FamilyNotFound(String),
    /// Repository-level failure.
    Repo(FamilyRepoError),
}

impl Display for FamilyServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFamilyName => write!(f, "family name must not be blank"),
            Self::FamilyNotFound(id) => write!(f, "family not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FamilyServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FamilyRepoError> for FamilyServiceError {
    fn from(value: FamilyRepoError) -> Self {
        match value {
            FamilyRepoError::FamilyNotFound(id) => Self::FamilyNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Everything the rendering collaborator needs for one family.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyView {
    /// Family header with its own members and links.
    pub family: Family,
    /// Own members followed by decorated linked members.
    pub members: Vec<Member>,
    /// Built and laid-out tree over `members`.
    pub tree: TreeNode,
    /// Counts over `members`.
    pub statistics: FamilyStatistics,
}

/// Family service facade over a repository implementation.
pub struct FamilyService<R: FamilyRepository> {
    repo: R,
    layout: LayoutConfig,
}

impl<R: FamilyRepository> FamilyService<R> {
    /// Creates service with the default layout configuration.
    pub fn new(repo: R) -> Self {
        Self::with_layout(repo, LayoutConfig::default())
    }

    /// Creates service with an explicit layout configuration.
    pub fn with_layout(repo: R, layout: LayoutConfig) -> Self {
        Self { repo, layout }
    }

    /// Creates a family around its creator.
    ///
    /// Missing creator id and join id are generated.
    pub fn create_family(
        &self,
        name: impl Into<String>,
        mut creator: Member,
    ) -> Result<Family, FamilyServiceError> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(FamilyServiceError::InvalidFamilyName);
        }

        self.assign_identity(&mut creator)?;
        let mut family = Family::new(name, creator);
        self.repo.create_family(&family)?;
        family.refresh_statistics();

        info!(
            "event=create_family module=service status=ok family_id={}",
            family.id
        );
        Ok(family)
    }

    /// Appends a member to a family. Missing id and join id are generated.
    pub fn add_member(
        &self,
        family_id: &str,
        mut member: Member,
    ) -> Result<Member, FamilyServiceError> {
        self.assign_identity(&mut member)?;
        member.is_family_creator = false;
        self.repo.add_member(family_id, &member)?;
        info!("event=add_member module=service status=ok family_id={family_id}");
        Ok(member)
    }

    /// Loads the combined member view and builds the positioned tree.
    pub fn family_view(
        &self,
        family_id: &str,
        viewport_width: f64,
        viewport_height: f64,
    ) -> Result<FamilyView, FamilyServiceError> {
        let mut family = self
            .repo
            .get_family(family_id)?
            .ok_or_else(|| FamilyServiceError::FamilyNotFound(family_id.to_string()))?;
        family.refresh_statistics();

        let members = combine_members(&self.repo, family_id)?;
        let tree = build_layout(&members, viewport_width, viewport_height, &self.layout);
        let statistics = FamilyStatistics::from_members(&members);

        info!(
            "event=family_view module=service status=ok members={} nodes={}",
            members.len(),
            tree.node_count()
        );
        Ok(FamilyView {
            family,
            members,
            tree,
            statistics,
        })
    }

    fn assign_identity(&self, member: &mut Member) -> Result<(), FamilyServiceError> {
        if member.id.trim().is_empty() {
            member.id = Uuid::new_v4().to_string();
        }
        if member.join_id.trim().is_empty() {
            member.join_id = self.next_free_join_id(member.first_name.as_str())?;
        } else {
            member.join_id = member.join_id.trim().to_string();
        }
        Ok(())
    }

    /// Generates a join id not held by any stored member, starting at the
    /// ordinal after the current member count.
    fn next_free_join_id(&self, first_name: &str) -> Result<String, FamilyServiceError> {
        let mut ordinal = self.repo.count_members()? + 1;
        loop {
            let candidate = generate_join_id(first_name, ordinal);
            if !self.repo.join_id_exists(candidate.as_str())? {
                return Ok(candidate);
            }
            ordinal += 1;
        }
    }
}

/// Generates a join token such as `MARY002` from a first name and ordinal.
pub fn generate_join_id(first_name: &str, ordinal: usize) -> String {
    let cleaned = NON_ALNUM_RE.replace_all(first_name, "").to_ascii_uppercase();
    let prefix = if cleaned.is_empty() {
        JOIN_ID_FALLBACK_PREFIX.to_string()
    } else {
        cleaned.chars().take(JOIN_ID_PREFIX_MAX_CHARS).collect()
    };
    format!("{prefix}{ordinal:03}")
}
