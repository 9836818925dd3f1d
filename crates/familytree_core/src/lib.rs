//! Core domain logic for family trees.
//! This crate is the single source of truth for family structure invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod tree;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::family::{Family, FamilyId, FamilyLink, FamilyStatistics};
pub use model::member::{
    mask_id_number, member_display_name, spouse_label, Member, MemberId, ParentType,
};
pub use repo::family_repo::{
    FamilyRepoError, FamilyRepoResult, FamilyRepository, JoinIdOwner, SqliteFamilyRepository,
};
pub use service::family_service::{
    generate_join_id, FamilyService, FamilyServiceError, FamilyView,
};
pub use service::link_flow::{LinkFlow, ValidationTicket};
pub use service::link_service::{
    ActingContext, JoinIdValidation, LinkFailure, LinkResult, LinkService, LinkedFamilySummary,
};
pub use tree::builder::{build_tree, TreeNode, EMPTY_ROOT_ID, EMPTY_ROOT_NAME};
pub use tree::classify::{classify_gender, classify_label, classify_role, Gender, Role};
pub use tree::infer::{infer_structure, FamilyStructure};
pub use tree::layout::{
    layout, layout_with, tree_bounds, LayoutBounds, LayoutConfig, LayoutConfigError,
};
pub use tree::build_layout;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
