//! Role and gender classification for member records.
//!
//! # Responsibility
//! - Map a free-text relationship label to a structural tree role.
//! - Resolve a display gender for tree nodes.
//!
//! # Invariants
//! - A recognized `parent_type` override always wins over the label.
//! - Label rules are evaluated in table order: father, mother, child.
//!   The first matching rule decides the role.

use crate::model::member::{Member, ParentType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Structural role of a member inside the family tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Father,
    Mother,
    Child,
    /// Retained in the flat member list, never placed in the tree.
    Other,
}

/// Resolved gender used by tree nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

struct RoleRule {
    pattern: Regex,
    role: Role,
}

fn rule(pattern: &str, role: Role) -> RoleRule {
    RoleRule {
        pattern: Regex::new(pattern).expect("valid role rule regex"),
        role,
    }
}

static ROLE_RULES: Lazy<Vec<RoleRule>> = Lazy::new(|| {
    vec![
        rule(r"(?i)father", Role::Father),
        rule(r"(?i)mother|wife", Role::Mother),
        rule(r"(?i)son|daughter|child|brother|sister", Role::Child),
    ]
});

static FEMALE_CHILD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)daughter|sister").expect("valid female child regex"));

/// Classifies a member into a structural role.
pub fn classify_role(member: &Member) -> Role {
    if let Some(parent_type) = member.parent_type() {
        return match parent_type {
            ParentType::Father => Role::Father,
            ParentType::Mother => Role::Mother,
            ParentType::Child => Role::Child,
        };
    }
    classify_label(member.relationship.as_str())
}

/// Classifies a raw relationship label using the ordered rule table.
pub fn classify_label(label: &str) -> Role {
    ROLE_RULES
        .iter()
        .find(|rule| rule.pattern.is_match(label))
        .map_or(Role::Other, |rule| rule.role)
}

/// Resolves gender from role. Children read it from the label.
pub fn classify_gender(member: &Member) -> Gender {
    let label = member.relationship.as_str();
    match classify_role(member) {
        Role::Father => Gender::Male,
        Role::Mother => Gender::Female,
        Role::Child if FEMALE_CHILD_RE.is_match(label) => Gender::Female,
        Role::Child => Gender::Male,
        Role::Other => Gender::Male,
    }
}
