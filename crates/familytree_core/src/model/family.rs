//! Family aggregate model.
//!
//! # Responsibility
//! - Group members discovered for one family in insertion order.
//! - Carry link metadata for families merged through a Join ID.
//!
//! # Invariants
//! - `members` order is discovery order, not generation order.
//! - Exactly one member per originating family has `is_family_creator`.
//! - `statistics` is derived and never authoritative.

use crate::model::member::{Member, MemberId};
use crate::tree::classify::{classify_role, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for one family aggregate.
pub type FamilyId = String;

/// Link metadata recorded when one family joins another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyLink {
    /// Family that initiated the link.
    pub family_id: FamilyId,
    /// Family owning the consumed join token.
    pub linked_family_id: FamilyId,
    /// Join token used for this link.
    pub join_id: String,
    /// Creator member who performed the link.
    pub linked_by: MemberId,
    /// Unix epoch milliseconds.
    pub linked_at: i64,
}

impl FamilyLink {
    /// Returns the family on the other side of this link, seen from `family_id`.
    pub fn other_side(&self, family_id: &str) -> Option<&str> {
        if self.family_id == family_id {
            Some(self.linked_family_id.as_str())
        } else if self.linked_family_id == family_id {
            Some(self.family_id.as_str())
        } else {
            None
        }
    }
}

/// Family aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub id: FamilyId,
    pub name: String,
    pub creator_id: MemberId,
    pub creator_join_id: String,
    pub is_main_family: bool,
    pub members: Vec<Member>,
    pub linked_families: Vec<FamilyLink>,
    pub statistics: Option<FamilyStatistics>,
}

impl Family {
    /// Creates a family with a generated stable id around its creator.
    ///
    /// The creator is flagged `is_family_creator` and becomes the first member.
    pub fn new(name: impl Into<String>, creator: Member) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name, creator)
    }

    /// Creates a family with a caller-provided id.
    pub fn with_id(id: impl Into<String>, name: impl Into<String>, mut creator: Member) -> Self {
        creator.is_family_creator = true;
        Self {
            id: id.into(),
            name: name.into(),
            creator_id: creator.id.clone(),
            creator_join_id: creator.join_id.clone(),
            is_main_family: true,
            members: vec![creator],
            linked_families: Vec::new(),
            statistics: None,
        }
    }

    /// Finds one member by id.
    pub fn member(&self, member_id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.id == member_id)
    }

    /// Returns the creator record, if present in `members`.
    pub fn creator(&self) -> Option<&Member> {
        self.member(self.creator_id.as_str())
    }

    /// Returns ids of families linked in either direction.
    pub fn linked_family_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for link in &self.linked_families {
            if let Some(other) = link.other_side(self.id.as_str()) {
                if !ids.contains(&other) {
                    ids.push(other);
                }
            }
        }
        ids
    }

    /// Recomputes derived statistics from current members.
    pub fn refresh_statistics(&mut self) {
        self.statistics = Some(FamilyStatistics::from_members(&self.members));
    }
}

/// Derived member counts for one (possibly combined) member list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyStatistics {
    pub total_members: usize,
    pub living_members: usize,
    pub deceased_members: usize,
    pub verified_members: usize,
    pub fathers: usize,
    pub mothers: usize,
    pub children: usize,
    pub others: usize,
    pub linked_members: usize,
}

impl FamilyStatistics {
    /// Counts members by lifecycle, verification, role and link origin.
    pub fn from_members(members: &[Member]) -> Self {
        let mut stats = Self {
            total_members: members.len(),
            ..Self::default()
        };
        for member in members {
            if member.is_deceased {
                stats.deceased_members += 1;
            } else {
                stats.living_members += 1;
            }
            if member.is_verified {
                stats.verified_members += 1;
            }
            if member.is_linked() {
                stats.linked_members += 1;
            }
            match classify_role(member) {
                Role::Father => stats.fathers += 1,
                Role::Mother => stats.mothers += 1,
                Role::Child => stats.children += 1,
                Role::Other => stats.others += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::{Family, FamilyLink, FamilyStatistics};
    use crate::model::member::Member;

    #[test]
    fn new_family_flags_creator() {
        let mut creator = Member::new("f", "Father", "1960");
        creator.join_id = "JOHN001".to_string();
        let family = Family::new("Bello", creator);

        assert!(!family.id.is_empty());
        assert_eq!(family.creator_id, "f");
        assert_eq!(family.creator_join_id, "JOHN001");
        assert!(family.creator().expect("creator present").is_family_creator);
    }

    #[test]
    fn linked_family_ids_cover_both_directions() {
        let mut family = Family::with_id("a", "A", Member::new("f", "Father", "1960"));
        family.linked_families = vec![
            FamilyLink {
                family_id: "a".to_string(),
                linked_family_id: "b".to_string(),
                join_id: "X".to_string(),
                linked_by: "f".to_string(),
                linked_at: 0,
            },
            FamilyLink {
                family_id: "c".to_string(),
                linked_family_id: "a".to_string(),
                join_id: "Y".to_string(),
                linked_by: "g".to_string(),
                linked_at: 0,
            },
        ];
        assert_eq!(family.linked_family_ids(), vec!["b", "c"]);
    }

    #[test]
    fn statistics_count_roles_and_lifecycle() {
        let mut deceased = Member::new("m1", "Wife1", "1965");
        deceased.is_deceased = true;
        deceased.death_year = Some("2010".to_string());
        let mut linked = Member::new("x", "Cousin", "1992");
        linked.is_linked_member = Some(true);
        let members = vec![
            Member::new("f", "Father", "1960"),
            deceased,
            Member::new("c1", "Son", "1990"),
            linked,
        ];

        let stats = FamilyStatistics::from_members(&members);
        assert_eq!(stats.total_members, 4);
        assert_eq!(stats.living_members, 3);
        assert_eq!(stats.deceased_members, 1);
        assert_eq!(stats.fathers, 1);
        assert_eq!(stats.mothers, 1);
        assert_eq!(stats.children, 1);
        assert_eq!(stats.others, 1);
        assert_eq!(stats.linked_members, 1);
    }
}
