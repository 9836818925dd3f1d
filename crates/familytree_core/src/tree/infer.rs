//! Relationship inference over flat member lists.
//!
//! # Responsibility
//! - Pick the father, the ordered mother set and the children.
//! - Group every child under exactly one mother.
//!
//! # Invariants
//! - First father-classified member wins.
//! - Mother order is list order and drives spouse numbering.
//! - Every mother has an entry in `children_by_mother`, possibly empty.
//! - No child is dropped: without any mother it lands in `unassigned`.

use crate::model::member::Member;
use crate::tree::classify::{classify_role, Role};
use log::warn;
use std::collections::HashMap;

/// Structural view over one member list. Borrows the members.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FamilyStructure<'a> {
    pub father: Option<&'a Member>,
    pub mothers: Vec<&'a Member>,
    pub children: Vec<&'a Member>,
    /// Keyed by mother id; every mother present, in child list order.
    pub children_by_mother: HashMap<&'a str, Vec<&'a Member>>,
    /// Children that could not be grouped because no mother exists.
    pub unassigned: Vec<&'a Member>,
    /// Children placed on the first mother for lack of a matching `mother_id`.
    pub fallback_assignments: usize,
}

impl<'a> FamilyStructure<'a> {
    /// Returns grouped children of one mother, or an empty slice.
    pub fn children_of(&self, mother_id: &str) -> &[&'a Member] {
        self.children_by_mother
            .get(mother_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Classifies members and groups children under mothers.
pub fn infer_structure(members: &[Member]) -> FamilyStructure<'_> {
    let mut structure = FamilyStructure::default();

    for member in members {
        match classify_role(member) {
            Role::Father => {
                if structure.father.is_none() {
                    structure.father = Some(member);
                } else {
                    warn!("event=infer_structure module=tree status=extra_father");
                }
            }
            Role::Mother => structure.mothers.push(member),
            Role::Child => structure.children.push(member),
            Role::Other => {}
        }
    }

    for &mother in &structure.mothers {
        structure
            .children_by_mother
            .entry(mother.id.as_str())
            .or_default();
    }

    let first_mother = structure.mothers.first().map(|&mother| mother.id.as_str());
    for &child in &structure.children {
        let declared = child
            .mother_id
            .as_deref()
            .filter(|mother_id| structure.children_by_mother.contains_key(*mother_id));

        match (declared, first_mother) {
            (Some(mother_id), _) => {
                if let Some(group) = structure.children_by_mother.get_mut(mother_id) {
                    group.push(child);
                }
            }
            (None, Some(mother_id)) => {
                structure.fallback_assignments += 1;
                if let Some(group) = structure.children_by_mother.get_mut(mother_id) {
                    group.push(child);
                }
            }
            (None, None) => structure.unassigned.push(child),
        }
    }

    if structure.fallback_assignments > 0 {
        warn!(
            "event=infer_structure module=tree status=fallback_mother children={} mothers={}",
            structure.fallback_assignments,
            structure.mothers.len()
        );
    }

    structure
}
