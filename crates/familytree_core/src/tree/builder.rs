//! Tree construction from flat member lists.
//!
//! # Responsibility
//! - Turn classified members into one rooted tree: father, mothers, children.
//! - Degrade to a flat tree or an empty sentinel instead of failing.
//!
//! # Invariants
//! - `build_tree` always returns exactly one root.
//! - Only valid members (`Member::is_valid`) are placed.
//! - Trees are rebuilt from scratch on every call; nodes are never shared.

use crate::model::member::{member_display_name, Member};
use crate::tree::classify::{classify_gender, Gender};
use crate::tree::infer::infer_structure;
use log::debug;
use serde::Serialize;

/// Id of the sentinel root returned for empty input.
pub const EMPTY_ROOT_ID: &str = "empty";
/// Display name of the sentinel root returned for empty input.
pub const EMPTY_ROOT_NAME: &str = "No Family Members";

/// Renderable tree node. Coordinates are filled by the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    pub gender: Gender,
    pub birth_year: String,
    pub is_deceased: bool,
    pub death_year: Option<String>,
    pub avatar_url: Option<String>,
    pub join_id: String,
    pub relationship: String,
    pub is_linked_member: bool,
    pub source_family: Option<String>,
    /// 1-based spouse order for mother nodes.
    pub spouse_order: Option<usize>,
    pub children: Vec<TreeNode>,
    pub x: f64,
    pub y: f64,
}

impl TreeNode {
    /// Sentinel root for a family without placeable members.
    pub fn empty() -> Self {
        Self {
            id: EMPTY_ROOT_ID.to_string(),
            name: EMPTY_ROOT_NAME.to_string(),
            gender: Gender::Male,
            birth_year: String::new(),
            is_deceased: false,
            death_year: None,
            avatar_url: None,
            join_id: String::new(),
            relationship: String::new(),
            is_linked_member: false,
            source_family: None,
            spouse_order: None,
            children: Vec::new(),
            x: 0.0,
            y: 0.0,
        }
    }

    /// Creates a leaf node from one member record.
    pub fn from_member(member: &Member) -> Self {
        Self {
            id: member.id.clone(),
            name: member_display_name(member),
            gender: classify_gender(member),
            birth_year: member.birth_year.clone(),
            is_deceased: member.is_deceased,
            death_year: member.death_year.clone().filter(|_| member.is_deceased),
            avatar_url: member.avatar_url.clone(),
            join_id: member.join_id.clone(),
            relationship: member.relationship.clone(),
            is_linked_member: member.is_linked(),
            source_family: member.source_family.clone(),
            spouse_order: None,
            children: Vec::new(),
            x: 0.0,
            y: 0.0,
        }
    }

    /// Returns whether this is the empty-input sentinel.
    pub fn is_empty_sentinel(&self) -> bool {
        self.id == EMPTY_ROOT_ID && self.children.is_empty()
    }

    /// Finds a node by id in this subtree, depth-first.
    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Returns the number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }

    /// Visits every node in this subtree in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a TreeNode, usize)) {
        self.walk_at(0, visit);
    }

    fn walk_at<'a>(&'a self, depth: usize, visit: &mut impl FnMut(&'a TreeNode, usize)) {
        visit(self, depth);
        for child in &self.children {
            child.walk_at(depth + 1, visit);
        }
    }
}

/// Builds a single-rooted tree from a flat member list.
///
/// Cases:
/// - no valid member: sentinel root ([`TreeNode::empty`]);
/// - no father: first valid member as root, the rest as flat children;
/// - otherwise: father, then mothers in list order, then grouped children.
pub fn build_tree(members: &[Member]) -> TreeNode {
    let valid = members
        .iter()
        .filter(|member| member.is_valid())
        .cloned()
        .collect::<Vec<_>>();

    let skipped = members.len() - valid.len();
    if skipped > 0 {
        debug!("event=build_tree module=tree status=skip_invalid count={skipped}");
    }

    let Some(first) = valid.first() else {
        debug!("event=build_tree module=tree status=empty");
        return TreeNode::empty();
    };

    let structure = infer_structure(&valid);
    let Some(father) = structure.father else {
        debug!(
            "event=build_tree module=tree status=flat members={}",
            valid.len()
        );
        let mut root = TreeNode::from_member(first);
        root.children = valid[1..].iter().map(TreeNode::from_member).collect();
        return root;
    };

    let mut root = TreeNode::from_member(father);
    for (index, &mother) in structure.mothers.iter().enumerate() {
        let mut mother_node = TreeNode::from_member(mother);
        mother_node.spouse_order = Some(index + 1);
        mother_node.children = structure
            .children_of(mother.id.as_str())
            .iter()
            .map(|&child| TreeNode::from_member(child))
            .collect();
        root.children.push(mother_node);
    }
    root.children.extend(
        structure
            .unassigned
            .iter()
            .map(|&child| TreeNode::from_member(child)),
    );

    debug!(
        "event=build_tree module=tree status=ok mothers={} children={}",
        structure.mothers.len(),
        structure.children.len()
    );
    root
}
