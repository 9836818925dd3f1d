//! Family tree pipeline: classify, infer, build, lay out.
//!
//! # Responsibility
//! - Turn flat member records into a renderable, positioned tree.
//! - Keep every stage a pure function of its inputs.
//!
//! # Invariants
//! - No stage holds state between calls.
//! - Structural problems degrade the tree; they never fail the call.

pub mod builder;
pub mod classify;
pub mod infer;
pub mod layout;

use crate::model::member::Member;
use builder::TreeNode;
use layout::LayoutConfig;

/// Builds and lays out a tree in one pass.
pub fn build_layout(
    members: &[Member],
    viewport_width: f64,
    viewport_height: f64,
    config: &LayoutConfig,
) -> TreeNode {
    let mut root = builder::build_tree(members);
    layout::layout_with(&mut root, viewport_width, viewport_height, config);
    root
}
