//! Deterministic 2D layout for family trees.
//!
//! # Responsibility
//! - Assign x/y coordinates to every node of a built tree.
//! - Keep each mother's children band clear of its neighbours' bands.
//!
//! # Invariants
//! - Output depends only on tree shape, viewport and config, never on ids.
//! - Root sits at `viewport_width / 2`.
//! - Adjacent children bands are separated by at least `sibling_spacing`.
//! - Layout never panics; inverted min/max bounds are reordered.

use crate::tree::builder::TreeNode;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Layout constants. All values are in logical pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Vertical offset of the root row.
    pub top_offset: f64,
    /// Share of viewport height used as generation gap before clamping.
    pub generation_gap_ratio: f64,
    pub min_generation_gap: f64,
    pub max_generation_gap: f64,
    /// Margin subtracted on both sides of the viewport width.
    pub horizontal_padding: f64,
    pub min_mother_spacing: f64,
    pub max_mother_spacing: f64,
    /// Widening applied to the clamped mother spacing.
    pub spread_multiplier: f64,
    /// Distance between adjacent sibling centers.
    pub sibling_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            top_offset: 80.0,
            generation_gap_ratio: 0.25,
            min_generation_gap: 160.0,
            max_generation_gap: 240.0,
            horizontal_padding: 40.0,
            min_mother_spacing: 160.0,
            max_mother_spacing: 320.0,
            spread_multiplier: 1.5,
            sibling_spacing: 110.0,
        }
    }
}

/// Rejected layout configuration values.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutConfigError {
    /// A value is NaN or infinite.
    NonFinite(&'static str),
    /// A lower bound exceeds its upper bound.
    InvertedRange {
        min_field: &'static str,
        max_field: &'static str,
        min: f64,
        max: f64,
    },
}

impl Display for LayoutConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinite(field) => write!(f, "layout config `{field}` must be finite"),
            Self::InvertedRange {
                min_field,
                max_field,
                min,
                max,
            } => write!(
                f,
                "layout config `{min_field}` ({min}) exceeds `{max_field}` ({max})"
            ),
        }
    }
}

impl Error for LayoutConfigError {}

impl LayoutConfig {
    /// Checks that every value is finite and every min/max pair is ordered.
    ///
    /// Layout itself tolerates invalid configs; this is for loaders that
    /// want to report them.
    pub fn validate(&self) -> Result<(), LayoutConfigError> {
        let fields = [
            ("top_offset", self.top_offset),
            ("generation_gap_ratio", self.generation_gap_ratio),
            ("min_generation_gap", self.min_generation_gap),
            ("max_generation_gap", self.max_generation_gap),
            ("horizontal_padding", self.horizontal_padding),
            ("min_mother_spacing", self.min_mother_spacing),
            ("max_mother_spacing", self.max_mother_spacing),
            ("spread_multiplier", self.spread_multiplier),
            ("sibling_spacing", self.sibling_spacing),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, value)| !value.is_finite()) {
            return Err(LayoutConfigError::NonFinite(*field));
        }
        ordered(
            "min_generation_gap",
            self.min_generation_gap,
            "max_generation_gap",
            self.max_generation_gap,
        )?;
        ordered(
            "min_mother_spacing",
            self.min_mother_spacing,
            "max_mother_spacing",
            self.max_mother_spacing,
        )
    }

    fn generation_gap(&self, viewport_height: f64) -> f64 {
        clamp_between(
            viewport_height * self.generation_gap_ratio,
            self.min_generation_gap,
            self.max_generation_gap,
        )
    }

    fn base_mother_spacing(&self, viewport_width: f64, mother_count: usize) -> f64 {
        let available = (viewport_width - 2.0 * self.horizontal_padding).max(0.0);
        let raw = available / (mother_count as f64 + 1.0);
        clamp_between(raw, self.min_mother_spacing, self.max_mother_spacing)
            * self.spread_multiplier
    }

    /// Width covered by the centers of `count` siblings.
    fn band_span(&self, count: usize) -> f64 {
        count.saturating_sub(1) as f64 * self.sibling_spacing
    }
}

fn ordered(
    min_field: &'static str,
    min: f64,
    max_field: &'static str,
    max: f64,
) -> Result<(), LayoutConfigError> {
    if min > max {
        return Err(LayoutConfigError::InvertedRange {
            min_field,
            max_field,
            min,
            max,
        });
    }
    Ok(())
}

/// Clamps into the range spanned by `a` and `b`, whichever is smaller.
/// NaN bounds are ignored.
fn clamp_between(value: f64, a: f64, b: f64) -> f64 {
    let (low, high) = (a.min(b), a.max(b));
    value.max(low).min(high)
}

/// Axis-aligned bounds over node centers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl LayoutBounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Lays out a tree with the default configuration.
pub fn layout(root: &mut TreeNode, viewport_width: f64, viewport_height: f64) {
    layout_with(root, viewport_width, viewport_height, &LayoutConfig::default());
}

/// Lays out a tree in place.
///
/// The root is centered horizontally. Its children (mothers, or flat members
/// in the degraded case) form one row centered under it; each row entry's
/// children are centered beneath that entry.
pub fn layout_with(
    root: &mut TreeNode,
    viewport_width: f64,
    viewport_height: f64,
    config: &LayoutConfig,
) {
    let gap = config.generation_gap(viewport_height);
    root.x = viewport_width / 2.0;
    root.y = config.top_offset;

    let count = root.children.len();
    if count == 0 {
        return;
    }

    let base = config.base_mother_spacing(viewport_width, count);
    let spans = root
        .children
        .iter()
        .map(|mother| config.band_span(mother.children.len()))
        .collect::<Vec<_>>();
    let gaps = spans
        .windows(2)
        .map(|pair| base.max((pair[0] + pair[1]) / 2.0 + config.sibling_spacing))
        .collect::<Vec<_>>();

    let row_width: f64 = gaps.iter().sum();
    let mut x = root.x - row_width / 2.0;
    let row_y = root.y + gap;
    for (index, mother) in root.children.iter_mut().enumerate() {
        mother.x = x;
        mother.y = row_y;
        place_descendants(mother, gap, config);
        if let Some(step) = gaps.get(index) {
            x += step;
        }
    }
}

fn place_descendants(parent: &mut TreeNode, gap: f64, config: &LayoutConfig) {
    let span = config.band_span(parent.children.len());
    let start = parent.x - span / 2.0;
    let y = parent.y + gap;
    for (index, child) in parent.children.iter_mut().enumerate() {
        child.x = start + index as f64 * config.sibling_spacing;
        child.y = y;
        place_descendants(child, gap, config);
    }
}

/// Returns bounds over all node centers of a laid-out tree.
pub fn tree_bounds(root: &TreeNode) -> LayoutBounds {
    let mut bounds = LayoutBounds {
        min_x: root.x,
        max_x: root.x,
        min_y: root.y,
        max_y: root.y,
    };
    root.walk(&mut |node, _| {
        bounds.min_x = bounds.min_x.min(node.x);
        bounds.max_x = bounds.max_x.max(node.x);
        bounds.min_y = bounds.min_y.min(node.y);
        bounds.max_y = bounds.max_y.max(node.y);
    });
    bounds
}

#[cfg(test)]
mod tests {
    use super::{layout, layout_with, tree_bounds, LayoutConfig, LayoutConfigError};
    use crate::model::member::Member;
    use crate::tree::builder::{build_tree, TreeNode};

    fn polygamous_family(children_per_mother: &[usize]) -> Vec<Member> {
        let mut members = vec![Member::new("f", "Father", "1960")];
        for (m, &count) in children_per_mother.iter().enumerate() {
            let mother_id = format!("m{m}");
            members.push(Member::new(mother_id.as_str(), format!("Wife{}", m + 1), "1965"));
            for c in 0..count {
                members.push(
                    Member::new(format!("c{m}_{c}"), "Son", "1990").with_mother(mother_id.as_str()),
                );
            }
        }
        members
    }

    fn x_span(node: &TreeNode) -> (f64, f64) {
        let xs = node.children.iter().map(|child| child.x);
        let min = xs.clone().fold(f64::INFINITY, f64::min);
        let max = xs.fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    }

    #[test]
    fn root_is_centered_at_top() {
        let mut root = build_tree(&polygamous_family(&[1]));
        layout(&mut root, 800.0, 600.0);
        assert_eq!(root.x, 400.0);
        assert_eq!(root.y, LayoutConfig::default().top_offset);
    }

    #[test]
    fn generations_are_vertically_separated() {
        let mut root = build_tree(&polygamous_family(&[2, 1]));
        layout(&mut root, 800.0, 600.0);
        let mother_y = root.children[0].y;
        let child_y = root.children[0].children[0].y;
        assert!(mother_y - root.y >= LayoutConfig::default().min_generation_gap);
        assert!(child_y - mother_y >= LayoutConfig::default().min_generation_gap);
        assert!(root.children.iter().all(|mother| mother.y == mother_y));
    }

    #[test]
    fn mother_row_is_centered_under_father() {
        let mut root = build_tree(&polygamous_family(&[1, 3, 2]));
        layout(&mut root, 1024.0, 768.0);
        let first = root.children.first().map(|m| m.x).unwrap_or_default();
        let last = root.children.last().map(|m| m.x).unwrap_or_default();
        assert!(((first + last) / 2.0 - root.x).abs() < 1e-9);
        assert!(root.children.windows(2).all(|pair| pair[0].x < pair[1].x));
    }

    #[test]
    fn children_are_centered_under_their_mother() {
        let mut root = build_tree(&polygamous_family(&[3, 2]));
        layout(&mut root, 800.0, 600.0);
        for mother in &root.children {
            let (min, max) = x_span(mother);
            assert!(((min + max) / 2.0 - mother.x).abs() < 1e-9);
        }
    }

    #[test]
    fn children_bands_never_overlap_across_mothers() {
        let config = LayoutConfig::default();
        let shapes: [&[usize]; 5] = [&[1, 1], &[6, 6], &[10, 1, 10], &[4, 9, 2, 7], &[12, 12, 12]];
        for shape in shapes {
            let mut root = build_tree(&polygamous_family(shape));
            layout_with(&mut root, 360.0, 640.0, &config);
            for i in 0..root.children.len() {
                for j in 0..root.children.len() {
                    if i == j {
                        continue;
                    }
                    let (a_min, a_max) = x_span(&root.children[i]);
                    let (b_min, b_max) = x_span(&root.children[j]);
                    let disjoint = a_max + config.sibling_spacing <= b_min + 1e-9
                        || b_max + config.sibling_spacing <= a_min + 1e-9;
                    assert!(disjoint, "bands {i} and {j} overlap for shape {shape:?}");
                }
            }
        }
    }

    #[test]
    fn layout_is_deterministic() {
        let members = polygamous_family(&[2, 0, 3]);
        let mut first = build_tree(&members);
        let mut second = build_tree(&members);
        layout(&mut first, 800.0, 600.0);
        layout(&mut second, 800.0, 600.0);
        layout(&mut second, 800.0, 600.0);
        assert_eq!(first, second);
    }

    #[test]
    fn layout_ignores_member_identity() {
        let mut original = build_tree(&polygamous_family(&[2, 1]));
        let renamed_members = polygamous_family(&[2, 1])
            .into_iter()
            .map(|mut member| {
                member.id = format!("x-{}", member.id);
                member.mother_id = member.mother_id.map(|id| format!("x-{id}"));
                member
            })
            .collect::<Vec<_>>();
        let mut renamed = build_tree(&renamed_members);
        layout(&mut original, 800.0, 600.0);
        layout(&mut renamed, 800.0, 600.0);

        let mut original_points = Vec::new();
        original.walk(&mut |node, _| original_points.push((node.x, node.y)));
        let mut renamed_points = Vec::new();
        renamed.walk(&mut |node, _| renamed_points.push((node.x, node.y)));
        assert_eq!(original_points, renamed_points);
    }

    #[test]
    fn single_root_only_sets_root_position() {
        let mut root = TreeNode::empty();
        layout(&mut root, 500.0, 500.0);
        assert_eq!(root.x, 250.0);
        let bounds = tree_bounds(&root);
        assert_eq!(bounds.width(), 0.0);
    }

    #[test]
    fn bounds_cover_all_generations() {
        let mut root = build_tree(&polygamous_family(&[2, 2]));
        layout(&mut root, 800.0, 600.0);
        let bounds = tree_bounds(&root);
        let config = LayoutConfig::default();
        assert_eq!(bounds.min_y, config.top_offset);
        assert!(bounds.height() >= 2.0 * config.min_generation_gap);
        assert!(bounds.width() > 0.0);
    }

    #[test]
    fn inverted_bounds_do_not_panic() {
        let config = LayoutConfig {
            min_generation_gap: 300.0,
            max_generation_gap: 100.0,
            min_mother_spacing: 400.0,
            ..LayoutConfig::default()
        };
        let mut root = build_tree(&polygamous_family(&[1, 2]));
        layout_with(&mut root, 800.0, 600.0, &config);

        let gap = root.children[0].y - root.y;
        assert!((100.0..=300.0).contains(&gap));
        let spacing = root.children[1].x - root.children[0].x;
        assert!(spacing >= 320.0 * config.spread_multiplier);
        assert!(spacing.is_finite());
    }

    #[test]
    fn validate_reports_inverted_and_non_finite_values() {
        assert!(LayoutConfig::default().validate().is_ok());

        let spacing: LayoutConfig =
            serde_json::from_str(r#"{"min_mother_spacing": 400.0}"#).unwrap();
        let err = spacing.validate().unwrap_err();
        assert!(matches!(
            err,
            LayoutConfigError::InvertedRange {
                min_field: "min_mother_spacing",
                ..
            }
        ));
        assert!(err.to_string().contains("max_mother_spacing"));

        let gap = LayoutConfig {
            min_generation_gap: 500.0,
            ..LayoutConfig::default()
        };
        assert!(matches!(
            gap.validate(),
            Err(LayoutConfigError::InvertedRange {
                min_field: "min_generation_gap",
                ..
            })
        ));

        let nan = LayoutConfig {
            sibling_spacing: f64::NAN,
            ..LayoutConfig::default()
        };
        assert_eq!(
            nan.validate(),
            Err(LayoutConfigError::NonFinite("sibling_spacing"))
        );
    }
}
