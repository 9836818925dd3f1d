//! Member domain model.
//!
//! # Responsibility
//! - Define the flat member record consumed from the data-access layer.
//! - Provide display helpers shared by tree building and FFI projections.
//!
//! # Invariants
//! - `id` is stable and never reused for another member.
//! - `join_id` is globally unique across all families.
//! - `death_year` is meaningful only when `is_deceased` is set.

use serde::{Deserialize, Deserializer, Serialize};

/// Stable identifier for one member record.
pub type MemberId = String;

/// Display placeholder used when a masked id has no visible characters.
const MASK_CHAR: char = '•';
const MASK_VISIBLE_TAIL: usize = 4;

/// Explicit structural role override carried by some records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentType {
    Father,
    Mother,
    Child,
}

impl ParentType {
    /// Parses one override value. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "father" => Some(Self::Father),
            "mother" => Some(Self::Mother),
            "child" => Some(Self::Child),
            _ => None,
        }
    }
}

/// Flat member record as delivered by the backend.
///
/// Fields are lenient on input: missing values default to empty/false so a
/// loosely-typed payload still deserializes. Validity for tree placement is
/// decided separately by [`Member::is_valid`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Member {
    pub id: MemberId,
    pub first_name: String,
    pub last_name: String,
    /// Display override; wins over first/last name when non-empty.
    pub full_name: Option<String>,
    /// Free-text role label, e.g. "Father", "Wife2", "Son".
    pub relationship: String,
    /// Numeric content expected; JSON numbers are accepted.
    #[serde(deserialize_with = "lenient_string")]
    pub birth_year: String,
    pub is_deceased: bool,
    #[serde(deserialize_with = "lenient_optional_string")]
    pub death_year: Option<String>,
    pub is_verified: bool,
    pub is_family_creator: bool,
    pub join_id: String,
    pub join_id_used: bool,
    pub avatar_url: Option<String>,
    /// Explicit parent linkage; authoritative for mother grouping.
    pub mother_id: Option<MemberId>,
    /// Raw override value; see [`Member::parent_type`].
    pub parent_type: Option<String>,
    pub is_linked_member: Option<bool>,
    pub source_family: Option<String>,
    /// National id or document number. Only exposed masked.
    pub id_number: Option<String>,
}

impl Member {
    /// Creates a member with the minimum fields required for tree placement.
    pub fn new(
        id: impl Into<String>,
        relationship: impl Into<String>,
        birth_year: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            relationship: relationship.into(),
            birth_year: birth_year.into(),
            ..Self::default()
        }
    }

    /// Sets first and last name.
    pub fn with_names(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    /// Sets explicit mother linkage.
    pub fn with_mother(mut self, mother_id: impl Into<String>) -> Self {
        self.mother_id = Some(mother_id.into());
        self
    }

    /// Returns the recognized explicit role override, if any.
    pub fn parent_type(&self) -> Option<ParentType> {
        self.parent_type.as_deref().and_then(ParentType::parse)
    }

    /// Returns whether this record can be placed in a tree.
    ///
    /// A record needs a non-blank `id`, `relationship` and `birth_year`.
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty()
            && !self.relationship.trim().is_empty()
            && !self.birth_year.trim().is_empty()
    }

    /// Returns whether this record was pulled in through a family link.
    pub fn is_linked(&self) -> bool {
        self.is_linked_member.unwrap_or(false)
    }

    /// Returns the display name. See [`member_display_name`].
    pub fn display_name(&self) -> String {
        member_display_name(self)
    }

    /// Returns the masked id number, or empty when none is recorded.
    pub fn masked_id_number(&self) -> String {
        self.id_number.as_deref().map(mask_id_number).unwrap_or_default()
    }
}

/// Resolves the display name for one member.
///
/// Order: non-empty `full_name`, then trimmed `first_name last_name`, then
/// the raw relationship label. Never returns an empty string for a record
/// with a relationship label.
pub fn member_display_name(member: &Member) -> String {
    if let Some(full_name) = member.full_name.as_deref() {
        let trimmed = full_name.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let joined = format!("{} {}", member.first_name.trim(), member.last_name.trim());
    let joined = joined.trim();
    if !joined.is_empty() {
        return joined.to_string();
    }

    member.relationship.clone()
}

/// Masks an id number, keeping the last four characters visible.
///
/// Values of four characters or fewer are returned unchanged.
pub fn mask_id_number(value: &str) -> String {
    let total = value.chars().count();
    if total <= MASK_VISIBLE_TAIL {
        return value.to_string();
    }

    let hidden = total - MASK_VISIBLE_TAIL;
    let mut masked = std::iter::repeat(MASK_CHAR).take(hidden).collect::<String>();
    masked.extend(value.chars().skip(hidden));
    masked
}

/// Display label for a 1-based spouse order, e.g. `Wife2`.
pub fn spouse_label(order: usize) -> String {
    format!("Wife{order}")
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseScalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl LooseScalar {
    fn into_string(self) -> String {
        match self {
            Self::Text(value) => value,
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<LooseScalar>::deserialize(deserializer)?
        .map(LooseScalar::into_string)
        .unwrap_or_default())
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<LooseScalar>::deserialize(deserializer)?.map(LooseScalar::into_string))
}
