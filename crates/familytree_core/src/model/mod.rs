//! Domain model for family records.
//!
//! # Responsibility
//! - Define the flat member record and the family aggregate.
//! - Keep derived data (statistics, display names) out of storage shape.
//!
//! # Invariants
//! - Every member is identified by a stable `MemberId`.
//! - Every family is identified by a stable `FamilyId`.

pub mod family;
pub mod member;
