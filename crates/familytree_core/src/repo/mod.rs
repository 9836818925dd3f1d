//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data-access contract consumed by family and link services.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`FamilyNotFound`,
//!   `DuplicateLink`, ...) in addition to DB transport errors.

pub mod family_repo;
