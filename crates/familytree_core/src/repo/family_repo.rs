//! Family repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the data-access collaborator used by family and link services.
//! - Keep SQL details and member ordering inside the repository boundary.
//!
//! # Invariants
//! - Members are returned in insertion order (`sort_order ASC`).
//! - `join_id` is unique across all families.
//! - A link row and the `join_id_used` flag are written in one transaction.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::family::{Family, FamilyId, FamilyLink};
use crate::model::member::Member;
use rusqlite::{
    ffi, params, Connection, ErrorCode, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

const MEMBER_SELECT_SQL: &str = "SELECT
    id,
    first_name,
    last_name,
    full_name,
    relationship,
    birth_year,
    is_deceased,
    death_year,
    is_verified,
    is_family_creator,
    join_id,
    join_id_used,
    avatar_url,
    mother_id,
    parent_type,
    id_number
FROM members";

/// Result type used by family repository operations.
pub type FamilyRepoResult<T> = Result<T, FamilyRepoError>;

/// Errors from family repository operations.
#[derive(Debug)]
pub enum FamilyRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target family does not exist.
    FamilyNotFound(FamilyId),
    /// Join token already assigned to another member.
    DuplicateJoinId(String),
    /// Member id already stored.
    DuplicateMember(String),
    /// Link between the two families already recorded.
    DuplicateLink {
        family_id: FamilyId,
        linked_family_id: FamilyId,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for FamilyRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::FamilyNotFound(id) => write!(f, "family not found: {id}"),
            Self::DuplicateJoinId(join_id) => write!(f, "join id already in use: {join_id}"),
            Self::DuplicateMember(id) => write!(f, "member already exists: {id}"),
            Self::DuplicateLink {
                family_id,
                linked_family_id,
            } => write!(
                f,
                "families already linked: {family_id} <-> {linked_family_id}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "family repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid family data: {message}"),
        }
    }
}

impl Error for FamilyRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for FamilyRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for FamilyRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Owner of one join token, resolved across all families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinIdOwner {
    pub member: Member,
    pub family_id: FamilyId,
    pub family_name: String,
}

/// Repository interface for family aggregates and links.
pub trait FamilyRepository {
    /// Stores a new family with its current members.
    fn create_family(&self, family: &Family) -> FamilyRepoResult<()>;
    /// Appends one member to an existing family.
    fn add_member(&self, family_id: &str, member: &Member) -> FamilyRepoResult<()>;
    /// Loads one family with members and links.
    fn get_family(&self, family_id: &str) -> FamilyRepoResult<Option<Family>>;
    /// Lists members of one family in insertion order.
    fn list_members(&self, family_id: &str) -> FamilyRepoResult<Vec<Member>>;
    /// Resolves the member and family holding one join token.
    fn find_join_id_owner(&self, join_id: &str) -> FamilyRepoResult<Option<JoinIdOwner>>;
    /// Lists links touching one family, in either direction.
    fn list_links(&self, family_id: &str) -> FamilyRepoResult<Vec<FamilyLink>>;
    /// Records one link and marks the consumed join token as used.
    fn record_link(&self, link: &FamilyLink) -> FamilyRepoResult<()>;
    /// Counts stored members across all families.
    fn count_members(&self) -> FamilyRepoResult<usize>;
    /// Returns whether any member in any family holds `join_id`.
    fn join_id_exists(&self, join_id: &str) -> FamilyRepoResult<bool>;
}

/// SQLite-backed family repository.
#[derive(Clone, Copy)]
pub struct SqliteFamilyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFamilyRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> FamilyRepoResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(FamilyRepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl FamilyRepository for SqliteFamilyRepository<'_> {
    fn create_family(&self, family: &Family) -> FamilyRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO families (id, name, creator_id, creator_join_id, is_main_family)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                family.id.as_str(),
                family.name.as_str(),
                family.creator_id.as_str(),
                family.creator_join_id.as_str(),
                bool_to_int(family.is_main_family),
            ],
        )?;
        for (index, member) in family.members.iter().enumerate() {
            insert_member(&tx, family.id.as_str(), index as i64, member)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn add_member(&self, family_id: &str, member: &Member) -> FamilyRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_family_exists(&tx, family_id)?;
        let sort_order: i64 = tx.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM members WHERE family_id = ?1;",
            [family_id],
            |row| row.get(0),
        )?;
        insert_member(&tx, family_id, sort_order, member)?;
        tx.commit()?;
        Ok(())
    }

    fn get_family(&self, family_id: &str) -> FamilyRepoResult<Option<Family>> {
        let header = self
            .conn
            .query_row(
                "SELECT id, name, creator_id, creator_join_id, is_main_family
                 FROM families
                 WHERE id = ?1;",
                [family_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, name, creator_id, creator_join_id, is_main_family)) = header else {
            return Ok(None);
        };

        Ok(Some(Family {
            members: self.list_members(id.as_str())?,
            linked_families: self.list_links(id.as_str())?,
            id,
            name,
            creator_id,
            creator_join_id,
            is_main_family: int_to_bool(is_main_family, "families.is_main_family")?,
            statistics: None,
        }))
    }

    fn list_members(&self, family_id: &str) -> FamilyRepoResult<Vec<Member>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEMBER_SELECT_SQL}
             WHERE family_id = ?1
             ORDER BY sort_order ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([family_id])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_member_row(row)?);
        }
        Ok(members)
    }

    fn find_join_id_owner(&self, join_id: &str) -> FamilyRepoResult<Option<JoinIdOwner>> {
        let owner = self
            .conn
            .query_row(
                "SELECT m.family_id, f.name
                 FROM members m
                 JOIN families f ON f.id = m.family_id
                 WHERE m.join_id = ?1;",
                [join_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((family_id, family_name)) = owner else {
            return Ok(None);
        };

        let mut stmt = self
            .conn
            .prepare(&format!("{MEMBER_SELECT_SQL} WHERE join_id = ?1;"))?;
        let mut rows = stmt.query([join_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        Ok(Some(JoinIdOwner {
            member: parse_member_row(row)?,
            family_id,
            family_name,
        }))
    }

    fn list_links(&self, family_id: &str) -> FamilyRepoResult<Vec<FamilyLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT family_id, linked_family_id, join_id, linked_by, linked_at
             FROM family_links
             WHERE family_id = ?1 OR linked_family_id = ?1
             ORDER BY linked_at ASC, family_id ASC, linked_family_id ASC;",
        )?;
        let mut rows = stmt.query([family_id])?;
        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            links.push(FamilyLink {
                family_id: row.get(0)?,
                linked_family_id: row.get(1)?,
                join_id: row.get(2)?,
                linked_by: row.get(3)?,
                linked_at: row.get(4)?,
            });
        }
        Ok(links)
    }

    fn record_link(&self, link: &FamilyLink) -> FamilyRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_family_exists(&tx, link.family_id.as_str())?;
        ensure_family_exists(&tx, link.linked_family_id.as_str())?;

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*)
             FROM family_links
             WHERE (family_id = ?1 AND linked_family_id = ?2)
                OR (family_id = ?2 AND linked_family_id = ?1);",
            params![link.family_id.as_str(), link.linked_family_id.as_str()],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Err(FamilyRepoError::DuplicateLink {
                family_id: link.family_id.clone(),
                linked_family_id: link.linked_family_id.clone(),
            });
        }

        tx.execute(
            "INSERT INTO family_links (family_id, linked_family_id, join_id, linked_by, linked_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                link.family_id.as_str(),
                link.linked_family_id.as_str(),
                link.join_id.as_str(),
                link.linked_by.as_str(),
                link.linked_at,
            ],
        )?;
        tx.execute(
            "UPDATE members SET join_id_used = 1 WHERE join_id = ?1;",
            [link.join_id.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn count_members(&self) -> FamilyRepoResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM members;", [], |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| FamilyRepoError::InvalidData(format!("negative member count {count}")))
    }

    fn join_id_exists(&self, join_id: &str) -> FamilyRepoResult<bool> {
        join_id_taken(self.conn, join_id)
    }
}

fn insert_member(
    conn: &Connection,
    family_id: &str,
    sort_order: i64,
    member: &Member,
) -> FamilyRepoResult<()> {
    let result = conn.execute(
        "INSERT INTO members (
            id,
            family_id,
            sort_order,
            first_name,
            last_name,
            full_name,
            relationship,
            birth_year,
            is_deceased,
            death_year,
            is_verified,
            is_family_creator,
            join_id,
            join_id_used,
            avatar_url,
            mother_id,
            parent_type,
            id_number
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18);",
        params![
            member.id.as_str(),
            family_id,
            sort_order,
            member.first_name.as_str(),
            member.last_name.as_str(),
            member.full_name.as_deref(),
            member.relationship.as_str(),
            member.birth_year.as_str(),
            bool_to_int(member.is_deceased),
            member.death_year.as_deref(),
            bool_to_int(member.is_verified),
            bool_to_int(member.is_family_creator),
            member.join_id.as_str(),
            bool_to_int(member.join_id_used),
            member.avatar_url.as_deref(),
            member.mother_id.as_deref(),
            member.parent_type.as_deref(),
            member.id_number.as_deref(),
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(err) if is_unique_violation(&err) => {
            if join_id_taken(conn, member.join_id.as_str())? {
                Err(FamilyRepoError::DuplicateJoinId(member.join_id.clone()))
            } else {
                Err(FamilyRepoError::DuplicateMember(member.id.clone()))
            }
        }
        Err(err) => Err(err.into()),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == ErrorCode::ConstraintViolation
                && matches!(
                    inner.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
    )
}

fn join_id_taken(conn: &Connection, join_id: &str) -> FamilyRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM members WHERE join_id = ?1);",
        [join_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn ensure_family_exists(conn: &Connection, family_id: &str) -> FamilyRepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM families WHERE id = ?1);",
        [family_id],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(FamilyRepoError::FamilyNotFound(family_id.to_string()))
    }
}

fn parse_member_row(row: &Row<'_>) -> FamilyRepoResult<Member> {
    Ok(Member {
        id: row.get("id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        full_name: row.get("full_name")?,
        relationship: row.get("relationship")?,
        birth_year: row.get("birth_year")?,
        is_deceased: int_to_bool(row.get("is_deceased")?, "members.is_deceased")?,
        death_year: row.get("death_year")?,
        is_verified: int_to_bool(row.get("is_verified")?, "members.is_verified")?,
        is_family_creator: int_to_bool(
            row.get("is_family_creator")?,
            "members.is_family_creator",
        )?,
        join_id: row.get("join_id")?,
        join_id_used: int_to_bool(row.get("join_id_used")?, "members.join_id_used")?,
        avatar_url: row.get("avatar_url")?,
        mother_id: row.get("mother_id")?,
        parent_type: row.get("parent_type")?,
        is_linked_member: None,
        source_family: None,
        id_number: row.get("id_number")?,
    })
}

fn int_to_bool(value: i64, column: &'static str) -> FamilyRepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(FamilyRepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
