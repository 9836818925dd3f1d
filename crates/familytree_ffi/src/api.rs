//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Flatten core results into plain envelopes the UI can render directly.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Return values are UTF-8 strings or envelopes with stable meaning.
//! - Storage failures surface as the generic unavailable message, never as
//!   raw SQLite text.

use familytree_core::db::open_db;
use familytree_core::{
    build_layout, core_version as core_version_inner, init_logging as init_logging_inner,
    mask_id_number as mask_id_number_inner, ping as ping_inner, ActingContext, JoinIdValidation,
    LayoutConfig, LinkFailure, LinkResult, LinkService, Member, SqliteFamilyRepository,
};
use log::error;
use std::path::PathBuf;
use std::sync::OnceLock;

const DB_FILE_NAME: &str = "familytree.sqlite3";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Masks an id number for display, keeping the last four characters.
///
/// # FFI contract
/// - Sync call, pure.
/// - Never throws; empty input returns empty output.
#[flutter_rust_bridge::frb(sync)]
pub fn mask_id_number(value: String) -> String {
    mask_id_number_inner(value.as_str())
}

/// Tree build response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeJsonResponse {
    /// Whether the payload parsed and a tree was produced.
    pub ok: bool,
    /// Laid-out tree as camelCase JSON; empty on failure.
    pub tree_json: String,
    /// Human-readable response message for diagnostics.
    pub message: String,
}

/// Builds and lays out a family tree from a JSON member array.
///
/// An empty or all-invalid member list still yields `ok=true` with the
/// placeholder root.
///
/// # FFI contract
/// - Sync call, pure computation.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn build_family_tree_json(
    members_json: String,
    viewport_width: f64,
    viewport_height: f64,
) -> TreeJsonResponse {
    let members: Vec<Member> = match serde_json::from_str(members_json.as_str()) {
        Ok(members) => members,
        Err(err) => {
            return TreeJsonResponse {
                ok: false,
                tree_json: String::new(),
                message: format!("invalid members payload: {err}"),
            };
        }
    };

    let tree = build_layout(
        &members,
        viewport_width,
        viewport_height,
        &LayoutConfig::default(),
    );
    match serde_json::to_string(&tree) {
        Ok(tree_json) => TreeJsonResponse {
            ok: true,
            tree_json,
            message: format!("Built tree with {} node(s).", tree.node_count()),
        },
        Err(err) => TreeJsonResponse {
            ok: false,
            tree_json: String::new(),
            message: format!("tree serialization failed: {err}"),
        },
    }
}

/// Join ID validation envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinIdValidationResponse {
    pub is_valid: bool,
    /// Display name of the token holder, when resolved.
    pub member_name: Option<String>,
    /// Family of the token holder, when resolved.
    pub family_name: Option<String>,
    pub is_family_creator: bool,
    /// User-facing message; show verbatim.
    pub message: String,
    /// Stable failure code (`token_not_found`, `own_family`, ...).
    pub code: Option<String>,
}

impl From<JoinIdValidation> for JoinIdValidationResponse {
    fn from(value: JoinIdValidation) -> Self {
        Self {
            is_valid: value.is_valid,
            member_name: value.member_name,
            family_name: value.family_name,
            is_family_creator: value.is_family_creator,
            message: value.message,
            code: value.failure.map(|failure| failure.code().to_string()),
        }
    }
}

/// Family link envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFamilyResponse {
    pub success: bool,
    /// User-facing message; show verbatim.
    pub message: String,
    pub linked_family_id: Option<String>,
    pub linked_family_name: Option<String>,
    pub linked_members_count: u32,
    /// Stable failure code; `None` on success.
    pub code: Option<String>,
}

impl From<LinkResult> for LinkFamilyResponse {
    fn from(value: LinkResult) -> Self {
        let (linked_family_id, linked_family_name) = match value.linked_family {
            Some(summary) => (Some(summary.id), Some(summary.name)),
            None => (None, None),
        };
        Self {
            success: value.success,
            message: value.message,
            linked_family_id,
            linked_family_name,
            linked_members_count: u32::try_from(value.linked_members_count).unwrap_or(u32::MAX),
            code: value.failure.map(|failure| failure.code().to_string()),
        }
    }
}

/// Validates a join token for the acting family. Read-only.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics; storage failures map to the unavailable message.
#[flutter_rust_bridge::frb(sync)]
pub fn validate_join_id(
    token: String,
    family_id: String,
    member_id: String,
) -> JoinIdValidationResponse {
    let acting = ActingContext::new(family_id, member_id);
    match with_link_service(|service| service.validate_join_id(token.as_str(), &acting)) {
        Ok(validation) => validation.into(),
        Err(()) => JoinIdValidationResponse {
            is_valid: false,
            member_name: None,
            family_name: None,
            is_family_creator: false,
            message: LinkFailure::Unavailable.to_string(),
            code: Some(LinkFailure::Unavailable.code().to_string()),
        },
    }
}

/// Links the acting family to the family holding `token`.
///
/// Callers refetch the combined family view after `success=true`.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics; storage failures map to the unavailable message.
#[flutter_rust_bridge::frb(sync)]
pub fn link_family(token: String, family_id: String, member_id: String) -> LinkFamilyResponse {
    let acting = ActingContext::new(family_id, member_id);
    match with_link_service(|service| service.link_family(token.as_str(), &acting)) {
        Ok(result) => result.into(),
        Err(()) => LinkFamilyResponse {
            success: false,
            message: LinkFailure::Unavailable.to_string(),
            linked_family_id: None,
            linked_family_name: None,
            linked_members_count: 0,
            code: Some(LinkFailure::Unavailable.code().to_string()),
        },
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("FAMILYTREE_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn with_link_service<T>(
    f: impl FnOnce(&LinkService<SqliteFamilyRepository<'_>>) -> T,
) -> Result<T, ()> {
    let conn = open_db(resolve_db_path()).map_err(|err| {
        error!("event=ffi_db_open module=ffi status=error error={err}");
    })?;
    let repo = SqliteFamilyRepository::try_new(&conn).map_err(|err| {
        error!("event=ffi_repo_init module=ffi status=error error={err}");
    })?;
    Ok(f(&LinkService::new(repo)))
}
