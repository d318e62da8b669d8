//! Issue CRUD operations for [`SqliteStore`].

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};

use issuedb_core::content_hash::compute_content_hash;
use issuedb_core::enums::{AgentState, EventType, IssueType, MolType, Status, WorkType};
use issuedb_core::filter::IssueFilter;
use issuedb_core::idgen::{adaptive_defaults, compute_adaptive_length, generate_hash_id};
use issuedb_core::issue::Issue;
use issuedb_core::validation::validate_with_custom;

use crate::error::{Result, StorageError};
use crate::sqlite::config::get_config_on_conn;
use crate::sqlite::store::SqliteStore;
use crate::traits::IssueUpdates;

// ---------------------------------------------------------------------------
// Column list (shared between INSERT and SELECT)
// ---------------------------------------------------------------------------

/// All issue columns in a deterministic order for SELECT queries.
pub(crate) const ISSUE_COLUMNS: &str = r#"
    id, content_hash, title, description, design, acceptance_criteria, notes, spec_id,
    status, priority, issue_type, assignee, owner, estimated_minutes,
    created_at, created_by, updated_at, closed_at, close_reason, closed_by_session,
    deleted_at, deleted_by, delete_reason, original_type,
    due_at, defer_until,
    external_ref, source_system,
    metadata,
    compaction_level, compacted_at, compacted_at_commit, original_size,
    source_repo,
    sender, ephemeral,
    pinned, is_template, quality_score, crystallizes,
    await_type, await_id, timeout_ns, waiters,
    hook_bead, role_bead, agent_state, last_activity, role_type, rig,
    mol_type, work_type,
    event_kind, actor, target, payload
"#;

/// Same as [`ISSUE_COLUMNS`] but prefixed with `issues.` for use in JOIN queries
/// to avoid ambiguous column names (e.g. `created_at` exists in both `issues` and `dependencies`).
pub(crate) const ISSUE_COLUMNS_PREFIXED: &str = r#"
    issues.id, issues.content_hash, issues.title, issues.description, issues.design, issues.acceptance_criteria, issues.notes, issues.spec_id,
    issues.status, issues.priority, issues.issue_type, issues.assignee, issues.owner, issues.estimated_minutes,
    issues.created_at, issues.created_by, issues.updated_at, issues.closed_at, issues.close_reason, issues.closed_by_session,
    issues.deleted_at, issues.deleted_by, issues.delete_reason, issues.original_type,
    issues.due_at, issues.defer_until,
    issues.external_ref, issues.source_system,
    issues.metadata,
    issues.compaction_level, issues.compacted_at, issues.compacted_at_commit, issues.original_size,
    issues.source_repo,
    issues.sender, issues.ephemeral,
    issues.pinned, issues.is_template, issues.quality_score, issues.crystallizes,
    issues.await_type, issues.await_id, issues.timeout_ns, issues.waiters,
    issues.hook_bead, issues.role_bead, issues.agent_state, issues.last_activity, issues.role_type, issues.rig,
    issues.mol_type, issues.work_type,
    issues.event_kind, issues.actor, issues.target, issues.payload
"#;

// ---------------------------------------------------------------------------
// Row scanning
// ---------------------------------------------------------------------------

/// Deserialises a row into an [`Issue`].
///
/// The column order MUST match [`ISSUE_COLUMNS`].
pub(crate) fn scan_issue(row: &Row<'_>) -> rusqlite::Result<Issue> {
    let id: String = row.get("id")?;
    let content_hash: String = row.get("content_hash")?;
    let title: String = row.get("title")?;
    let description: String = row.get("description")?;
    let design: String = row.get("design")?;
    let acceptance_criteria: String = row.get("acceptance_criteria")?;
    let notes: String = row.get("notes")?;

    let status_str: String = row.get("status")?;
    let priority: i32 = row.get("priority")?;
    let issue_type_str: String = row.get("issue_type")?;
    let assignee: String = row.get("assignee")?;
    let estimated_minutes: Option<i32> = row.get("estimated_minutes")?;

    let created_at_str: String = row.get("created_at")?;
    let created_by: String = row.get("created_by")?;
    let owner: String = row.get("owner")?;
    let updated_at_str: String = row.get("updated_at")?;
    let closed_at_str: Option<String> = row.get("closed_at")?;
    let closed_by_session: String = row.get("closed_by_session")?;

    let deleted_at_str: Option<String> = row.get("deleted_at")?;
    let deleted_by: String = row.get("deleted_by")?;
    let delete_reason: String = row.get("delete_reason")?;
    let original_type: String = row.get("original_type")?;

    let external_ref: Option<String> = row.get("external_ref")?;
    let spec_id: String = row.get::<_, Option<String>>("spec_id")?.unwrap_or_default();

    let compaction_level: i32 = row.get("compaction_level")?;
    let compacted_at_str: Option<String> = row.get("compacted_at")?;
    let compacted_at_commit: Option<String> = row.get("compacted_at_commit")?;
    let original_size: i32 = row.get("original_size")?;

    let sender: String = row.get("sender")?;
    let ephemeral_int: i32 = row.get("ephemeral")?;

    let pinned_int: i32 = row.get("pinned")?;
    let is_template_int: i32 = row.get("is_template")?;
    let crystallizes_int: i32 = row.get("crystallizes")?;

    let mol_type_str: String = row.get("mol_type")?;
    let work_type_str: String = row.get("work_type")?;
    let quality_score: Option<f64> = row.get("quality_score")?;

    let source_system: String = row.get("source_system")?;
    let metadata_str: String = row.get("metadata")?;
    let source_repo: String = row.get("source_repo")?;
    let close_reason: String = row.get("close_reason")?;

    let event_kind: String = row.get("event_kind")?;
    let actor: String = row.get("actor")?;
    let target: String = row.get("target")?;
    let payload: String = row.get("payload")?;

    let await_type: String = row.get("await_type")?;
    let await_id: String = row.get("await_id")?;
    let timeout_ns: i64 = row.get("timeout_ns")?;
    let waiters_str: String = row.get("waiters")?;

    let hook_bead: String = row.get("hook_bead")?;
    let role_bead: String = row.get("role_bead")?;
    let agent_state_str: String = row.get("agent_state")?;
    let last_activity_str: Option<String> = row.get("last_activity")?;
    let role_type: String = row.get("role_type")?;
    let rig: String = row.get("rig")?;

    let due_at_str: Option<String> = row.get("due_at")?;
    let defer_until_str: Option<String> = row.get("defer_until")?;

    // Parse timestamps.
    let created_at = parse_datetime(&created_at_str);
    let updated_at = parse_datetime(&updated_at_str);
    let closed_at = closed_at_str.as_deref().map(parse_datetime);
    let deleted_at = deleted_at_str.as_deref().map(parse_datetime);
    let compacted_at = compacted_at_str.as_deref().map(parse_datetime);
    let last_activity = last_activity_str.as_deref().map(parse_datetime);
    let due_at = due_at_str.as_deref().map(parse_datetime);
    let defer_until = defer_until_str.as_deref().map(parse_datetime);

    // Parse JSON fields.
    let metadata = if metadata_str.is_empty() || metadata_str == "{}" {
        None
    } else {
        serde_json::value::RawValue::from_string(metadata_str).ok()
    };

    let waiters: Vec<String> = serde_json::from_str(&waiters_str).unwrap_or_default();

    let timeout = if timeout_ns > 0 {
        Some(std::time::Duration::from_nanos(timeout_ns as u64))
    } else {
        None
    };

    Ok(Issue {
        id,
        content_hash,
        title,
        description,
        design,
        acceptance_criteria,
        notes,
        status: Status::from(status_str),
        priority,
        issue_type: IssueType::from(issue_type_str),
        assignee,
        estimated_minutes,
        created_at,
        created_by,
        owner,
        updated_at,
        closed_at,
        close_reason,
        closed_by_session,
        deleted_at,
        deleted_by,
        delete_reason,
        original_type,
        external_ref,
        spec_id,
        compaction_level,
        compacted_at,
        compacted_at_commit,
        original_size,
        sender,
        ephemeral: ephemeral_int != 0,
        pinned: pinned_int != 0,
        is_template: is_template_int != 0,
        crystallizes: crystallizes_int != 0,
        mol_type: MolType::from(mol_type_str),
        work_type: WorkType::from(work_type_str),
        quality_score: quality_score.map(|v| v as f32),
        source_system,
        metadata,
        source_repo,
        event_kind,
        actor,
        target,
        payload,
        await_type,
        await_id,
        timeout,
        waiters,
        hook_bead,
        role_bead,
        agent_state: AgentState::from(agent_state_str),
        last_activity,
        role_type,
        rig,
        due_at,
        defer_until,
        // Fields not stored in DB:
        labels: Vec::new(),
        dependencies: Vec::new(),
        comments: Vec::new(),
        id_prefix: String::new(),
        prefix_override: String::new(),
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Formats a `DateTime<Utc>` as ISO 8601 TEXT for SQLite.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Parses an ISO 8601 TEXT string from SQLite into a `DateTime<Utc>`.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // Try full RFC 3339 first, then common SQLite formats.
    s.parse::<DateTime<Utc>>().unwrap_or_else(|_| {
        chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ")
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ"))
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
            .map(|ndt| ndt.and_utc())
            .unwrap_or_else(|_| Utc::now())
    })
}

// ---------------------------------------------------------------------------
// ID generation and prefix/validation resolution
// ---------------------------------------------------------------------------

fn count_issues_with_prefix_on_conn(conn: &Connection, prefix: &str) -> Result<usize> {
    let like_pattern = format!("{prefix}-%");
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM issues WHERE id LIKE ?1",
        params![like_pattern],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Generates a unique id for `prefix`, retrying over length and nonce until a
/// non-colliding candidate is found.
fn generate_unique_id_on_conn(
    conn: &Connection,
    prefix: &str,
    title: &str,
    description: &str,
    creator: &str,
    timestamp: DateTime<Utc>,
) -> Result<String> {
    let existing = count_issues_with_prefix_on_conn(conn, prefix)?;
    let base_length = compute_adaptive_length(
        existing,
        adaptive_defaults::MIN_LENGTH,
        adaptive_defaults::MAX_LENGTH,
        adaptive_defaults::MAX_COLLISION_PROB,
    );

    for length in base_length..=adaptive_defaults::MAX_LENGTH {
        for nonce in 0..=9 {
            let candidate =
                generate_hash_id(prefix, title, description, creator, timestamp, length, nonce);
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM issues WHERE id = ?1)",
                params![candidate],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(candidate);
            }
        }
    }

    Err(StorageError::Initialization {
        reason: "could not generate unique id".into(),
    })
}

fn custom_list_from_config(conn: &Connection, key: &str) -> Vec<String> {
    get_config_on_conn(conn, key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Resolves an issue's id and validates it, then delegates to [`insert_issue`].
///
/// `prefix_override` replaces the configured prefix outright; `id_prefix`
/// appends to it. Absent either, the issue id is generated with the
/// configured `issue_prefix`.
pub(crate) fn create_issue_on_conn(conn: &Connection, issue: &Issue, actor: &str) -> Result<()> {
    let configured_prefix = get_config_on_conn(conn, "issue_prefix")
        .map_err(|_| StorageError::Initialization {
            reason: "issue_prefix is not configured".into(),
        })?;

    let prefix = if !issue.prefix_override.is_empty() {
        issue.prefix_override.clone()
    } else if !issue.id_prefix.is_empty() {
        format!("{configured_prefix}-{}", issue.id_prefix)
    } else {
        configured_prefix
    };

    let mut resolved = issue.clone();

    if resolved.id.is_empty() {
        resolved.id = generate_unique_id_on_conn(
            conn,
            &prefix,
            &resolved.title,
            &resolved.description,
            actor,
            resolved.created_at,
        )?;
    } else if !resolved.id.starts_with(&format!("{prefix}-")) && resolved.prefix_override.is_empty()
    {
        return Err(StorageError::PrefixMismatch {
            id: resolved.id.clone(),
            prefix,
        });
    }

    // Defensive synthesis: a caller creating an issue already in a terminal
    // state but missing the matching timestamp gets one synthesized rather
    // than rejected, one second past whichever of created_at/updated_at is
    // later so it never reads as earlier than the issue itself.
    if resolved.status == Status::Closed && resolved.closed_at.is_none() {
        resolved.closed_at = Some(synthesize_terminal_timestamp(&resolved));
    }
    if resolved.status == Status::Tombstone && resolved.deleted_at.is_none() {
        resolved.deleted_at = Some(synthesize_terminal_timestamp(&resolved));
    }

    let custom_statuses = custom_list_from_config(conn, "status.custom");
    let custom_statuses_ref: Vec<&str> = custom_statuses.iter().map(String::as_str).collect();
    let custom_types = custom_list_from_config(conn, "types.custom");
    let custom_types_ref: Vec<&str> = custom_types.iter().map(String::as_str).collect();

    validate_with_custom(&resolved, &custom_statuses_ref, &custom_types_ref)
        .map_err(|e| StorageError::validation(e.to_string()))?;

    insert_issue(conn, &resolved, actor)
}

/// One second past whichever of `created_at`/`updated_at` is later.
fn synthesize_terminal_timestamp(issue: &Issue) -> DateTime<Utc> {
    issue.created_at.max(issue.updated_at) + chrono::Duration::seconds(1)
}

// ---------------------------------------------------------------------------
// Issue insert helper (shared between store and transaction)
// ---------------------------------------------------------------------------

/// Inserts a single issue into the database using the provided connection.
pub(crate) fn insert_issue(conn: &Connection, issue: &Issue, actor: &str) -> Result<()> {
    let now = Utc::now();
    let now_str = format_datetime(&now);
    let content_hash = compute_content_hash(issue);

    let metadata_str = issue
        .metadata
        .as_ref()
        .map(|m| m.get().to_string())
        .unwrap_or_else(|| "{}".to_string());
    let waiters_str = serde_json::to_string(&issue.waiters).unwrap_or_else(|_| "[]".to_string());
    let timeout_ns = issue.timeout.map(|d| d.as_nanos() as i64).unwrap_or(0);

    let created_at_str = format_datetime(&issue.created_at);
    let updated_at_str = format_datetime(&issue.updated_at);
    let closed_at_str = issue.closed_at.as_ref().map(format_datetime);
    let deleted_at_str = issue.deleted_at.as_ref().map(format_datetime);
    let compacted_at_str = issue.compacted_at.as_ref().map(format_datetime);
    let last_activity_str = issue.last_activity.as_ref().map(format_datetime);
    let due_at_str = issue.due_at.as_ref().map(format_datetime);
    let defer_until_str = issue.defer_until.as_ref().map(format_datetime);

    conn.execute(
        &format!(
            "INSERT INTO issues ({ISSUE_COLUMNS}) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12, ?13, ?14,
                ?15, ?16, ?17, ?18, ?19, ?20,
                ?21, ?22, ?23, ?24,
                ?25, ?26,
                ?27, ?28,
                ?29,
                ?30, ?31, ?32, ?33,
                ?34,
                ?35, ?36,
                ?37, ?38, ?39, ?40,
                ?41, ?42, ?43, ?44,
                ?45, ?46, ?47, ?48, ?49, ?50,
                ?51, ?52,
                ?53, ?54, ?55, ?56
            )"
        ),
        params![
            issue.id,                              // 1
            content_hash,                          // 2
            issue.title,                           // 3
            issue.description,                     // 4
            issue.design,                          // 5
            issue.acceptance_criteria,             // 6
            issue.notes,                           // 7
            issue.spec_id,                         // 8
            issue.status.as_str(),                 // 9
            issue.priority,                        // 10
            issue.issue_type.as_str(),             // 11
            issue.assignee,                        // 12
            issue.owner,                           // 13
            issue.estimated_minutes,               // 14
            created_at_str,                        // 15
            issue.created_by,                      // 16
            updated_at_str,                        // 17
            closed_at_str,                         // 18
            issue.close_reason,                    // 19
            issue.closed_by_session,               // 20
            deleted_at_str,                        // 21
            issue.deleted_by,                      // 22
            issue.delete_reason,                   // 23
            issue.original_type,                   // 24
            due_at_str,                            // 25
            defer_until_str,                       // 26
            issue.external_ref,                    // 27
            issue.source_system,                   // 28
            metadata_str,                          // 29
            issue.compaction_level,                // 30
            compacted_at_str,                      // 31
            issue.compacted_at_commit,             // 32
            issue.original_size,                   // 33
            issue.source_repo,                     // 34
            issue.sender,                          // 35
            issue.ephemeral as i32,                // 36
            issue.pinned as i32,                   // 37
            issue.is_template as i32,              // 38
            issue.quality_score.map(|v| v as f64), // 39
            issue.crystallizes as i32,             // 40
            issue.await_type,                      // 41
            issue.await_id,                        // 42
            timeout_ns,                            // 43
            waiters_str,                           // 44
            issue.hook_bead,                       // 45
            issue.role_bead,                       // 46
            issue.agent_state.as_str(),            // 47
            last_activity_str,                     // 48
            issue.role_type,                       // 49
            issue.rig,                             // 50
            issue.mol_type.as_str(),               // 51
            issue.work_type.as_str(),              // 52
            issue.event_kind,                      // 53
            issue.actor,                           // 54
            issue.target,                          // 55
            issue.payload,                         // 56
        ],
    )?;

    // Emit "created" event.
    emit_event(
        conn,
        &issue.id,
        EventType::Created,
        actor,
        None,
        None,
        None,
        &now_str,
    )?;
    mark_dirty_on_conn(conn, &issue.id)?;

    Ok(())
}

/// Emits an event row into the events table.
#[allow(clippy::too_many_arguments)]
pub(crate) fn emit_event(
    conn: &Connection,
    issue_id: &str,
    event_type: EventType,
    actor: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
    comment: Option<&str>,
    created_at: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO events (issue_id, event_type, actor, old_value, new_value, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            issue_id,
            event_type.as_str(),
            actor,
            old_value,
            new_value,
            comment,
            created_at,
        ],
    )?;
    Ok(())
}

/// Marks an issue dirty for the next export pass.
pub(crate) fn mark_dirty_on_conn(conn: &Connection, issue_id: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO dirty_issues (issue_id, marked_at) VALUES (?1, ?2)",
        params![issue_id, format_datetime(&Utc::now())],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// SqliteStore issue methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    /// Creates a single issue.
    pub fn create_issue_impl(&self, issue: &Issue, actor: &str) -> Result<()> {
        self.run_with_retry(|| {
            let conn = self.lock_conn()?;
            create_issue_on_conn(&conn, issue, actor)
        })
    }

    /// Creates multiple issues in a single transaction.
    pub fn create_issues_impl(&self, issues: &[Issue], actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        for issue in issues {
            create_issue_on_conn(&tx, issue, actor)?;
        }
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(())
    }

    /// Retrieves an issue by ID.
    pub fn get_issue_impl(&self, id: &str) -> Result<Issue> {
        let conn = self.lock_conn()?;
        get_issue_on_conn(&conn, id)
    }

    /// Retrieves an issue by external reference.
    pub fn get_issue_by_external_ref_impl(&self, external_ref: &str) -> Result<Issue> {
        let conn = self.lock_conn()?;
        let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE external_ref = ?1");
        conn.query_row(&sql, params![external_ref], scan_issue)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    StorageError::not_found("issue", format!("external_ref={external_ref}"))
                }
                other => StorageError::Query(other),
            })
    }

    /// Retrieves multiple issues by their IDs.
    pub fn get_issues_by_ids_impl(&self, ids: &[String]) -> Result<Vec<Issue>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.lock_conn()?;
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id IN ({placeholders})");
        let mut stmt = conn.prepare(&sql)?;
        let params = rusqlite::params_from_iter(ids.iter());
        let rows = stmt.query_map(params, scan_issue)?;
        let mut issues = Vec::new();
        for row in rows {
            issues.push(row?);
        }
        Ok(issues)
    }

    /// Applies partial updates to an issue.
    pub fn update_issue_impl(&self, id: &str, updates: &IssueUpdates, actor: &str) -> Result<()> {
        self.run_with_retry(|| {
            let conn = self.lock_conn()?;
            update_issue_on_conn(&conn, id, updates, actor)
        })
    }

    /// Closes an issue.
    pub fn close_issue_impl(
        &self,
        id: &str,
        reason: &str,
        actor: &str,
        session: &str,
    ) -> Result<()> {
        self.run_with_retry(|| {
            let conn = self.lock_conn()?;
            close_issue_on_conn(&conn, id, reason, actor, session)
        })
    }

    /// Deletes an issue and all its related data (cascading FKs).
    pub fn delete_issue_impl(&self, id: &str) -> Result<()> {
        self.run_with_retry(|| {
            let conn = self.lock_conn()?;
            delete_issue_on_conn(&conn, id)
        })
    }

    /// Searches issues by text query and filter.
    pub fn search_issues_impl(&self, query: &str, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let conn = self.lock_conn()?;
        search_issues_on_conn(&conn, query, filter)
    }

    /// Atomically assigns `actor` to an unassigned issue.
    ///
    /// Implemented as a single compare-and-swap UPDATE rather than a
    /// read-then-write, so concurrent claims from distinct actors never both
    /// succeed.
    pub fn claim_issue_impl(&self, id: &str, actor: &str) -> Result<()> {
        self.run_with_retry(|| {
            let conn = self.lock_conn()?;
            claim_issue_on_conn(&conn, id, actor)
        })
    }
}

fn claim_issue_on_conn(conn: &Connection, id: &str, actor: &str) -> Result<()> {
    let now = Utc::now();
    let now_str = format_datetime(&now);

    let affected = conn.execute(
        "UPDATE issues SET assignee = ?1, status = ?2, updated_at = ?3
         WHERE id = ?4 AND (assignee = '' OR assignee IS NULL)",
        params![actor, Status::InProgress.as_str(), now_str, id],
    )?;

    if affected == 0 {
        let current: Option<String> = conn
            .query_row(
                "SELECT assignee FROM issues WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StorageError::not_found("issue", id),
                other => StorageError::Query(other),
            })?;
        return Err(StorageError::AlreadyClaimed {
            assignee: current.unwrap_or_default(),
        });
    }

    emit_event(
        conn,
        id,
        EventType::Claimed,
        actor,
        None,
        Some(actor),
        None,
        &now_str,
    )?;
    mark_dirty_on_conn(conn, id)?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Connection-level helpers (used by both SqliteStore and Transaction)
// ---------------------------------------------------------------------------

/// Retrieves a single issue by ID on the given connection.
pub(crate) fn get_issue_on_conn(conn: &Connection, id: &str) -> Result<Issue> {
    let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1");
    conn.query_row(&sql, params![id], scan_issue)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StorageError::not_found("issue", id),
            other => StorageError::Query(other),
        })
}

/// Applies partial updates on the given connection.
pub(crate) fn update_issue_on_conn(
    conn: &Connection,
    id: &str,
    updates: &IssueUpdates,
    actor: &str,
) -> Result<()> {
    let now = Utc::now();
    let now_str = format_datetime(&now);

    // Build SET clause dynamically from non-None fields.
    let mut set_clauses: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    macro_rules! add_field {
        ($field:ident, $col:expr) => {
            if let Some(ref val) = updates.$field {
                set_clauses.push(format!("{} = ?", $col));
                param_values.push(Box::new(val.clone()));
            }
        };
    }

    macro_rules! add_bool_field {
        ($field:ident, $col:expr) => {
            if let Some(val) = updates.$field {
                set_clauses.push(format!("{} = ?", $col));
                param_values.push(Box::new(val as i32));
            }
        };
    }

    add_field!(title, "title");
    add_field!(description, "description");
    add_field!(design, "design");
    add_field!(acceptance_criteria, "acceptance_criteria");
    add_field!(notes, "notes");
    add_field!(spec_id, "spec_id");
    add_field!(assignee, "assignee");
    add_field!(owner, "owner");
    add_field!(source_system, "source_system");
    add_field!(close_reason, "close_reason");
    add_field!(closed_by_session, "closed_by_session");
    add_field!(sender, "sender");
    add_field!(mol_type, "mol_type");
    add_field!(work_type, "work_type");
    add_field!(await_type, "await_type");
    add_field!(await_id, "await_id");
    add_field!(hook_bead, "hook_bead");
    add_field!(role_bead, "role_bead");
    add_field!(agent_state, "agent_state");
    add_field!(role_type, "role_type");
    add_field!(rig, "rig");
    add_field!(event_kind, "event_kind");
    add_field!(actor, "actor");
    add_field!(target, "target");
    add_field!(payload, "payload");
    add_field!(deleted_by, "deleted_by");
    add_field!(delete_reason, "delete_reason");
    add_field!(original_type, "original_type");

    // Status transitions auto-manage closed_at/deleted_at: each is set iff
    // the new status is the corresponding terminal state, and cleared
    // otherwise (e.g. reopening a closed issue clears closed_at).
    if let Some(ref status) = updates.status {
        set_clauses.push("status = ?".to_string());
        param_values.push(Box::new(status.as_str().to_string()));

        set_clauses.push("closed_at = ?".to_string());
        param_values.push(Box::new(
            (*status == Status::Closed).then(|| now_str.clone()),
        ));

        set_clauses.push("deleted_at = ?".to_string());
        param_values.push(Box::new(
            (*status == Status::Tombstone).then(|| now_str.clone()),
        ));

        // Defensive tombstone: preserve the pre-tombstone issue_type so it
        // can still be read back afterwards, unless the caller already
        // supplied an explicit original_type of their own.
        if *status == Status::Tombstone && updates.original_type.is_none() {
            let current_type: String = conn
                .query_row(
                    "SELECT issue_type FROM issues WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .map_err(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => StorageError::not_found("issue", id),
                    other => StorageError::Query(other),
                })?;
            set_clauses.push("original_type = ?".to_string());
            param_values.push(Box::new(current_type));
        }
    }
    if let Some(ref issue_type) = updates.issue_type {
        set_clauses.push("issue_type = ?".to_string());
        param_values.push(Box::new(issue_type.as_str().to_string()));
    }
    if let Some(priority) = updates.priority {
        set_clauses.push("priority = ?".to_string());
        param_values.push(Box::new(priority));
    }

    // Option<Option<T>> fields: outer Some means "update", inner Option is the new value.
    if let Some(ref ext) = updates.external_ref {
        set_clauses.push("external_ref = ?".to_string());
        param_values.push(Box::new(ext.clone()));
    }
    if let Some(ref est) = updates.estimated_minutes {
        set_clauses.push("estimated_minutes = ?".to_string());
        param_values.push(Box::new(*est));
    }
    if let Some(ref meta) = updates.metadata {
        set_clauses.push("metadata = ?".to_string());
        param_values.push(Box::new(meta.clone().unwrap_or_else(|| "{}".to_string())));
    }
    if let Some(ref qs) = updates.quality_score {
        set_clauses.push("quality_score = ?".to_string());
        param_values.push(Box::new(qs.map(|v| v as f64)));
    }
    if let Some(ref timeout) = updates.timeout {
        set_clauses.push("timeout_ns = ?".to_string());
        let ns = timeout.map(|d| d.as_nanos() as i64).unwrap_or(0);
        param_values.push(Box::new(ns));
    }
    if let Some(ref waiters) = updates.waiters {
        set_clauses.push("waiters = ?".to_string());
        param_values.push(Box::new(
            serde_json::to_string(waiters).unwrap_or_else(|_| "[]".to_string()),
        ));
    }

    // DateTime Option<Option<DateTime>> fields.
    if let Some(ref deleted) = updates.deleted_at {
        set_clauses.push("deleted_at = ?".to_string());
        param_values.push(Box::new(deleted.as_ref().map(format_datetime)));
    }
    if let Some(ref due) = updates.due_at {
        set_clauses.push("due_at = ?".to_string());
        param_values.push(Box::new(due.as_ref().map(format_datetime)));
    }
    if let Some(ref defer) = updates.defer_until {
        set_clauses.push("defer_until = ?".to_string());
        param_values.push(Box::new(defer.as_ref().map(format_datetime)));
    }
    if let Some(ref la) = updates.last_activity {
        set_clauses.push("last_activity = ?".to_string());
        param_values.push(Box::new(la.as_ref().map(format_datetime)));
    }

    add_bool_field!(pinned, "pinned");
    add_bool_field!(is_template, "is_template");
    add_bool_field!(ephemeral, "ephemeral");
    add_bool_field!(crystallizes, "crystallizes");

    if set_clauses.is_empty() {
        return Ok(()); // Nothing to update.
    }

    // Always update updated_at.
    set_clauses.push("updated_at = ?".to_string());
    param_values.push(Box::new(now_str.clone()));

    let sql = format!("UPDATE issues SET {} WHERE id = ?", set_clauses.join(", "));
    param_values.push(Box::new(id.to_string()));

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();

    let affected = conn.execute(&sql, param_refs.as_slice())?;
    if affected == 0 {
        return Err(StorageError::not_found("issue", id));
    }

    // A status-only (or status-plus-other-fields) update is recorded as a
    // status_changed event carrying the new status; anything else is a
    // generic updated event.
    if let Some(ref status) = updates.status {
        emit_event(
            conn,
            id,
            EventType::StatusChanged,
            actor,
            None,
            Some(status.as_str()),
            None,
            &now_str,
        )?;
    } else {
        emit_event(
            conn,
            id,
            EventType::Updated,
            actor,
            None,
            None,
            None,
            &now_str,
        )?;
    }
    mark_dirty_on_conn(conn, id)?;

    Ok(())
}

/// Closes an issue on the given connection.
pub(crate) fn close_issue_on_conn(
    conn: &Connection,
    id: &str,
    reason: &str,
    actor: &str,
    session: &str,
) -> Result<()> {
    let now = Utc::now();
    let now_str = format_datetime(&now);

    let affected = conn.execute(
        "UPDATE issues SET status = 'closed', closed_at = ?1, close_reason = ?2,
         closed_by_session = ?3, updated_at = ?1 WHERE id = ?4",
        params![now_str, reason, session, id],
    )?;
    if affected == 0 {
        return Err(StorageError::not_found("issue", id));
    }

    emit_event(
        conn,
        id,
        EventType::Closed,
        actor,
        None,
        Some(reason),
        None,
        &now_str,
    )?;
    mark_dirty_on_conn(conn, id)?;

    Ok(())
}

/// Deletes an issue on the given connection.
pub(crate) fn delete_issue_on_conn(conn: &Connection, id: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM issues WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(StorageError::not_found("issue", id));
    }

    // Explicit cleanup of every child table. Foreign keys cascade most of
    // this already; the redundancy keeps the delete correct on backends
    // where the schema lacks those cascades.
    conn.execute(
        "DELETE FROM dependencies WHERE issue_id = ?1 OR depends_on_id = ?1",
        params![id],
    )?;
    conn.execute("DELETE FROM events WHERE issue_id = ?1", params![id])?;
    conn.execute("DELETE FROM comments WHERE issue_id = ?1", params![id])?;
    conn.execute("DELETE FROM labels WHERE issue_id = ?1", params![id])?;
    conn.execute("DELETE FROM dirty_issues WHERE issue_id = ?1", params![id])?;
    conn.execute("DELETE FROM issues WHERE id = ?1", params![id])?;

    Ok(())
}

/// Searches issues on the given connection.
pub(crate) fn search_issues_on_conn(
    conn: &Connection,
    query: &str,
    filter: &IssueFilter,
) -> Result<Vec<Issue>> {
    let mut where_clauses: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1;

    // Full-text search across title, description, notes.
    if !query.is_empty() {
        where_clauses.push(format!(
            "(title LIKE ?{pi} OR description LIKE ?{pi} OR notes LIKE ?{pi})",
            pi = param_idx
        ));
        param_values.push(Box::new(format!("%{query}%")));
        param_idx += 1;
    }

    // Filter fields.
    if let Some(ref status) = filter.status {
        where_clauses.push(format!("status = ?{param_idx}"));
        param_values.push(Box::new(status.as_str().to_string()));
        param_idx += 1;
    }
    if let Some(priority) = filter.priority {
        where_clauses.push(format!("priority = ?{param_idx}"));
        param_values.push(Box::new(priority));
        param_idx += 1;
    }
    if let Some(ref issue_type) = filter.issue_type {
        where_clauses.push(format!("issue_type = ?{param_idx}"));
        param_values.push(Box::new(issue_type.as_str().to_string()));
        param_idx += 1;
    }
    if let Some(ref assignee) = filter.assignee {
        where_clauses.push(format!("assignee = ?{param_idx}"));
        param_values.push(Box::new(assignee.clone()));
        param_idx += 1;
    }
    if let Some(ref title_contains) = filter.title_contains {
        where_clauses.push(format!("title LIKE ?{param_idx}"));
        param_values.push(Box::new(format!("%{title_contains}%")));
        param_idx += 1;
    }
    if let Some(ref desc_contains) = filter.description_contains {
        where_clauses.push(format!("description LIKE ?{param_idx}"));
        param_values.push(Box::new(format!("%{desc_contains}%")));
        param_idx += 1;
    }
    if let Some(ref notes_contains) = filter.notes_contains {
        where_clauses.push(format!("notes LIKE ?{param_idx}"));
        param_values.push(Box::new(format!("%{notes_contains}%")));
        param_idx += 1;
    }
    if let Some(ref created_after) = filter.created_after {
        where_clauses.push(format!("created_at >= ?{param_idx}"));
        param_values.push(Box::new(format_datetime(created_after)));
        param_idx += 1;
    }
    if let Some(ref created_before) = filter.created_before {
        where_clauses.push(format!("created_at <= ?{param_idx}"));
        param_values.push(Box::new(format_datetime(created_before)));
        param_idx += 1;
    }
    if let Some(ref updated_after) = filter.updated_after {
        where_clauses.push(format!("updated_at >= ?{param_idx}"));
        param_values.push(Box::new(format_datetime(updated_after)));
        param_idx += 1;
    }
    if let Some(ref updated_before) = filter.updated_before {
        where_clauses.push(format!("updated_at <= ?{param_idx}"));
        param_values.push(Box::new(format_datetime(updated_before)));
        param_idx += 1;
    }
    if filter.no_assignee {
        where_clauses.push("(assignee IS NULL OR assignee = '')".to_string());
    }
    if filter.empty_description {
        where_clauses.push("(description IS NULL OR description = '')".to_string());
    }
    if let Some(ref id_prefix) = filter.id_prefix {
        where_clauses.push(format!("id LIKE ?{param_idx}"));
        param_values.push(Box::new(format!("{id_prefix}%")));
        param_idx += 1;
    }
    if let Some(ref spec_prefix) = filter.spec_id_prefix {
        where_clauses.push(format!("spec_id LIKE ?{param_idx}"));
        param_values.push(Box::new(format!("{spec_prefix}%")));
        param_idx += 1;
    }
    if let Some(ephemeral) = filter.ephemeral {
        where_clauses.push(format!("ephemeral = ?{param_idx}"));
        param_values.push(Box::new(ephemeral as i32));
        param_idx += 1;
    }
    if let Some(pinned) = filter.pinned {
        where_clauses.push(format!("pinned = ?{param_idx}"));
        param_values.push(Box::new(pinned as i32));
        param_idx += 1;
    }
    if let Some(is_template) = filter.is_template {
        where_clauses.push(format!("is_template = ?{param_idx}"));
        param_values.push(Box::new(is_template as i32));
        param_idx += 1;
    }
    if let Some(ref mol_type) = filter.mol_type {
        where_clauses.push(format!("mol_type = ?{param_idx}"));
        param_values.push(Box::new(mol_type.as_str().to_string()));
        param_idx += 1;
    }
    if let Some(ref source_repo) = filter.source_repo {
        where_clauses.push(format!("source_repo = ?{param_idx}"));
        param_values.push(Box::new(source_repo.clone()));
        param_idx += 1;
    }
    if let Some(min) = filter.priority_min {
        where_clauses.push(format!("priority >= ?{param_idx}"));
        param_values.push(Box::new(min));
        param_idx += 1;
    }
    if let Some(max) = filter.priority_max {
        where_clauses.push(format!("priority <= ?{param_idx}"));
        param_values.push(Box::new(max));
        param_idx += 1;
    }
    if let Some(ref due_after) = filter.due_after {
        where_clauses.push(format!("due_at >= ?{param_idx}"));
        param_values.push(Box::new(format_datetime(due_after)));
        param_idx += 1;
    }
    if let Some(ref due_before) = filter.due_before {
        where_clauses.push(format!("due_at <= ?{param_idx}"));
        param_values.push(Box::new(format_datetime(due_before)));
        param_idx += 1;
    }
    if filter.overdue {
        where_clauses.push(format!("(due_at IS NOT NULL AND due_at < ?{param_idx} AND status != 'closed')"));
        param_values.push(Box::new(format_datetime(&Utc::now())));
        param_idx += 1;
    }

    // Exclude statuses.
    for status in &filter.exclude_status {
        where_clauses.push(format!("status != ?{param_idx}"));
        param_values.push(Box::new(status.as_str().to_string()));
        param_idx += 1;
    }
    // Exclude types.
    for itype in &filter.exclude_types {
        where_clauses.push(format!("issue_type != ?{param_idx}"));
        param_values.push(Box::new(itype.as_str().to_string()));
        param_idx += 1;
    }

    // Filter by specific IDs.
    if !filter.ids.is_empty() {
        let placeholders: Vec<String> = filter
            .ids
            .iter()
            .enumerate()
            .map(|(i, _)| format!("?{}", param_idx + i))
            .collect();
        where_clauses.push(format!("id IN ({})", placeholders.join(",")));
        for id in &filter.ids {
            param_values.push(Box::new(id.clone()));
        }
        param_idx += filter.ids.len();
    }

    // Labels AND.
    for label in &filter.labels {
        where_clauses.push(format!(
            "EXISTS (SELECT 1 FROM labels WHERE labels.issue_id = issues.id AND labels.label = ?{param_idx})"
        ));
        param_values.push(Box::new(label.clone()));
        param_idx += 1;
    }

    // Labels OR.
    if !filter.labels_any.is_empty() {
        let placeholders: Vec<String> = filter
            .labels_any
            .iter()
            .enumerate()
            .map(|(i, _)| format!("?{}", param_idx + i))
            .collect();
        where_clauses.push(format!(
            "EXISTS (SELECT 1 FROM labels WHERE labels.issue_id = issues.id AND labels.label IN ({}))",
            placeholders.join(",")
        ));
        for label in &filter.labels_any {
            param_values.push(Box::new(label.clone()));
        }
        param_idx += filter.labels_any.len();
    }

    // No labels.
    if filter.no_labels {
        where_clauses.push(
            "NOT EXISTS (SELECT 1 FROM labels WHERE labels.issue_id = issues.id)".to_string(),
        );
    }

    // Build final SQL.
    let where_sql = if where_clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", where_clauses.join(" AND "))
    };

    let limit_sql = filter
        .limit
        .map(|l| format!(" LIMIT {l}"))
        .unwrap_or_default();

    let sql = format!(
        "SELECT {ISSUE_COLUMNS} FROM issues {where_sql} ORDER BY created_at DESC{limit_sql}"
    );

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), scan_issue)?;

    let mut issues = Vec::new();
    for row in rows {
        issues.push(row?);
    }

    // Suppress the "unused" warning for param_idx.
    let _ = param_idx;

    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::store::SqliteStore;
    use issuedb_core::issue::IssueBuilder;

    fn test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn create_and_get_issue() {
        let store = test_store();
        let issue = IssueBuilder::new("Test issue")
            .id("bd-test1")
            .description("A test description")
            .priority(2)
            .build();

        store.create_issue_impl(&issue, "alice").unwrap();

        let got = store.get_issue_impl("bd-test1").unwrap();
        assert_eq!(got.title, "Test issue");
        assert_eq!(got.description, "A test description");
        assert_eq!(got.priority, 2);
        assert!(!got.content_hash.is_empty());
    }

    #[test]
    fn create_without_id_generates_one_under_configured_prefix() {
        let store = test_store();
        let issue = IssueBuilder::new("Auto-id issue").build();

        store.create_issue_impl(&issue, "alice").unwrap();

        let got = store.search_issues_impl("Auto-id issue", &IssueFilter::default()).unwrap();
        assert_eq!(got.len(), 1);
        assert!(got[0].id.starts_with("bd-"));
    }

    #[test]
    fn create_with_mismatched_prefix_is_rejected() {
        let store = test_store();
        let issue = IssueBuilder::new("Wrong prefix").id("zz-wrong1").build();

        let err = store.create_issue_impl(&issue, "alice").unwrap_err();
        match err {
            StorageError::PrefixMismatch { id, prefix } => {
                assert_eq!(id, "zz-wrong1");
                assert_eq!(prefix, "bd");
            }
            other => panic!("expected PrefixMismatch, got {other:?}"),
        }
    }

    #[test]
    fn get_nonexistent_issue_returns_not_found() {
        let store = test_store();
        let err = store.get_issue_impl("bd-nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn update_issue_partial() {
        let store = test_store();
        let issue = IssueBuilder::new("Original title").id("bd-upd1").build();
        store.create_issue_impl(&issue, "alice").unwrap();

        let updates = IssueUpdates {
            title: Some("Updated title".into()),
            priority: Some(3),
            ..Default::default()
        };
        store.update_issue_impl("bd-upd1", &updates, "bob").unwrap();

        let got = store.get_issue_impl("bd-upd1").unwrap();
        assert_eq!(got.title, "Updated title");
        assert_eq!(got.priority, 3);
    }

    #[test]
    fn close_issue() {
        let store = test_store();
        let issue = IssueBuilder::new("To close").id("bd-close1").build();
        store.create_issue_impl(&issue, "alice").unwrap();

        store
            .close_issue_impl("bd-close1", "completed", "alice", "session-1")
            .unwrap();

        let got = store.get_issue_impl("bd-close1").unwrap();
        assert_eq!(got.status, Status::Closed);
        assert!(got.closed_at.is_some());
        assert_eq!(got.close_reason, "completed");
    }

    #[test]
    fn delete_issue() {
        let store = test_store();
        let issue = IssueBuilder::new("To delete").id("bd-del1").build();
        store.create_issue_impl(&issue, "alice").unwrap();

        store.delete_issue_impl("bd-del1").unwrap();

        let err = store.get_issue_impl("bd-del1").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn search_issues_by_text() {
        let store = test_store();
        let issue1 = IssueBuilder::new("Fix login bug")
            .id("bd-s1")
            .description("Users cannot log in")
            .build();
        let issue2 = IssueBuilder::new("Add dashboard")
            .id("bd-s2")
            .description("New dashboard feature")
            .build();
        store.create_issue_impl(&issue1, "alice").unwrap();
        store.create_issue_impl(&issue2, "alice").unwrap();

        let results = store
            .search_issues_impl("login", &IssueFilter::default())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "bd-s1");
    }

    #[test]
    fn search_issues_by_status_filter() {
        let store = test_store();
        let issue1 = IssueBuilder::new("Open issue")
            .id("bd-sf1")
            .status(Status::Open)
            .build();
        let issue2 = IssueBuilder::new("Closed issue")
            .id("bd-sf2")
            .status(Status::Closed)
            .closed_at(Utc::now())
            .build();
        store.create_issue_impl(&issue1, "alice").unwrap();
        store.create_issue_impl(&issue2, "alice").unwrap();

        let filter = IssueFilter {
            status: Some(Status::Open),
            ..Default::default()
        };
        let results = store.search_issues_impl("", &filter).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "bd-sf1");
    }

    #[test]
    fn claim_unassigned_issue() {
        let store = test_store();
        let issue = IssueBuilder::new("Unclaimed").id("bd-cl1").build();
        store.create_issue_impl(&issue, "alice").unwrap();

        store.claim_issue_impl("bd-cl1", "alice").unwrap();

        let got = store.get_issue_impl("bd-cl1").unwrap();
        assert_eq!(got.assignee, "alice");
        assert_eq!(got.status, Status::InProgress);
    }

    #[test]
    fn claim_already_claimed_issue_fails() {
        let store = test_store();
        let issue = IssueBuilder::new("Claimed").id("bd-cl2").build();
        store.create_issue_impl(&issue, "alice").unwrap();
        store.claim_issue_impl("bd-cl2", "alice").unwrap();

        let err = store.claim_issue_impl("bd-cl2", "bob").unwrap_err();
        match err {
            StorageError::AlreadyClaimed { assignee } => assert_eq!(assignee, "alice"),
            other => panic!("expected AlreadyClaimed, got {other:?}"),
        }
    }

    #[test]
    fn concurrent_claim_exactly_one_winner() {
        let store = test_store();
        let issue = IssueBuilder::new("Contested").id("bd-cl3").build();
        store.create_issue_impl(&issue, "alice").unwrap();

        let (alice_result, bob_result) = std::thread::scope(|scope| {
            let a = scope.spawn(|| store.claim_issue_impl("bd-cl3", "alice"));
            let b = scope.spawn(|| store.claim_issue_impl("bd-cl3", "bob"));
            (a.join().unwrap(), b.join().unwrap())
        });

        assert_ne!(alice_result.is_ok(), bob_result.is_ok());

        let got = store.get_issue_impl("bd-cl3").unwrap();
        assert_eq!(got.status, Status::InProgress);
        assert!(got.assignee == "alice" || got.assignee == "bob");
    }
}
