//! Dependency CRUD operations and cycle detection for [`SqliteStore`].

use std::collections::{HashSet, VecDeque};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use issuedb_core::dependency::Dependency;
use issuedb_core::enums::{DependencyType, EventType};
use issuedb_core::issue::Issue;

use crate::error::{Result, StorageError};
use crate::sqlite::issues::{
    emit_event, format_datetime, mark_dirty_on_conn, scan_issue, ISSUE_COLUMNS_PREFIXED,
};
use crate::sqlite::store::SqliteStore;
use crate::traits::DeleteIssuesOptions;
use crate::traits::DeleteIssuesReport;
use crate::traits::IssueWithDependencyMetadata;
use crate::traits::TreeNode;

// ---------------------------------------------------------------------------
// Connection-level helpers
// ---------------------------------------------------------------------------

/// Prefix marking a `depends_on_id` as a reference outside the local store.
/// No referential integrity check applies to edges bearing it.
const EXTERNAL_PREFIX: &str = "external:";

/// Returns `true` if an issue with the given id exists.
fn issue_exists_on_conn(conn: &Connection, id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM issues WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

/// Inserts a dependency on the given connection, with cycle detection for
/// blocking types.
pub(crate) fn add_dependency_on_conn(
    conn: &Connection,
    dep: &Dependency,
    actor: &str,
) -> Result<()> {
    if !issue_exists_on_conn(conn, &dep.issue_id)? {
        return Err(StorageError::Orphan {
            entity: "dependency".into(),
            id: dep.issue_id.clone(),
            target: dep.issue_id.clone(),
        });
    }
    let depends_on_is_external = dep.depends_on_id.starts_with(EXTERNAL_PREFIX);
    if !depends_on_is_external && !issue_exists_on_conn(conn, &dep.depends_on_id)? {
        return Err(StorageError::Orphan {
            entity: "dependency".into(),
            id: dep.issue_id.clone(),
            target: dep.depends_on_id.clone(),
        });
    }

    // Cycle detection only applies to the `blocks` subgraph. Other edge
    // types (parent-child, waits-for, relates-to, ...) may legitimately form
    // cycles or reciprocal pairs.
    if dep.dep_type == DependencyType::Blocks {
        detect_cycle(conn, &dep.issue_id, &dep.depends_on_id)?;
    }

    let now = Utc::now();
    let now_str = format_datetime(&now);
    let created_at_str = format_datetime(&dep.created_at);

    conn.execute(
        "INSERT OR REPLACE INTO dependencies
         (issue_id, depends_on_id, type, created_at, created_by, metadata, thread_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            dep.issue_id,
            dep.depends_on_id,
            dep.dep_type.as_str(),
            created_at_str,
            dep.created_by,
            dep.metadata,
            dep.thread_id,
        ],
    )?;

    // Emit event on the source issue.
    emit_event(
        conn,
        &dep.issue_id,
        EventType::DependencyAdded,
        actor,
        None,
        Some(&dep.depends_on_id),
        Some(dep.dep_type.as_str()),
        &now_str,
    )?;
    mark_dirty_on_conn(conn, &dep.issue_id)?;
    if !depends_on_is_external {
        mark_dirty_on_conn(conn, &dep.depends_on_id)?;
    }

    Ok(())
}

/// Removes a dependency on the given connection.
pub(crate) fn remove_dependency_on_conn(
    conn: &Connection,
    issue_id: &str,
    depends_on_id: &str,
    actor: &str,
) -> Result<()> {
    let now = Utc::now();
    let now_str = format_datetime(&now);

    let affected = conn.execute(
        "DELETE FROM dependencies WHERE issue_id = ?1 AND depends_on_id = ?2",
        params![issue_id, depends_on_id],
    )?;

    // Removing a dependency that does not exist is a silent no-op: no event,
    // no dirty-mark.
    if affected == 0 {
        return Ok(());
    }

    emit_event(
        conn,
        issue_id,
        EventType::DependencyRemoved,
        actor,
        Some(depends_on_id),
        None,
        None,
        &now_str,
    )?;
    mark_dirty_on_conn(conn, issue_id)?;
    if !depends_on_id.starts_with(EXTERNAL_PREFIX) {
        mark_dirty_on_conn(conn, depends_on_id)?;
    }

    Ok(())
}

/// Returns raw dependency records for an issue on the given connection.
pub(crate) fn get_dependency_records_on_conn(
    conn: &Connection,
    issue_id: &str,
) -> Result<Vec<Dependency>> {
    let mut stmt = conn.prepare(
        "SELECT issue_id, depends_on_id, type, created_at, created_by, metadata, thread_id
         FROM dependencies WHERE issue_id = ?1",
    )?;
    let rows = stmt.query_map(params![issue_id], |row| {
        Ok(Dependency {
            issue_id: row.get("issue_id")?,
            depends_on_id: row.get("depends_on_id")?,
            dep_type: DependencyType::from(row.get::<_, String>("type")?.as_str()),
            created_at: crate::sqlite::issues::parse_datetime(&row.get::<_, String>("created_at")?),
            created_by: row.get("created_by")?,
            metadata: row.get("metadata")?,
            thread_id: row.get("thread_id")?,
        })
    })?;

    let mut deps = Vec::new();
    for row in rows {
        deps.push(row?);
    }
    Ok(deps)
}

/// Safety cap on the number of ids a cascading delete will discover before
/// aborting as a pathological traversal.
const CASCADE_DISCOVERY_CAP: usize = 10_000;
/// Batch size for the delete itself: large `IN (...)` parameter lists hang
/// the single-writer embedded engine.
const DELETE_BATCH_SIZE: usize = 50;

/// Resolves and executes a batched, optionally cascading delete.
pub(crate) fn delete_issues_on_conn(
    conn: &Connection,
    ids: &[String],
    options: &DeleteIssuesOptions,
    actor: &str,
) -> Result<DeleteIssuesReport> {
    let mut working_set: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for id in ids {
        if seen.insert(id.clone()) {
            working_set.push(id.clone());
        }
    }

    if options.cascade {
        let mut queue: VecDeque<String> = working_set.clone().into();
        while let Some(current) = queue.pop_front() {
            if working_set.len() >= CASCADE_DISCOVERY_CAP {
                return Err(StorageError::validation(format!(
                    "cascade delete discovered more than {CASCADE_DISCOVERY_CAP} issues, aborting"
                )));
            }
            let mut stmt =
                conn.prepare_cached("SELECT issue_id FROM dependencies WHERE depends_on_id = ?1")?;
            let dependents: Vec<String> = stmt
                .query_map(params![current], |row| row.get(0))?
                .collect::<rusqlite::Result<_>>()?;
            for dep_id in dependents {
                if seen.insert(dep_id.clone()) {
                    working_set.push(dep_id.clone());
                    queue.push_back(dep_id);
                }
            }
        }
    } else if !options.force {
        for id in &working_set {
            let mut stmt =
                conn.prepare_cached("SELECT issue_id FROM dependencies WHERE depends_on_id = ?1")?;
            let external: Vec<String> = stmt
                .query_map(params![id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?
                .into_iter()
                .filter(|d| !seen.contains(d))
                .collect();
            if !external.is_empty() {
                return Err(StorageError::validation(format!(
                    "issue {id} is still depended on by {} (use cascade or force)",
                    external.join(", ")
                )));
            }
        }
    }

    // Statistics pass: one query over rows touching the working set, counted
    // exactly once even when both endpoints fall inside it.
    let placeholders = working_set.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let mut dependencies_count: i64 = 0;
    let mut orphan_set: HashSet<String> = HashSet::new();
    if !working_set.is_empty() {
        let sql = format!(
            "SELECT DISTINCT issue_id, depends_on_id FROM dependencies
             WHERE issue_id IN ({placeholders}) OR depends_on_id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let chained = working_set.iter().chain(working_set.iter());
        let rows = stmt.query_map(rusqlite::params_from_iter(chained), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (src, dst) = row?;
            dependencies_count += 1;
            if seen.contains(&dst) && !seen.contains(&src) {
                orphan_set.insert(src);
            }
        }
    }
    let orphaned_issues: Vec<String> = orphan_set.into_iter().collect();

    if options.dry_run {
        return Ok(DeleteIssuesReport {
            deleted_count: working_set.len() as i64,
            dependencies_count,
            orphaned_issues,
        });
    }

    let mut deleted_count: i64 = 0;
    let now_str = format_datetime(&Utc::now());
    for chunk in working_set.chunks(DELETE_BATCH_SIZE) {
        // Inbound edges have no FK cascade on `depends_on_id`; drop them
        // explicitly before removing the issue rows.
        let chunk_placeholders = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        conn.execute(
            &format!("DELETE FROM dependencies WHERE depends_on_id IN ({chunk_placeholders})"),
            rusqlite::params_from_iter(chunk.iter()),
        )?;

        for id in chunk {
            emit_event(
                conn,
                id,
                EventType::Deleted,
                actor,
                None,
                None,
                None,
                &now_str,
            )?;
        }

        let affected = conn.execute(
            &format!("DELETE FROM issues WHERE id IN ({chunk_placeholders})"),
            rusqlite::params_from_iter(chunk.iter()),
        )?;
        deleted_count += affected as i64;
    }

    Ok(DeleteIssuesReport {
        deleted_count,
        dependencies_count,
        orphaned_issues,
    })
}

// ---------------------------------------------------------------------------
// Cycle detection
// ---------------------------------------------------------------------------

/// Detects whether adding an edge `issue_id -> depends_on_id` would create a
/// cycle in the blocking dependency graph. Uses BFS from `depends_on_id` to
/// see if `issue_id` is reachable.
fn detect_cycle(conn: &Connection, issue_id: &str, depends_on_id: &str) -> Result<()> {
    // If adding A depends-on B, check that B does not already (transitively)
    // depend on A. We BFS from B through the "blocks" graph.
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(depends_on_id.to_string());

    while let Some(current) = queue.pop_front() {
        if current == issue_id {
            return Err(StorageError::CycleDetected);
        }
        if !visited.insert(current.clone()) {
            continue;
        }
        // Follow outgoing `blocks` edges from `current` only.
        let mut stmt = conn.prepare_cached(
            "SELECT depends_on_id FROM dependencies WHERE issue_id = ?1 AND type = 'blocks'",
        )?;
        let rows = stmt.query_map(params![current], |row| {
            row.get::<_, String>(0)
        })?;
        for row in rows {
            let next = row?;
            if !visited.contains(&next) {
                queue.push_back(next);
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    /// Adds a dependency edge.
    pub fn add_dependency_impl(&self, dep: &Dependency, actor: &str) -> Result<()> {
        self.run_with_retry(|| {
            let conn = self.lock_conn()?;
            add_dependency_on_conn(&conn, dep, actor)
        })
    }

    /// Batched cascading/orphaning delete over the dependency graph.
    pub fn delete_issues_impl(
        &self,
        ids: &[String],
        options: &DeleteIssuesOptions,
        actor: &str,
    ) -> Result<DeleteIssuesReport> {
        self.run_with_retry(|| {
            let conn = self.lock_conn()?;
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
            let report = delete_issues_on_conn(&tx, ids, options, actor)?;
            if !options.dry_run {
                tx.commit()
                    .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
            }
            Ok(report)
        })
    }

    /// Removes a dependency edge.
    pub fn remove_dependency_impl(
        &self,
        issue_id: &str,
        depends_on_id: &str,
        actor: &str,
    ) -> Result<()> {
        self.run_with_retry(|| {
            let conn = self.lock_conn()?;
            remove_dependency_on_conn(&conn, issue_id, depends_on_id, actor)
        })
    }

    /// Returns issues that the given issue depends on.
    pub fn get_dependencies_impl(&self, issue_id: &str) -> Result<Vec<Issue>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT {ISSUE_COLUMNS_PREFIXED} FROM issues
             INNER JOIN dependencies d ON issues.id = d.depends_on_id
             WHERE d.issue_id = ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![issue_id], scan_issue)?;
        let mut issues = Vec::new();
        for row in rows {
            issues.push(row?);
        }
        Ok(issues)
    }

    /// Returns issues that depend on the given issue.
    pub fn get_dependents_impl(&self, issue_id: &str) -> Result<Vec<Issue>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT {ISSUE_COLUMNS_PREFIXED} FROM issues
             INNER JOIN dependencies d ON issues.id = d.issue_id
             WHERE d.depends_on_id = ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![issue_id], scan_issue)?;
        let mut issues = Vec::new();
        for row in rows {
            issues.push(row?);
        }
        Ok(issues)
    }

    /// Returns dependencies with their edge metadata.
    pub fn get_dependencies_with_metadata_impl(
        &self,
        issue_id: &str,
    ) -> Result<Vec<IssueWithDependencyMetadata>> {
        let conn = self.lock_conn()?;
        get_deps_with_metadata(&conn, issue_id, true)
    }

    /// Returns dependents with their edge metadata.
    pub fn get_dependents_with_metadata_impl(
        &self,
        issue_id: &str,
    ) -> Result<Vec<IssueWithDependencyMetadata>> {
        let conn = self.lock_conn()?;
        get_deps_with_metadata(&conn, issue_id, false)
    }

    /// Traverses the dependency tree from a root issue.
    pub fn get_dependency_tree_impl(
        &self,
        issue_id: &str,
        max_depth: i32,
        _show_all_paths: bool,
        reverse: bool,
    ) -> Result<Vec<TreeNode>> {
        let conn = self.lock_conn()?;

        let mut result = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, i32, DependencyType)> = VecDeque::new();

        // Start with the root.
        let root = crate::sqlite::issues::get_issue_on_conn(&conn, issue_id)?;
        result.push(TreeNode {
            issue: root,
            depth: 0,
            dep_type: DependencyType::Blocks,
            reverse,
        });
        visited.insert(issue_id.to_string());
        queue.push_back((issue_id.to_string(), 0, DependencyType::Blocks));

        while let Some((current_id, depth, _)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }

            // Get adjacent edges.
            let (sql, param) = if reverse {
                (
                    "SELECT d.issue_id, d.type FROM dependencies d WHERE d.depends_on_id = ?1",
                    current_id.clone(),
                )
            } else {
                (
                    "SELECT d.depends_on_id, d.type FROM dependencies d WHERE d.issue_id = ?1",
                    current_id.clone(),
                )
            };

            let mut stmt = conn.prepare(sql)?;
            let edges: Vec<(String, String)> = stmt
                .query_map(params![param], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .filter_map(|r| r.ok())
                .collect();

            for (next_id, dep_type_str) in edges {
                if visited.contains(&next_id) {
                    continue;
                }
                visited.insert(next_id.clone());

                if let Ok(issue) = crate::sqlite::issues::get_issue_on_conn(&conn, &next_id) {
                    let dep_type = DependencyType::from(dep_type_str.as_str());
                    result.push(TreeNode {
                        issue,
                        depth: depth + 1,
                        dep_type: dep_type.clone(),
                        reverse,
                    });
                    queue.push_back((next_id, depth + 1, dep_type));
                }
            }
        }

        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Returns issues with their dependency edge metadata.
///
/// `forward=true` means "get dependencies of `issue_id`" (issue_id is the source).
/// `forward=false` means "get dependents of `issue_id`" (issue_id is the target).
fn get_deps_with_metadata(
    conn: &Connection,
    issue_id: &str,
    forward: bool,
) -> Result<Vec<IssueWithDependencyMetadata>> {
    let (join_col, filter_col) = if forward {
        ("depends_on_id", "issue_id")
    } else {
        ("issue_id", "depends_on_id")
    };

    let sql = format!(
        "SELECT {ISSUE_COLUMNS_PREFIXED},
                d.issue_id AS dep_issue_id,
                d.depends_on_id AS dep_depends_on_id,
                d.type AS dep_type,
                d.created_at AS dep_created_at,
                d.created_by AS dep_created_by,
                d.metadata AS dep_metadata,
                d.thread_id AS dep_thread_id
         FROM issues
         INNER JOIN dependencies d ON issues.id = d.{join_col}
         WHERE d.{filter_col} = ?1"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![issue_id], |row| {
        let issue = scan_issue(row)?;
        let dep = Dependency {
            issue_id: row.get("dep_issue_id")?,
            depends_on_id: row.get("dep_depends_on_id")?,
            dep_type: DependencyType::from(
                row.get::<_, String>("dep_type")?.as_str(),
            ),
            created_at: crate::sqlite::issues::parse_datetime(
                &row.get::<_, String>("dep_created_at")?,
            ),
            created_by: row.get("dep_created_by")?,
            metadata: row.get("dep_metadata")?,
            thread_id: row.get("dep_thread_id")?,
        };
        Ok(IssueWithDependencyMetadata {
            issue,
            dependency: dep,
        })
    })?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row?);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuedb_core::issue::IssueBuilder;

    fn test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn make_dep(issue_id: &str, depends_on_id: &str) -> Dependency {
        Dependency {
            issue_id: issue_id.into(),
            depends_on_id: depends_on_id.into(),
            dep_type: DependencyType::Blocks,
            created_at: Utc::now(),
            created_by: "test".into(),
            metadata: String::new(),
            thread_id: String::new(),
        }
    }

    #[test]
    fn add_and_get_dependency() {
        let store = test_store();
        let issue1 = IssueBuilder::new("Parent").id("bd-p1").build();
        let issue2 = IssueBuilder::new("Child").id("bd-c1").build();
        store.create_issue_impl(&issue1, "alice").unwrap();
        store.create_issue_impl(&issue2, "alice").unwrap();

        let dep = make_dep("bd-c1", "bd-p1");
        store.add_dependency_impl(&dep, "alice").unwrap();

        let deps = store.get_dependencies_impl("bd-c1").unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].id, "bd-p1");

        let dependents = store.get_dependents_impl("bd-p1").unwrap();
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].id, "bd-c1");
    }

    #[test]
    fn remove_dependency() {
        let store = test_store();
        let issue1 = IssueBuilder::new("A").id("bd-a1").build();
        let issue2 = IssueBuilder::new("B").id("bd-b1").build();
        store.create_issue_impl(&issue1, "alice").unwrap();
        store.create_issue_impl(&issue2, "alice").unwrap();

        let dep = make_dep("bd-b1", "bd-a1");
        store.add_dependency_impl(&dep, "alice").unwrap();
        store
            .remove_dependency_impl("bd-b1", "bd-a1", "alice")
            .unwrap();

        let deps = store.get_dependencies_impl("bd-b1").unwrap();
        assert!(deps.is_empty());
    }

    #[test]
    fn cycle_detection() {
        let store = test_store();
        let issue1 = IssueBuilder::new("A").id("bd-cy1").build();
        let issue2 = IssueBuilder::new("B").id("bd-cy2").build();
        let issue3 = IssueBuilder::new("C").id("bd-cy3").build();
        store.create_issue_impl(&issue1, "alice").unwrap();
        store.create_issue_impl(&issue2, "alice").unwrap();
        store.create_issue_impl(&issue3, "alice").unwrap();

        // A -> B -> C
        store
            .add_dependency_impl(&make_dep("bd-cy1", "bd-cy2"), "alice")
            .unwrap();
        store
            .add_dependency_impl(&make_dep("bd-cy2", "bd-cy3"), "alice")
            .unwrap();

        // C -> A would create a cycle.
        let err = store
            .add_dependency_impl(&make_dep("bd-cy3", "bd-cy1"), "alice")
            .unwrap_err();
        assert!(matches!(err, StorageError::CycleDetected));
    }

    #[test]
    fn delete_issues_cascade_follows_chain() {
        let store = test_store();
        // x-1 <- x-2 <- ... <- x-100, each x-{i+1} blocks-depends on x-i.
        for i in 1..=100 {
            let issue = IssueBuilder::new(format!("x{i}"))
                .id(format!("bd-x{i}"))
                .build();
            store.create_issue_impl(&issue, "alice").unwrap();
        }
        for i in 1..100 {
            store
                .add_dependency_impl(&make_dep(&format!("bd-x{}", i + 1), &format!("bd-x{i}")), "alice")
                .unwrap();
        }

        let report = store
            .delete_issues_impl(
                &["bd-x1".to_string()],
                &DeleteIssuesOptions {
                    cascade: true,
                    ..Default::default()
                },
                "alice",
            )
            .unwrap();

        assert_eq!(report.deleted_count, 100);
        assert!(report.dependencies_count >= 99);
        for i in 1..=100 {
            assert!(store.get_issue_impl(&format!("bd-x{i}")).unwrap_err().is_not_found());
        }
    }

    #[test]
    fn delete_issues_strict_rejects_external_dependent() {
        let store = test_store();
        let p = IssueBuilder::new("Parent").id("bd-dp1").build();
        let c = IssueBuilder::new("Child").id("bd-dc1").build();
        store.create_issue_impl(&p, "alice").unwrap();
        store.create_issue_impl(&c, "alice").unwrap();
        store
            .add_dependency_impl(&make_dep("bd-dc1", "bd-dp1"), "alice")
            .unwrap();

        let err = store
            .delete_issues_impl(
                &["bd-dp1".to_string()],
                &DeleteIssuesOptions::default(),
                "alice",
            )
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation { .. }));

        assert!(store.get_issue_impl("bd-dp1").is_ok());
        assert!(store.get_issue_impl("bd-dc1").is_ok());
    }

    #[test]
    fn delete_issues_force_reports_orphans() {
        let store = test_store();
        let p = IssueBuilder::new("Parent").id("bd-fp1").build();
        let c = IssueBuilder::new("Child").id("bd-fc1").build();
        store.create_issue_impl(&p, "alice").unwrap();
        store.create_issue_impl(&c, "alice").unwrap();
        store
            .add_dependency_impl(&make_dep("bd-fc1", "bd-fp1"), "alice")
            .unwrap();

        let report = store
            .delete_issues_impl(
                &["bd-fp1".to_string()],
                &DeleteIssuesOptions {
                    force: true,
                    ..Default::default()
                },
                "alice",
            )
            .unwrap();

        assert_eq!(report.deleted_count, 1);
        assert_eq!(report.orphaned_issues, vec!["bd-fc1".to_string()]);
        assert!(store.get_issue_impl("bd-fp1").unwrap_err().is_not_found());
        assert!(store.get_issue_impl("bd-fc1").is_ok());
    }
}
