//! Decision point CRUD operations for [`SqliteStore`].

use chrono::Utc;
use rusqlite::{Connection, Row, params};

use issuedb_core::decision::{DecisionPoint, DecisionPointResponse, NewDecisionPoint};

use crate::error::{Result, StorageError};
use crate::sqlite::issues::{format_datetime, parse_datetime};
use crate::sqlite::store::SqliteStore;

const DECISION_COLUMNS: &str = r#"
    id, issue_id, prompt, context, options, default_option, selected_option,
    response_text, rationale, responded_at, responded_by, iteration,
    max_iterations, prior_id, guidance, urgency, requested_by, created_at
"#;

fn scan_decision(row: &Row<'_>) -> rusqlite::Result<DecisionPoint> {
    let options_str: String = row.get(4)?;
    let responded_at_str: Option<String> = row.get(9)?;
    let created_at_str: String = row.get(17)?;

    Ok(DecisionPoint {
        id: row.get(0)?,
        issue_id: row.get(1)?,
        prompt: row.get(2)?,
        context: row.get(3)?,
        options: serde_json::from_str(&options_str).unwrap_or_default(),
        default_option: row.get(5)?,
        selected_option: row.get(6)?,
        response_text: row.get(7)?,
        rationale: row.get(8)?,
        responded_at: responded_at_str.as_deref().map(parse_datetime),
        responded_by: row.get(10)?,
        iteration: row.get(11)?,
        max_iterations: row.get(12)?,
        prior_id: row.get(13)?,
        guidance: row.get(14)?,
        urgency: row.get(15)?,
        requested_by: row.get(16)?,
        created_at: parse_datetime(&created_at_str),
    })
}

// ---------------------------------------------------------------------------
// Connection-level helpers (shared with Transaction)
// ---------------------------------------------------------------------------

pub(crate) fn create_decision_point_on_conn(
    conn: &Connection,
    issue_id: &str,
    new: &NewDecisionPoint,
) -> Result<DecisionPoint> {
    // Asserts the issue exists.
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM issues WHERE id = ?1)",
        params![issue_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(StorageError::not_found("issue", issue_id));
    }

    let now = Utc::now();
    let now_str = format_datetime(&now);
    let options_str = serde_json::to_string(&new.options).unwrap_or_else(|_| "[]".into());

    // One decision point per issue: a fresh request replaces whatever is
    // already sitting there rather than accumulating rows.
    conn.execute(
        "DELETE FROM decision_points WHERE issue_id = ?1",
        params![issue_id],
    )?;

    conn.execute(
        "INSERT INTO decision_points
            (issue_id, prompt, context, options, default_option, iteration,
             max_iterations, prior_id, guidance, urgency, requested_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            issue_id,
            new.prompt,
            new.context,
            options_str,
            new.default_option,
            new.iteration,
            new.max_iterations,
            new.prior_id,
            new.guidance,
            new.urgency,
            new.requested_by,
            now_str,
        ],
    )?;

    let id = conn.last_insert_rowid();
    get_decision_point_by_row_id(conn, id)
}

fn get_decision_point_by_row_id(conn: &Connection, id: i64) -> Result<DecisionPoint> {
    let sql = format!("SELECT {DECISION_COLUMNS} FROM decision_points WHERE id = ?1");
    conn.query_row(&sql, params![id], scan_decision)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                StorageError::not_found("decision_point", id.to_string())
            }
            other => StorageError::Query(other),
        })
}

/// Returns the issue's decision point row, or absent.
pub(crate) fn get_decision_point_on_conn(
    conn: &Connection,
    issue_id: &str,
) -> Result<Option<DecisionPoint>> {
    let sql = format!("SELECT {DECISION_COLUMNS} FROM decision_points WHERE issue_id = ?1");
    match conn.query_row(&sql, params![issue_id], scan_decision) {
        Ok(dp) => Ok(Some(dp)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(other) => Err(StorageError::Query(other)),
    }
}

pub(crate) fn update_decision_point_on_conn(
    conn: &Connection,
    issue_id: &str,
    response: &DecisionPointResponse,
) -> Result<()> {
    let current = get_decision_point_on_conn(conn, issue_id)?
        .ok_or_else(|| StorageError::not_found("decision_point", issue_id))?;

    let now_str = format_datetime(&Utc::now());
    let affected = conn.execute(
        "UPDATE decision_points
         SET selected_option = ?1, response_text = ?2, rationale = ?3,
             responded_by = ?4, responded_at = ?5
         WHERE id = ?6",
        params![
            response.selected_option,
            response.response_text,
            response.rationale,
            response.responded_by,
            now_str,
            current.id,
        ],
    )?;
    if affected == 0 {
        return Err(StorageError::not_found("decision_point", issue_id));
    }
    Ok(())
}

pub(crate) fn list_pending_decisions_on_conn(conn: &Connection) -> Result<Vec<DecisionPoint>> {
    let sql = format!(
        "SELECT {DECISION_COLUMNS} FROM decision_points
         WHERE responded_at IS NULL ORDER BY created_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], scan_decision)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    /// Creates a decision point bound to an issue.
    pub fn create_decision_point_impl(
        &self,
        issue_id: &str,
        new: &NewDecisionPoint,
    ) -> Result<DecisionPoint> {
        let conn = self.lock_conn()?;
        create_decision_point_on_conn(&conn, issue_id, new)
    }

    /// Returns the issue's decision point, if any.
    pub fn get_decision_point_impl(&self, issue_id: &str) -> Result<Option<DecisionPoint>> {
        let conn = self.lock_conn()?;
        get_decision_point_on_conn(&conn, issue_id)
    }

    /// Records a response to an issue's current decision point.
    pub fn update_decision_point_impl(
        &self,
        issue_id: &str,
        response: &DecisionPointResponse,
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        update_decision_point_on_conn(&conn, issue_id, response)
    }

    /// Returns all decision points awaiting a response, oldest first.
    pub fn list_pending_decisions_impl(&self) -> Result<Vec<DecisionPoint>> {
        let conn = self.lock_conn()?;
        list_pending_decisions_on_conn(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuedb_core::issue::IssueBuilder;

    fn test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn sample() -> NewDecisionPoint {
        NewDecisionPoint {
            prompt: "Proceed with migration?".into(),
            context: "schema v3".into(),
            options: vec!["yes".into(), "no".into()],
            default_option: "yes".into(),
            iteration: 1,
            max_iterations: 3,
            prior_id: None,
            guidance: String::new(),
            urgency: "high".into(),
            requested_by: "alice".into(),
        }
    }

    #[test]
    fn create_requires_existing_issue() {
        let store = test_store();
        let err = store
            .create_decision_point_impl("bd-missing", &sample())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn create_and_get() {
        let store = test_store();
        let issue = IssueBuilder::new("Migration").id("bd-dp1").build();
        store.create_issue_impl(&issue, "alice").unwrap();

        let dp = store
            .create_decision_point_impl("bd-dp1", &sample())
            .unwrap();
        assert_eq!(dp.prompt, "Proceed with migration?");
        assert!(dp.is_pending());

        let fetched = store.get_decision_point_impl("bd-dp1").unwrap().unwrap();
        assert_eq!(fetched.id, dp.id);
    }

    #[test]
    fn update_records_response() {
        let store = test_store();
        let issue = IssueBuilder::new("Migration").id("bd-dp2").build();
        store.create_issue_impl(&issue, "alice").unwrap();
        store
            .create_decision_point_impl("bd-dp2", &sample())
            .unwrap();

        store
            .update_decision_point_impl(
                "bd-dp2",
                &DecisionPointResponse {
                    selected_option: "yes".into(),
                    response_text: "go ahead".into(),
                    rationale: "low risk".into(),
                    responded_by: "bob".into(),
                },
            )
            .unwrap();

        let dp = store.get_decision_point_impl("bd-dp2").unwrap().unwrap();
        assert!(!dp.is_pending());
        assert_eq!(dp.selected_option, "yes");
    }

    #[test]
    fn list_pending_excludes_responded() {
        let store = test_store();
        let a = IssueBuilder::new("A").id("bd-dp3").build();
        let b = IssueBuilder::new("B").id("bd-dp4").build();
        store.create_issue_impl(&a, "alice").unwrap();
        store.create_issue_impl(&b, "alice").unwrap();
        store.create_decision_point_impl("bd-dp3", &sample()).unwrap();
        store.create_decision_point_impl("bd-dp4", &sample()).unwrap();

        store
            .update_decision_point_impl(
                "bd-dp3",
                &DecisionPointResponse {
                    selected_option: "yes".into(),
                    ..Default::default()
                },
            )
            .unwrap();

        let pending = store.list_pending_decisions_impl().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].issue_id, "bd-dp4");
    }
}
