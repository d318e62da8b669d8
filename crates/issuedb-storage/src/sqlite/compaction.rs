//! Compaction eligibility and candidate selection for [`SqliteStore`].

use chrono::{Duration, Utc};
use rusqlite::{Connection, params};

use crate::error::Result;
use crate::sqlite::issues::{format_datetime, parse_datetime};
use crate::sqlite::store::SqliteStore;

const TIER1_DAYS: i64 = 30;
const TIER2_DAYS: i64 = 90;

/// A candidate issue for compaction at a given tier.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactionCandidate {
    pub issue_id: String,
    pub original_size: i64,
    pub estimated_size: i64,
    pub dependent_count: i64,
}

fn content_size_on_conn(conn: &Connection, issue_id: &str) -> Result<i64> {
    let size: i64 = conn.query_row(
        "SELECT length(title) + length(description) + length(design)
                + length(acceptance_criteria) + length(notes)
         FROM issues WHERE id = ?1",
        params![issue_id],
        |row| row.get(0),
    )?;
    Ok(size)
}

fn dependent_count_on_conn(conn: &Connection, issue_id: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM dependencies WHERE depends_on_id = ?1",
        params![issue_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// A fixed compression ratio used to approximate the post-compaction size.
/// Tier 2 compresses harder than tier 1 since more context has already been
/// summarized away by tier 1.
fn estimate_compacted_size(original_size: i64, tier: i32) -> i64 {
    let ratio = if tier == 1 { 4 } else { 8 };
    (original_size / ratio).max(1)
}

pub(crate) fn check_eligibility_on_conn(
    conn: &Connection,
    issue_id: &str,
    tier: i32,
) -> Result<(bool, String)> {
    if tier != 1 && tier != 2 {
        return Ok((false, format!("unsupported compaction tier {tier}")));
    }

    let row: Option<(String, Option<String>, i32)> = conn
        .query_row(
            "SELECT status, closed_at, compaction_level FROM issues WHERE id = ?1",
            params![issue_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    let Some((status, closed_at_str, compaction_level)) = row else {
        return Ok((false, format!("issue {issue_id} does not exist")));
    };

    if status != "closed" {
        return Ok((false, "issue is not closed".to_string()));
    }
    let Some(closed_at_str) = closed_at_str else {
        return Ok((false, "issue has no closed_at timestamp".to_string()));
    };
    let closed_at = parse_datetime(&closed_at_str);
    let age = Utc::now() - closed_at;

    let (required_level, required_days) = if tier == 1 {
        (0, TIER1_DAYS)
    } else {
        (1, TIER2_DAYS)
    };

    if compaction_level != required_level {
        return Ok((
            false,
            format!("compaction_level is {compaction_level}, expected {required_level}"),
        ));
    }
    if age < Duration::days(required_days) {
        return Ok((
            false,
            format!("closed {} days ago, needs {required_days}", age.num_days()),
        ));
    }

    Ok((true, String::new()))
}

fn candidates_on_conn(
    conn: &Connection,
    required_level: i32,
    required_days: i64,
    tier: i32,
) -> Result<Vec<CompactionCandidate>> {
    let cutoff = format_datetime(&(Utc::now() - Duration::days(required_days)));
    let mut stmt = conn.prepare(
        "SELECT id FROM issues
         WHERE status = 'closed' AND compaction_level = ?1
           AND closed_at IS NOT NULL AND closed_at <= ?2
         ORDER BY closed_at ASC",
    )?;
    let ids: Vec<String> = stmt
        .query_map(params![required_level, cutoff], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        let original_size = content_size_on_conn(conn, &id)?;
        let dependent_count = dependent_count_on_conn(conn, &id)?;
        out.push(CompactionCandidate {
            issue_id: id,
            original_size,
            estimated_size: estimate_compacted_size(original_size, tier),
            dependent_count,
        });
    }
    Ok(out)
}

pub(crate) fn apply_compaction_on_conn(
    conn: &Connection,
    issue_id: &str,
    tier: i32,
    original_size: i32,
    commit_sha: &str,
) -> Result<()> {
    let now_str = format_datetime(&Utc::now());
    conn.execute(
        "UPDATE issues
         SET compaction_level = ?1, original_size = ?2,
             compacted_at = ?3, compacted_at_commit = ?4
         WHERE id = ?5",
        params![tier, original_size, now_str, commit_sha, issue_id],
    )?;
    Ok(())
}

impl SqliteStore {
    /// Checks whether an issue is eligible for the given compaction tier.
    ///
    /// This is a policy API, not an error API: ineligibility is reported as
    /// `(false, reason)`.
    pub fn check_compaction_eligibility_impl(
        &self,
        issue_id: &str,
        tier: i32,
    ) -> Result<(bool, String)> {
        let conn = self.lock_conn()?;
        check_eligibility_on_conn(&conn, issue_id, tier)
    }

    /// Returns tier-1 compaction candidates, oldest-closed first.
    pub fn get_tier1_candidates_impl(&self) -> Result<Vec<CompactionCandidate>> {
        let conn = self.lock_conn()?;
        candidates_on_conn(&conn, 0, TIER1_DAYS, 1)
    }

    /// Returns tier-2 compaction candidates, oldest-closed first.
    pub fn get_tier2_candidates_impl(&self) -> Result<Vec<CompactionCandidate>> {
        let conn = self.lock_conn()?;
        candidates_on_conn(&conn, 1, TIER2_DAYS, 2)
    }

    /// Records that compaction at `tier` has been applied to `issue_id`.
    pub fn apply_compaction_impl(
        &self,
        issue_id: &str,
        tier: i32,
        original_size: i32,
        commit_sha: &str,
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        apply_compaction_on_conn(&conn, issue_id, tier, original_size, commit_sha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuedb_core::enums::Status;
    use issuedb_core::issue::IssueBuilder;

    fn test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn backdate_closed_at(store: &SqliteStore, id: &str, days_ago: i64) {
        let conn = store.lock_conn().unwrap();
        let ts = format_datetime(&(Utc::now() - Duration::days(days_ago)));
        conn.execute(
            "UPDATE issues SET closed_at = ?1 WHERE id = ?2",
            params![ts, id],
        )
        .unwrap();
    }

    #[test]
    fn not_eligible_when_open() {
        let store = test_store();
        let issue = IssueBuilder::new("Open issue").id("bd-cp1").build();
        store.create_issue_impl(&issue, "alice").unwrap();

        let (eligible, reason) = store.check_compaction_eligibility_impl("bd-cp1", 1).unwrap();
        assert!(!eligible);
        assert!(!reason.is_empty());
    }

    #[test]
    fn tier1_eligible_after_30_days() {
        let store = test_store();
        let issue = IssueBuilder::new("Closed issue")
            .id("bd-cp2")
            .status(Status::Closed)
            .closed_at(Utc::now())
            .build();
        store.create_issue_impl(&issue, "alice").unwrap();
        backdate_closed_at(&store, "bd-cp2", 45);

        let (eligible, _) = store.check_compaction_eligibility_impl("bd-cp2", 1).unwrap();
        assert!(eligible);

        let candidates = store.get_tier1_candidates_impl().unwrap();
        assert!(candidates.iter().any(|c| c.issue_id == "bd-cp2"));
        assert!(candidates[0].original_size > 0);
    }

    #[test]
    fn apply_compaction_is_monotone_and_records_commit() {
        let store = test_store();
        let issue = IssueBuilder::new("Closed issue")
            .id("bd-cp3")
            .status(Status::Closed)
            .closed_at(Utc::now())
            .build();
        store.create_issue_impl(&issue, "alice").unwrap();
        backdate_closed_at(&store, "bd-cp3", 45);

        store
            .apply_compaction_impl("bd-cp3", 1, 5000, "abc123")
            .unwrap();

        let updated = store.get_issue_impl("bd-cp3").unwrap();
        assert_eq!(updated.compaction_level, 1);
        assert_eq!(updated.original_size, 5000);
        assert_eq!(updated.compacted_at_commit.as_deref(), Some("abc123"));
        assert!(updated.compacted_at.is_some());

        let (eligible, _) = store.check_compaction_eligibility_impl("bd-cp3", 1).unwrap();
        assert!(!eligible);
    }
}
