//! `github-issuer status` command.

use std::fmt::Write as _;

use crate::context::ServiceContext;
use crate::model::{GithubIssuer, ResourceKey};

/// Execute the `status` command.
///
/// With a key, prints that record's conditions. Without one, prints a table
/// of every record.
///
/// # Errors
///
/// Returns an error string if the store cannot be read or the record is missing.
pub async fn run(ctx: &ServiceContext, key: Option<&ResourceKey>) -> Result<(), String> {
    if let Some(key) = key {
        let record = ctx
            .store
            .get(key)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("githubissuer {key} not found"))?;
        print!("{}", render_record(&record));
        return Ok(());
    }

    let refs = ctx.store.list().await.map_err(|e| e.to_string())?;
    if refs.is_empty() {
        println!("No records found.");
        return Ok(());
    }
    let mut records = Vec::with_capacity(refs.len());
    for r in &refs {
        if let Some(record) = ctx.store.get(&r.key).await.map_err(|e| e.to_string())? {
            records.push(record);
        }
    }
    print!("{}", render_table(&records));
    Ok(())
}

/// Renders one record's spec and conditions.
#[must_use]
pub fn render_record(record: &GithubIssuer) -> String {
    let mut out = String::new();
    let status = &record.status;
    let _ = writeln!(out, "Name:        {}", record.key());
    let _ = writeln!(out, "Repo:        {}", record.spec.repo);
    let _ = writeln!(out, "Title:       {}", record.spec.title);
    let issue = status.issue_number.map_or_else(|| "-".to_string(), |n| format!("#{n}"));
    let _ = writeln!(out, "Issue:       {issue}");
    let observed = status.observed_generation.map_or_else(|| "-".to_string(), |g| g.to_string());
    let _ = writeln!(out, "Generation:  {} (observed {observed})", record.metadata.generation);
    if let Some(at) = record.metadata.deletion_timestamp {
        let _ = writeln!(out, "Deleting:    since {}", at.to_rfc3339());
    }
    if status.conditions.is_empty() {
        let _ = writeln!(out, "Conditions:  none");
        return out;
    }
    let _ = writeln!(out, "Conditions:");
    let type_width = status.conditions.iter().map(|c| c.condition_type.len()).max().unwrap_or(4);
    for c in &status.conditions {
        let _ = writeln!(
            out,
            "  {:<type_width$}  {:<7}  {}  {} ({})",
            c.condition_type,
            c.status.to_string(),
            c.last_transition_time.to_rfc3339(),
            c.reason,
            c.message,
        );
    }
    out
}

/// Renders a one-line-per-record summary table.
#[must_use]
pub fn render_table(records: &[GithubIssuer]) -> String {
    let rows: Vec<[String; 4]> = records
        .iter()
        .map(|r| {
            let issue = r.status.issue_number.map_or_else(|| "-".to_string(), |n| format!("#{n}"));
            let state = if r.is_deleting() {
                "Deleting".to_string()
            } else if r.status.observed_generation == Some(r.metadata.generation) {
                "Synced".to_string()
            } else {
                "Pending".to_string()
            };
            [r.key().to_string(), r.spec.repo.clone(), issue, state]
        })
        .collect();

    let width = |i: usize, header: &str| {
        rows.iter().map(|row| row[i].len()).max().unwrap_or(0).max(header.len())
    };
    let (kw, rw, iw) = (width(0, "KEY"), width(1, "REPO"), width(2, "ISSUE"));

    let mut out = String::new();
    let _ = writeln!(out, "{:<kw$}  {:<rw$}  {:<iw$}  STATE", "KEY", "REPO", "ISSUE");
    for [key, repo, issue, state] in &rows {
        let _ = writeln!(out, "{key:<kw$}  {repo:<rw$}  {issue:<iw$}  {state}");
    }
    let _ = writeln!(out, "\n{} record(s) total.", rows.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{set_condition, Condition, GithubIssuerSpec};
    use chrono::{TimeZone, Utc};

    fn record(name: &str) -> GithubIssuer {
        let mut record = GithubIssuer::new(
            &ResourceKey::new("default", name),
            GithubIssuerSpec { repo: "o/r".into(), title: "t".into(), description: "d".into() },
        );
        record.metadata.generation = 2;
        record
    }

    #[test]
    fn record_view_lists_conditions() {
        let mut r = record("a");
        r.status.issue_number = Some(12);
        r.status.observed_generation = Some(2);
        let at = Utc.timestamp_opt(0, 0).unwrap();
        set_condition(&mut r.status.conditions, Condition::new("isOpen", true, "IssueOpen", "Issue is open", at));

        let out = render_record(&r);
        assert!(out.contains("Issue:       #12"));
        assert!(out.contains("Generation:  2 (observed 2)"));
        assert!(out.contains("isOpen  True"));
        assert!(out.contains("IssueOpen (Issue is open)"));
    }

    #[test]
    fn table_marks_pending_and_synced_rows() {
        let mut synced = record("synced");
        synced.status.observed_generation = Some(2);
        let out = render_table(&[synced, record("pending")]);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("KEY"));
        assert!(lines[1].contains("default/synced") && lines[1].ends_with("Synced"));
        assert!(lines[2].contains("default/pending") && lines[2].ends_with("Pending"));
        assert!(out.contains("2 record(s) total."));
    }
}
