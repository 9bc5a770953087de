//! Submission Ledger: one song per user per flow

use super::store::require_current_flow;
use super::Phase;
use crate::db::begin_write;
use crate::identity::UserId;
use crate::time::unix_now;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

/// Media hosts a song link must mention
///
/// Matched as a substring of the whole link, not by parsing the host.
pub const ALLOWED_LINK_DOMAINS: [&str; 4] =
    ["spotify.com", "youtube.com", "youtu.be", "soundcloud.com"];

const DUPLICATE_SUBMISSION: &str = "You have already submitted a song";

/// A song as entered by a participant
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewSubmission {
    pub song_name: String,
    pub song_author: String,
    pub song_link: String,
    pub submitter_name: String,
}

impl NewSubmission {
    /// All fields present and the link on an allowed media host
    pub fn validate(&self) -> Result<()> {
        let fields = [
            &self.song_name,
            &self.song_author,
            &self.song_link,
            &self.submitter_name,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(Error::Validation("All fields are required".to_string()));
        }

        if !is_allowed_link(&self.song_link) {
            return Err(Error::Validation(
                "Link must be from Spotify, YouTube, or SoundCloud".to_string(),
            ));
        }

        Ok(())
    }
}

/// Substring check against `ALLOWED_LINK_DOMAINS`
pub fn is_allowed_link(link: &str) -> bool {
    ALLOWED_LINK_DOMAINS
        .iter()
        .any(|domain| link.contains(*domain))
}

/// A recorded song, as listed to participants
///
/// The owner identity is never part of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Sequence id: monotonic, assigned at creation
    pub id: i64,
    pub song_name: String,
    pub song_author: String,
    pub song_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitter_name: Option<String>,
}

/// Record `user`'s song in the current flow
///
/// Errors, in order of precedence:
/// - `Phase` unless the flow is in `SubmissionOpen`
/// - `Validation` for empty fields or a link off the allow-list
/// - `Duplicate` if the user already submitted in this flow
///
/// Returns the new submission's sequence id.
pub async fn submit(pool: &SqlitePool, user: &UserId, song: &NewSubmission) -> Result<i64> {
    let mut tx = begin_write(pool).await?;

    let flow = require_current_flow(&mut *tx).await?;
    if flow.phase != Phase::SubmissionOpen {
        return Err(Error::Phase("Submissions are not open".to_string()));
    }

    song.validate()?;

    if owned_submission(&mut *tx, &flow.id, user).await?.is_some() {
        return Err(Error::Duplicate(DUPLICATE_SUBMISSION.to_string()));
    }

    let id = sqlx::query(
        r#"
        INSERT INTO submissions (flow_id, song_name, song_author, song_link, submitter_name, user_id, submitted_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(flow.id.to_string())
    .bind(song.song_name.trim())
    .bind(song.song_author.trim())
    .bind(song.song_link.trim())
    .bind(song.submitter_name.trim())
    .bind(user.as_str())
    .bind(unix_now())
    .execute(&mut *tx)
    .await
    .map_err(|e| Error::from_insert(e, DUPLICATE_SUBMISSION))?
    .last_insert_rowid();

    tx.commit().await?;

    info!(
        "Submission {} recorded for flow {}: '{}' by {}",
        id,
        flow.id,
        song.song_name.trim(),
        song.song_author.trim()
    );

    Ok(id)
}

/// All submissions of a flow in sequence order
///
/// With `hide_submitters`, display names are left out (used while voting).
pub async fn list(
    pool: &SqlitePool,
    flow_id: &Uuid,
    hide_submitters: bool,
) -> Result<Vec<Submission>> {
    let rows = sqlx::query(
        r#"
        SELECT id, song_name, song_author, song_link, submitter_name
        FROM submissions
        WHERE flow_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(flow_id.to_string())
    .fetch_all(pool)
    .await?;

    debug!("Listed {} submissions for flow {}", rows.len(), flow_id);

    Ok(rows
        .iter()
        .map(|row| Submission {
            id: row.get("id"),
            song_name: row.get("song_name"),
            song_author: row.get("song_author"),
            song_link: row.get("song_link"),
            submitter_name: if hide_submitters {
                None
            } else {
                Some(row.get("submitter_name"))
            },
        })
        .collect())
}

/// Whether `user` has a submission in the flow
pub async fn has_submitted(pool: &SqlitePool, flow_id: &Uuid, user: &UserId) -> Result<bool> {
    Ok(owned_submission(pool, flow_id, user).await?.is_some())
}

/// Sequence id of `user`'s own submission in the flow, if any
pub async fn owned_submission<'e, E>(
    executor: E,
    flow_id: &Uuid,
    user: &UserId,
) -> Result<Option<i64>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM submissions WHERE flow_id = ? AND user_id = ?")
        .bind(flow_id.to_string())
        .bind(user.as_str())
        .fetch_optional(executor)
        .await?;

    Ok(id)
}
