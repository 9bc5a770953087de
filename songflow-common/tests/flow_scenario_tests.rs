//! End-to-end flow scenarios against the engine
//!
//! Covers:
//! - One submission per (flow, user) and one ballot per (flow, user)
//! - Phase gating for submissions and ballots
//! - `create_flow` discarding all prior submissions and ballots
//! - The "Road Trip" walkthrough from theme to results

use songflow_common::db::init_in_memory;
use songflow_common::flow::{
    self, create_flow, get_current_flow, has_submitted, has_voted, list, my_entries, results,
    set_phase, submit, submit_ballot, BallotEntry, NewSubmission, Phase,
};
use songflow_common::{Error, UserId};
use sqlx::SqlitePool;

fn song(name: &str, link: &str) -> NewSubmission {
    NewSubmission {
        song_name: name.to_string(),
        song_author: format!("{} Artist", name),
        song_link: link.to_string(),
        submitter_name: format!("{} Fan", name),
    }
}

fn vote(song_id: i64, points: i64) -> BallotEntry {
    BallotEntry { song_id, points }
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_road_trip_scenario() {
    let pool = init_in_memory().await.unwrap();

    let flow = create_flow(&pool, "Road Trip", None).await.unwrap();
    assert_eq!(flow.phase, Phase::Idle);
    set_phase(&pool, 1, None).await.unwrap();

    let u1 = UserId::generate();
    let u3 = UserId::generate();
    let u4 = UserId::generate();

    let s1 = submit(&pool, &u1, &song("Highway Song", "https://open.spotify.com/track/1"))
        .await
        .unwrap();
    let second = submit(&pool, &u1, &song("Another", "https://youtu.be/2")).await;
    assert!(matches!(second, Err(Error::Duplicate(_))));

    let s2 = submit(&pool, &u3, &song("Open Road", "https://www.youtube.com/watch?v=3"))
        .await
        .unwrap();
    let s3 = submit(&pool, &u4, &song("Drive", "https://soundcloud.com/a/drive"))
        .await
        .unwrap();

    set_phase(&pool, 2, None).await.unwrap();

    // U2 owns no submission
    let u2 = UserId::generate();
    let rejected = submit_ballot(&pool, &u2, &[vote(s1, 1), vote(s1, 2), vote(s2, 3)]).await;
    assert!(matches!(rejected, Err(Error::Validation(_))));
    assert!(!has_voted(&pool, &flow.id, &u2).await.unwrap());

    submit_ballot(&pool, &u2, &[vote(s1, 3), vote(s2, 2), vote(s3, 1)])
        .await
        .unwrap();
    assert!(has_voted(&pool, &flow.id, &u2).await.unwrap());

    // A second ballot is refused even after the first is read back
    assert_eq!(my_entries(&pool, &flow.id, &u2).await.unwrap().len(), 3);
    let again = submit_ballot(&pool, &u2, &[vote(s1, 3), vote(s2, 2), vote(s3, 1)]).await;
    assert!(matches!(again, Err(Error::Duplicate(_))));

    set_phase(&pool, 3, None).await.unwrap();

    let ranking = results(&pool, &flow.id).await.unwrap();
    assert_eq!(ranking.len(), 3);
    assert_eq!(ranking[0].id, s1);
    assert_eq!(ranking[0].total_points, 3);
    assert_eq!(ranking[1].id, s2);
    assert_eq!(ranking[2].id, s3);
}

#[tokio::test]
async fn test_create_flow_clears_prior_submissions_and_ballots() {
    let pool = init_in_memory().await.unwrap();

    let old = create_flow(&pool, "Old Theme", None).await.unwrap();
    set_phase(&pool, 1, None).await.unwrap();
    let owner = UserId::generate();
    let mut ids = Vec::new();
    for (i, link) in ["https://youtu.be/a", "https://youtu.be/b", "https://youtu.be/c"]
        .iter()
        .enumerate()
    {
        let user = if i == 0 { owner.clone() } else { UserId::generate() };
        ids.push(submit(&pool, &user, &song(&format!("S{}", i), link)).await.unwrap());
    }
    set_phase(&pool, 2, None).await.unwrap();
    submit_ballot(&pool, &UserId::generate(), &[vote(ids[0], 1), vote(ids[1], 2), vote(ids[2], 3)])
        .await
        .unwrap();

    let new = create_flow(&pool, "New Theme", None).await.unwrap();
    assert_ne!(old.id, new.id);

    assert_eq!(count(&pool, "submissions").await, 0);
    assert_eq!(count(&pool, "ballot_entries").await, 0);
    assert!(list(&pool, &new.id, false).await.unwrap().is_empty());
    assert!(results(&pool, &new.id).await.unwrap().is_empty());
    assert!(!has_submitted(&pool, &new.id, &owner).await.unwrap());

    // The previous owner may submit again in the new flow
    set_phase(&pool, 1, None).await.unwrap();
    submit(&pool, &owner, &song("Fresh", "https://youtu.be/z")).await.unwrap();
}

#[tokio::test]
async fn test_phase_changes_never_touch_data() {
    let pool = init_in_memory().await.unwrap();
    let flow = create_flow(&pool, "Road Trip", None).await.unwrap();
    set_phase(&pool, 1, None).await.unwrap();
    submit(&pool, &UserId::generate(), &song("Keep", "https://youtu.be/k"))
        .await
        .unwrap();

    for phase in [0, 3, 2, 0] {
        set_phase(&pool, phase, None).await.unwrap();
        assert_eq!(list(&pool, &flow.id, false).await.unwrap().len(), 1);
    }

    let current = get_current_flow(&pool).await.unwrap().unwrap();
    assert_eq!(current.id, flow.id);
    assert_eq!(current.phase, Phase::Idle);
}

#[tokio::test]
async fn test_timer_walks_through_all_phases() {
    let pool = init_in_memory().await.unwrap();
    create_flow(&pool, "Road Trip", Some(10)).await.unwrap();
    set_phase(&pool, 0, Some(10)).await.unwrap();

    let start = get_current_flow(&pool).await.unwrap().unwrap().phase_started_at;
    let mut now = start;
    for expected in [Phase::SubmissionOpen, Phase::VotingOpen, Phase::ResultsVisible] {
        now += 10;
        let status = flow::check_timer_at(&pool, now).await.unwrap();
        assert!(status.advanced);
        assert_eq!(status.new_phase, Some(expected));
    }

    now += 10;
    let status = flow::check_timer_at(&pool, now).await.unwrap();
    assert!(!status.advanced);
    assert_eq!(
        get_current_flow(&pool).await.unwrap().unwrap().phase,
        Phase::ResultsVisible
    );
}
