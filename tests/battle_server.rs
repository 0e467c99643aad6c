// Timer-driven battle server tests. Tokio's clock is paused, so sleeps
// advance virtual time instantly and tick timing is exact.

use std::time::Duration;

use tokio::sync::oneshot;

use quiz_battle_backend::engine::battle::{AdvanceOutcome, Battle};
use quiz_battle_backend::engine::bot::{BotPlan, ScriptedPolicy};
use quiz_battle_backend::engine::error::BattleError;
use quiz_battle_backend::engine::participant::Roster;
use quiz_battle_backend::engine::question::{Difficulty, Question, QuestionSet};
use quiz_battle_backend::engine::server::{BattleResult, BattleServer};

const TICK: Duration = Duration::from_secs(1);

fn battle(limits: &[u32]) -> Battle {
    let questions = limits
        .iter()
        .enumerate()
        .map(|(i, &limit)| Question {
            id: format!("q{i}"),
            prompt: format!("Question {i}"),
            options: vec!["yes".into(), "no".into()],
            correct_index: 0,
            points: 10,
            time_limit_secs: limit,
            difficulty: Difficulty::Easy,
            subject: "Logic".into(),
        })
        .collect();
    // Bots answer wrong near the end of every window
    let plans = limits.iter().map(|_| BotPlan {
        answer: 1,
        lock_in_at: 1,
        bonus: 0,
    });
    Battle::new(
        QuestionSet::new(questions).unwrap(),
        Roster::with_stock_bots("Alice", None, 2),
        Box::new(ScriptedPolicy::new(plans.collect::<Vec<_>>())),
    )
    .unwrap()
}

fn start_with_result(
    server: &BattleServer,
    battle: Battle,
) -> (uuid::Uuid, oneshot::Receiver<BattleResult>) {
    let (tx, rx) = oneshot::channel();
    let id = server
        .start_battle(
            battle,
            Some(Box::new(move |result| {
                let _ = tx.send(result);
            })),
        )
        .unwrap();
    (id, rx)
}

#[tokio::test(start_paused = true)]
async fn test_countdown_follows_wall_clock() {
    let server = BattleServer::new(TICK, 8);
    let id = server.start_battle(battle(&[5]), None).unwrap();

    assert_eq!(server.snapshot(id).unwrap().time_remaining, 5);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(server.snapshot(id).unwrap().time_remaining, 4);
    tokio::time::sleep(Duration::from_secs(2)).await;
    let snapshot = server.snapshot(id).unwrap();
    assert_eq!(snapshot.time_remaining, 2);
    assert_eq!(snapshot.elapsed_secs, 3);
}

#[tokio::test(start_paused = true)]
async fn test_full_battle_reports_result() {
    let server = BattleServer::new(TICK, 8);
    let (id, result) = start_with_result(&server, battle(&[3, 3]));

    server.select(id, 0).await.unwrap();
    assert_eq!(server.select(id, 1).await, Err(BattleError::AlreadyAnswered));

    let result = result.await.unwrap();
    assert_eq!(result.battle_id, id);
    assert_eq!(result.questions_played, 2);
    assert_eq!(result.elapsed_secs, 6);
    assert_eq!(result.leaderboard[0].name, "Alice");
    assert!(result.leaderboard[0].score > 0);
    assert_eq!(result.answer_log.len(), 6);

    // Final snapshot stays readable until reaped
    let snapshot = server.snapshot(id).unwrap();
    assert!(snapshot.is_complete());
    assert_eq!(server.active_count(), 0);
    assert_eq!(server.select(id, 0).await, Err(BattleError::BattleComplete));
    assert_eq!(server.submit(id).await, Err(BattleError::BattleComplete));
}

#[tokio::test(start_paused = true)]
async fn test_submit_advances_and_restarts_the_tick() {
    let server = BattleServer::new(TICK, 8);
    let id = server.start_battle(battle(&[3, 4]), None).unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(server.snapshot(id).unwrap().time_remaining, 2);

    assert_eq!(
        server.submit(id).await,
        Ok(AdvanceOutcome::NextQuestion { question_index: 1 })
    );
    let snapshot = server.snapshot(id).unwrap();
    assert_eq!(snapshot.question_index, 1);
    assert_eq!(snapshot.time_remaining, 4);

    // The next tick lands a full interval after the submit
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(server.snapshot(id).unwrap().time_remaining, 4);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(server.snapshot(id).unwrap().time_remaining, 3);
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_every_change() {
    let server = BattleServer::new(TICK, 8);
    let id = server.start_battle(battle(&[2]), None).unwrap();
    let mut rx = server.subscribe(id).unwrap();

    let mut seen = Vec::new();
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        seen.push(snapshot.time_remaining);
        if snapshot.is_complete() {
            break;
        }
    }
    assert_eq!(seen.first(), Some(&1));
    assert!(server.snapshot(id).unwrap().is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_stops_the_battle() {
    let server = BattleServer::new(TICK, 8);
    let (id, result) = start_with_result(&server, battle(&[3]));
    let mut rx = server.subscribe(id).unwrap();

    assert_eq!(server.active_count(), 1);
    assert!(server.teardown(id));
    assert!(!server.teardown(id));
    assert_eq!(server.active_count(), 0);
    assert!(server.snapshot(id).is_none());
    assert_eq!(server.select(id, 0).await, Err(BattleError::BattleNotFound));

    // The task is gone: the snapshot channel closes and no result is reported
    while rx.changed().await.is_ok() {}
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(result.await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_reap_finished_after_linger() {
    let server = BattleServer::new(TICK, 8);
    let (id, result) = start_with_result(&server, battle(&[1]));
    let running = server.start_battle(battle(&[100]), None).unwrap();

    result.await.unwrap();
    assert_eq!(server.reap_finished(Duration::from_secs(60)), 0);
    assert!(server.snapshot(id).is_some());

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(server.reap_finished(Duration::from_secs(60)), 1);
    assert!(server.snapshot(id).is_none());
    // Battles still in play are never reaped
    assert!(server.snapshot(running).is_some());
    assert_eq!(server.list().len(), 1);
}
