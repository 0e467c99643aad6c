// Battle server: owns running battles, drives each one from its own tick task
// and publishes snapshots to observers.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::metrics;

use super::battle::{AdvanceOutcome, Battle, BattleSnapshot};
use super::error::BattleError;
use super::feed::AnswerEvent;
use super::participant::Leaderboard;

/// Final result of a battle, handed to the completion callback.
#[derive(Debug, Clone, Serialize)]
pub struct BattleResult {
    pub battle_id: Uuid,
    pub leaderboard: Leaderboard,
    pub answer_log: Vec<AnswerEvent>,
    pub questions_played: usize,
    pub elapsed_secs: u64,
}

impl BattleResult {
    fn from_battle(battle_id: Uuid, battle: &Battle) -> Self {
        BattleResult {
            battle_id,
            leaderboard: battle.leaderboard().cloned().unwrap_or_default(),
            answer_log: battle.answer_log().to_vec(),
            questions_played: battle.question_index(),
            elapsed_secs: battle.elapsed_secs(),
        }
    }
}

pub type CompletionCallback = Box<dyn FnOnce(BattleResult) + Send + 'static>;

/// Run a battle to completion on the calling thread with no sleeping.
///
/// `human` is asked for an answer before every tick while the human has not
/// answered yet; returning `None` lets the clock run.
pub fn run_battle_headless<F>(mut battle: Battle, mut human: F) -> BattleResult
where
    F: FnMut(&BattleSnapshot) -> Option<usize>,
{
    let battle_id = Uuid::new_v4();
    while !battle.is_complete() && !battle.is_closed() {
        let snapshot = battle.snapshot();
        if snapshot.human_answer.is_none() {
            if let Some(answer) = human(&snapshot) {
                if let Err(e) = battle.select(answer) {
                    tracing::debug!(%battle_id, "Ignoring headless answer: {e}");
                }
            }
        }
        battle.tick();
    }
    BattleResult::from_battle(battle_id, &battle)
}

enum BattleCommand {
    Select {
        answer: usize,
        reply: oneshot::Sender<Result<(), BattleError>>,
    },
    Submit {
        reply: oneshot::Sender<Result<AdvanceOutcome, BattleError>>,
    },
}

/// Arena entry for one running (or recently finished) battle.
struct BattleHandle {
    commands: mpsc::Sender<BattleCommand>,
    snapshots: watch::Receiver<BattleSnapshot>,
    task: JoinHandle<()>,
    player_name: String,
    opponents: usize,
    start_time: String,
    /// Claimed once, by whichever of completion, crash or teardown happens first.
    finished_at: Arc<Mutex<Option<Instant>>>,
}

impl BattleHandle {
    fn is_finished(&self) -> bool {
        self.finished_at.lock().unwrap().is_some()
    }
}

/// Mark a battle finished. Returns false if it was already claimed, so exactly
/// one side settles the metrics and the completion callback.
fn claim_finish(finished_at: &Mutex<Option<Instant>>) -> bool {
    let mut slot = finished_at.lock().unwrap();
    if slot.is_some() {
        return false;
    }
    *slot = Some(Instant::now());
    true
}

impl Drop for BattleHandle {
    fn drop(&mut self) {
        // The task must never touch the session again once its handle is gone
        self.task.abort();
    }
}

/// Metadata about a battle for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveBattleInfo {
    pub battle_id: Uuid,
    pub player_name: String,
    pub opponents: usize,
    pub question_index: usize,
    pub question_count: usize,
    pub complete: bool,
    pub start_time: String,
}

/// Arena of battles. Each battle is owned by exactly one tokio task, which is
/// the only writer; everyone else talks to it through commands and snapshots.
pub struct BattleServer {
    battles: Mutex<HashMap<Uuid, BattleHandle>>,
    tick_interval: Duration,
    max_active: usize,
}

impl BattleServer {
    pub fn new(tick_interval: Duration, max_active: usize) -> Self {
        Self {
            battles: Mutex::new(HashMap::new()),
            tick_interval,
            max_active,
        }
    }

    /// Battles still in play (finished ones waiting to be reaped excluded).
    pub fn active_count(&self) -> usize {
        self.battles
            .lock()
            .unwrap()
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Start driving `battle`. Must be called from inside a tokio runtime.
    ///
    /// `on_complete` runs on the battle task once the last question is scored.
    /// It is not called if the battle is torn down or panics first.
    pub fn start_battle(
        &self,
        battle: Battle,
        on_complete: Option<CompletionCallback>,
    ) -> Result<Uuid, BattleError> {
        // Held until the new handle is inserted so concurrent starts cannot overshoot
        let mut battles = self.battles.lock().unwrap();
        let active = battles.values().filter(|h| !h.is_finished()).count();
        if active >= self.max_active {
            return Err(BattleError::TooManyBattles {
                max: self.max_active,
            });
        }

        let battle_id = Uuid::new_v4();
        let (command_tx, command_rx) = mpsc::channel(32);
        let (snapshot_tx, snapshot_rx) = watch::channel(battle.snapshot());
        let finished_at = Arc::new(Mutex::new(None));

        let player_name = battle.participants().human().name.clone();
        let opponents = battle.participants().len() - 1;

        let task = tokio::spawn(run_battle_loop(
            battle_id,
            battle,
            command_rx,
            snapshot_tx,
            self.tick_interval,
            finished_at.clone(),
            on_complete,
        ));

        battles.insert(
            battle_id,
            BattleHandle {
                commands: command_tx,
                snapshots: snapshot_rx,
                task,
                player_name: player_name.clone(),
                opponents,
                start_time: chrono::Utc::now().to_rfc3339(),
                finished_at,
            },
        );

        metrics::ACTIVE_BATTLES.inc();
        metrics::BATTLES_STARTED_TOTAL.inc();
        tracing::info!(%battle_id, player = %player_name, opponents, "Battle started");
        Ok(battle_id)
    }

    /// Latest snapshot of a battle.
    pub fn snapshot(&self, battle_id: Uuid) -> Option<BattleSnapshot> {
        let battles = self.battles.lock().unwrap();
        battles.get(&battle_id).map(|h| h.snapshots.borrow().clone())
    }

    /// Receiver that sees every snapshot the battle publishes.
    pub fn subscribe(&self, battle_id: Uuid) -> Option<watch::Receiver<BattleSnapshot>> {
        let battles = self.battles.lock().unwrap();
        battles.get(&battle_id).map(|h| h.snapshots.clone())
    }

    /// Forward the human's answer to the battle task.
    pub async fn select(&self, battle_id: Uuid, answer: usize) -> Result<(), BattleError> {
        let commands = self.command_sender(battle_id)?;
        let (reply, response) = oneshot::channel();
        commands
            .send(BattleCommand::Select { answer, reply })
            .await
            .map_err(|_| BattleError::BattleClosed)?;
        response.await.map_err(|_| BattleError::BattleClosed)?
    }

    /// Close the current question now.
    pub async fn submit(&self, battle_id: Uuid) -> Result<AdvanceOutcome, BattleError> {
        let commands = self.command_sender(battle_id)?;
        let (reply, response) = oneshot::channel();
        commands
            .send(BattleCommand::Submit { reply })
            .await
            .map_err(|_| BattleError::BattleClosed)?;
        response.await.map_err(|_| BattleError::BattleClosed)?
    }

    /// Discard a battle and request cancellation of its task. Commands fail from
    /// here on, and unless the battle had already finished its completion
    /// callback never fires. Returns false if the battle was unknown.
    pub fn teardown(&self, battle_id: Uuid) -> bool {
        let Some(handle) = self.battles.lock().unwrap().remove(&battle_id) else {
            return false;
        };
        handle.task.abort();
        if claim_finish(&handle.finished_at) {
            metrics::ACTIVE_BATTLES.dec();
            metrics::BATTLES_CANCELLED_TOTAL.inc();
            tracing::info!(%battle_id, "Battle torn down before completion");
        }
        true
    }

    /// Drop finished battles whose results have been visible for `linger`.
    pub fn reap_finished(&self, linger: Duration) -> usize {
        let mut battles = self.battles.lock().unwrap();
        let before = battles.len();
        battles.retain(|_, h| match *h.finished_at.lock().unwrap() {
            Some(at) => at.elapsed() < linger,
            None => true,
        });
        before - battles.len()
    }

    pub fn list(&self) -> Vec<ActiveBattleInfo> {
        let battles = self.battles.lock().unwrap();
        let mut infos: Vec<ActiveBattleInfo> = battles
            .iter()
            .map(|(id, h)| {
                let snap = h.snapshots.borrow();
                ActiveBattleInfo {
                    battle_id: *id,
                    player_name: h.player_name.clone(),
                    opponents: h.opponents,
                    question_index: snap.question_index,
                    question_count: snap.question_count,
                    complete: snap.is_complete(),
                    start_time: h.start_time.clone(),
                }
            })
            .collect();
        infos.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        infos
    }

    fn command_sender(&self, battle_id: Uuid) -> Result<mpsc::Sender<BattleCommand>, BattleError> {
        let battles = self.battles.lock().unwrap();
        let handle = battles.get(&battle_id).ok_or(BattleError::BattleNotFound)?;
        if handle.snapshots.borrow().is_complete() {
            return Err(BattleError::BattleComplete);
        }
        Ok(handle.commands.clone())
    }
}

/// The single writer for one battle: applies commands as they arrive and ticks
/// the countdown once per interval, publishing a snapshot after every change.
async fn run_battle_loop(
    battle_id: Uuid,
    mut battle: Battle,
    mut commands: mpsc::Receiver<BattleCommand>,
    snapshots: watch::Sender<BattleSnapshot>,
    tick_interval: Duration,
    finished_at: Arc<Mutex<Option<Instant>>>,
    on_complete: Option<CompletionCallback>,
) {
    let started = Instant::now();
    let mut ticker = tokio::time::interval_at(started + tick_interval, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut crashed = false;

    while !battle.is_complete() {
        tokio::select! {
            biased;
            command = commands.recv() => {
                let Some(command) = command else {
                    // Every sender is gone: the session was discarded
                    battle.teardown();
                    return;
                };
                match command {
                    BattleCommand::Select { answer, reply } => {
                        let Some(result) = guarded(battle_id, || battle.select(answer)) else {
                            let _ = reply.send(Err(BattleError::BattleClosed));
                            crashed = true;
                            break;
                        };
                        if result.is_ok() {
                            snapshots.send_replace(battle.snapshot());
                        }
                        let _ = reply.send(result);
                    }
                    BattleCommand::Submit { reply } => {
                        let Some(result) = guarded(battle_id, || battle.advance()) else {
                            let _ = reply.send(Err(BattleError::BattleClosed));
                            crashed = true;
                            break;
                        };
                        if result.is_ok() {
                            // Next question gets a full first second
                            ticker.reset();
                            snapshots.send_replace(battle.snapshot());
                        }
                        let _ = reply.send(result);
                    }
                }
            }
            _ = ticker.tick() => {
                let tick_start = std::time::Instant::now();
                if guarded(battle_id, || battle.tick()).is_none() {
                    crashed = true;
                    break;
                }
                metrics::BATTLE_TICK_DURATION_MS
                    .observe(tick_start.elapsed().as_secs_f64() * 1000.0);
                snapshots.send_replace(battle.snapshot());
            }
        }
    }

    if crashed {
        // Left the loop through a panic: the session state can no longer be trusted
        battle.teardown();
        if claim_finish(&finished_at) {
            metrics::ACTIVE_BATTLES.dec();
            metrics::BATTLES_ERRORED_TOTAL.inc();
        }
        return;
    }

    if !claim_finish(&finished_at) {
        // Torn down while the last question was being scored
        return;
    }
    metrics::ACTIVE_BATTLES.dec();
    metrics::BATTLES_COMPLETED_TOTAL.inc();
    metrics::BATTLE_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

    let result = BattleResult::from_battle(battle_id, &battle);
    tracing::info!(
        %battle_id,
        elapsed_secs = result.elapsed_secs,
        winner = result.leaderboard.first().map(|s| s.name.as_str()).unwrap_or(""),
        "Battle finished"
    );
    if let Some(callback) = on_complete {
        callback(result);
    }
}

/// Run one step of a battle, turning a panic into `None`.
fn guarded<T>(battle_id: Uuid, step: impl FnOnce() -> T) -> Option<T> {
    match std::panic::catch_unwind(AssertUnwindSafe(step)) {
        Ok(value) => Some(value),
        Err(panic_info) => {
            let msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            tracing::error!(%battle_id, "Battle task panicked: {}", msg);
            None
        }
    }
}
