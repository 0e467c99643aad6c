// HTTP API routes (question sets, battle control, snapshots)

pub mod ws;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::engine::battle::Battle;
use crate::engine::bot::{AnsweringPolicy, RandomPolicy};
use crate::engine::config::MAX_BOT_COUNT;
use crate::engine::error::BattleError;
use crate::engine::participant::Roster;
use crate::engine::question::{self, Question, QuestionSet};
use crate::engine::server::{BattleResult, BattleServer, CompletionCallback};

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateBattleRequest {
    pub player_name: String,
    pub avatar: Option<String>,
    /// Name of a question-set file in the questions directory.
    pub question_set: Option<String>,
    /// Inline questions; take precedence over `question_set`.
    pub questions: Option<Vec<Question>>,
    pub bot_count: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Deserialize)]
pub struct AnswerRequest {
    pub answer: usize,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub battle_server: Arc<BattleServer>,
    pub questions_dir: PathBuf,
    pub default_bot_count: usize,
    pub bot_seed: Option<u64>,
    pub feed_capacity: usize,
}

impl AppState {
    pub fn new(battle_server: Arc<BattleServer>, config: &Config) -> Self {
        AppState {
            battle_server,
            questions_dir: config.questions_dir.clone(),
            default_bot_count: config.bot_count,
            bot_seed: config.bot_seed,
            feed_capacity: config.feed_capacity,
        }
    }
}

// ── Error helpers ─────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}

fn battle_error(e: BattleError) -> Response {
    let status = match e {
        BattleError::BattleNotFound => StatusCode::NOT_FOUND,
        BattleError::BattleComplete | BattleError::AlreadyAnswered | BattleError::BattleClosed => {
            StatusCode::CONFLICT
        }
        BattleError::TooManyBattles { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ref e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, &e.to_string())
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    Router::new()
        // Question sets
        .route("/api/question-sets", get(list_question_sets))
        // Battles
        .route("/api/battles", get(list_battles).post(create_battle))
        .route("/api/battles/{id}", get(get_battle).delete(delete_battle))
        .route("/api/battles/{id}/answer", post(answer_battle))
        .route("/api/battles/{id}/submit", post(submit_battle))
        // WebSocket
        .route("/ws/battles/{id}", get(ws::ws_battle))
        .with_state(state)
}

// ── Question set handlers ─────────────────────────────────────────────

async fn list_question_sets(State(state): State<AppState>) -> impl IntoResponse {
    let sets = question::list_question_sets(&state.questions_dir);
    (StatusCode::OK, Json(json!(sets))).into_response()
}

/// Resolve the questions for a new battle: inline questions win, then a named set.
pub fn resolve_questions(
    questions_dir: &std::path::Path,
    req: &CreateBattleRequest,
) -> Result<QuestionSet, BattleError> {
    match (&req.questions, req.question_set.as_deref()) {
        (Some(questions), _) => QuestionSet::new(questions.clone()),
        (None, Some(name)) => question::load_question_set(questions_dir, name),
        (None, None) => Err(BattleError::InvalidQuestionSet(
            "either question_set or questions is required".to_string(),
        )),
    }
}

// ── Battle handlers ───────────────────────────────────────────────────

async fn create_battle(
    State(state): State<AppState>,
    Json(req): Json<CreateBattleRequest>,
) -> impl IntoResponse {
    let player_name = req.player_name.trim();
    if player_name.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "player_name must not be empty");
    }

    let questions = match resolve_questions(&state.questions_dir, &req) {
        Ok(q) => q,
        Err(e) => return battle_error(e),
    };

    let bot_count = req
        .bot_count
        .unwrap_or(state.default_bot_count)
        .min(MAX_BOT_COUNT);
    let roster = Roster::with_stock_bots(player_name, req.avatar.as_deref(), bot_count);

    let policy: Box<dyn AnsweringPolicy> = match req.seed.or(state.bot_seed) {
        Some(seed) => Box::new(RandomPolicy::seeded(seed)),
        None => Box::new(RandomPolicy::from_entropy()),
    };

    let battle = match Battle::new(questions, roster, policy) {
        Ok(b) => b.with_feed_capacity(state.feed_capacity),
        Err(e) => return battle_error(e),
    };
    let snapshot = battle.snapshot();

    let on_complete = build_battle_completion_callback(player_name.to_string());
    match state.battle_server.start_battle(battle, Some(on_complete)) {
        Ok(battle_id) => (
            StatusCode::CREATED,
            Json(json!({ "battle_id": battle_id, "snapshot": snapshot })),
        )
            .into_response(),
        Err(e) => battle_error(e),
    }
}

async fn list_battles(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(json!(state.battle_server.list()))).into_response()
}

async fn get_battle(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.battle_server.snapshot(id) {
        Some(snapshot) => (StatusCode::OK, Json(json!(snapshot))).into_response(),
        None => battle_error(BattleError::BattleNotFound),
    }
}

async fn answer_battle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> impl IntoResponse {
    if let Err(e) = state.battle_server.select(id, req.answer).await {
        return battle_error(e);
    }
    current_snapshot(&state, id)
}

async fn submit_battle(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    if let Err(e) = state.battle_server.submit(id).await {
        return battle_error(e);
    }
    current_snapshot(&state, id)
}

async fn delete_battle(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    if state.battle_server.teardown(id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        battle_error(BattleError::BattleNotFound)
    }
}

fn current_snapshot(state: &AppState, id: Uuid) -> Response {
    match state.battle_server.snapshot(id) {
        Some(snapshot) => (StatusCode::OK, Json(json!(snapshot))).into_response(),
        // Reaped between the command and the read
        None => battle_error(BattleError::BattleNotFound),
    }
}

// ── Completion callback ───────────────────────────────────────────────

/// Build the callback run when a battle started over HTTP completes.
pub fn build_battle_completion_callback(player_name: String) -> CompletionCallback {
    Box::new(move |result: BattleResult| {
        let human = result.leaderboard.iter().find(|s| !s.is_bot);
        tracing::info!(
            battle_id = %result.battle_id,
            player = %player_name,
            rank = human.map(|s| s.rank).unwrap_or(0),
            score = human.map(|s| s.score).unwrap_or(0),
            answers = result.answer_log.len(),
            "Battle result"
        );
    })
}
