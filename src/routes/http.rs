//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; credentials are skipped, sizes are logged.

use std::sync::Arc;
use axum::{
  extract::{rejection::JsonRejection, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{field, info, instrument, warn, Span};

use crate::logic::{request_assignment, submit_instruction, validate_credential, ActionError};
use crate::protocol::*;
use crate::state::AppState;

impl IntoResponse for ActionError {
  fn into_response(self) -> Response {
    let status = if self.is_input_error() { StatusCode::BAD_REQUEST } else { StatusCode::BAD_GATEWAY };
    warn!(target: "vibecode_tutor", %status, error = %self, "Action failed");
    (status, Json(FailureOut { success: false, error: self.to_string() })).into_response()
  }
}

/// Unreadable or mistyped JSON bodies become the same failure shape as any other input error.
impl From<JsonRejection> for ActionError {
  fn from(rejection: JsonRejection) -> Self {
    ActionError::MalformedRequest(rejection.body_text())
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_levels(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(LevelsOut { levels: state.catalog.profiles().to_vec() })
}

#[instrument(level = "info", skip(state), fields(xp = q.xp))]
pub async fn http_get_progress(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ProgressQuery>,
) -> impl IntoResponse {
  let out: ProgressOut = state.catalog.progress_for(q.xp);
  Json(out)
}

#[instrument(level = "info", skip_all)]
pub async fn http_post_validate_key(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<ValidateKeyIn>, JsonRejection>,
) -> Result<Json<ValidateKeyOut>, ActionError> {
  let Json(body) = payload?;
  let status = validate_credential(&state, &body.api_key).await;
  info!(target: "vibecode_tutor", valid = status.is_valid(), "HTTP credential checked");
  Ok(Json(ValidateKeyOut { valid: status.is_valid(), error: status.reason() }))
}

#[instrument(level = "info", skip_all, fields(level = field::Empty, completed = field::Empty))]
pub async fn http_post_assignment(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<AssignmentIn>, JsonRejection>,
) -> Result<Json<AssignmentOut>, ActionError> {
  let Json(body) = payload?;
  Span::current().record("level", body.level).record("completed", body.completed.len());
  let assignment = request_assignment(&state, &body.api_key, body.level, &body.completed).await?;
  info!(target: "assignment", id = %assignment.id, level = assignment.level, "HTTP assignment served");
  Ok(Json(AssignmentOut { success: true, assignment }))
}

#[instrument(level = "info", skip_all, fields(prompt_len = field::Empty))]
pub async fn http_post_submit(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<SubmitIn>, JsonRejection>,
) -> Result<Json<SubmitOut>, ActionError> {
  let Json(body) = payload?;
  Span::current().record("prompt_len", body.prompt.len());
  let r = submit_instruction(&state, &body.api_key, &body.prompt, body.assignment.as_ref()).await?;
  info!(target: "evaluation", score = r.evaluation.score, xp = r.xp_earned, complete = r.is_complete, "HTTP submission evaluated");
  Ok(Json(SubmitOut { success: true, result: r }))
}
