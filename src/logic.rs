//! The three learner actions behind the HTTP layer:
//!   - request a new assignment for a level
//!   - submit an instruction: generate code, grade it, award XP
//!   - validate a credential
//!
//! Input problems are rejected before any outbound call. Generation failures
//! end the action with a clear reason; grading failures never do (see
//! `evaluator::evaluate_with_fallback`).

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{base_xp_for_level, Assignment, LevelProfile, SubmissionResult};
use crate::evaluator::{evaluate_with_fallback, ModelEvaluator, Submission};
use crate::extract::extract;
use crate::normalize::normalize;
use crate::openai::{ChatRequest, GatewayError};
use crate::progression::award;
use crate::prompts::{assignment_prompt, code_prompt, INTEGRATION_MARKERS};
use crate::state::AppState;
use crate::util::trunc_for_log;

#[derive(Debug, Error)]
pub enum ActionError {
  #[error("credential required")]
  MissingCredential,
  #[error("instruction required")]
  MissingInstruction,
  #[error("assignment required")]
  MissingAssignment,
  #[error("malformed request: {0}")]
  MalformedRequest(String),
  #[error("could not generate an assignment: {0}")]
  AssignmentUnavailable(String),
  #[error("could not generate code: {0}")]
  CodeUnavailable(String),
}

impl ActionError {
  /// True for problems with the caller's input (no outbound call was made).
  pub fn is_input_error(&self) -> bool {
    matches!(
      self,
      Self::MissingCredential | Self::MissingInstruction | Self::MissingAssignment | Self::MalformedRequest(_)
    )
  }
}

/// Outcome of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
  Valid,
  /// Empty or without the provider's prefix; no call was made.
  BadFormat,
  /// The probe call failed.
  Rejected(GatewayError),
}

impl CredentialStatus {
  pub fn is_valid(&self) -> bool {
    matches!(self, Self::Valid)
  }

  pub fn reason(&self) -> Option<String> {
    match self {
      Self::Valid => None,
      Self::BadFormat => Some("credential has an unrecognised format".into()),
      Self::Rejected(e) => Some(client_reason(e)),
    }
  }
}

/// Upstream error bodies can be large; callers get the head only.
const CLIENT_REASON_CHARS: usize = 200;

fn client_reason(e: &GatewayError) -> String {
  trunc_for_log(&e.to_string(), CLIENT_REASON_CHARS)
}

fn require<'a>(value: &'a str, missing: ActionError) -> Result<&'a str, ActionError> {
  let v = value.trim();
  if v.is_empty() { Err(missing) } else { Ok(v) }
}

/// Fields the model is asked to produce for an assignment.
#[derive(Deserialize)]
struct GeneratedAssignment {
  title: String,
  #[serde(default)] client_name: String,
  #[serde(default)] client_emoji: String,
  #[serde(default)] scenario: String,
  task: String,
  #[serde(default)] requirements: Vec<String>,
  success_criteria: Vec<String>,
  #[serde(default)] hints: Vec<String>,
}

fn assignment_from_payload(payload: Map<String, Value>, profile: &LevelProfile) -> Result<Assignment, String> {
  let generated: GeneratedAssignment =
    serde_json::from_value(Value::Object(payload)).map_err(|e| format!("unexpected assignment shape: {e}"))?;
  if generated.title.trim().is_empty() || generated.task.trim().is_empty() {
    return Err("assignment is missing a title or task".into());
  }

  Ok(Assignment {
    id: Uuid::new_v4().to_string(),
    title: generated.title,
    client_name: generated.client_name,
    client_emoji: generated.client_emoji,
    scenario: generated.scenario,
    task: generated.task,
    requirements: generated.requirements,
    success_criteria: generated.success_criteria,
    hints: generated.hints,
    level: profile.level,
    level_name: profile.name.clone(),
    ai_integration: profile.requires_ai_integration,
    base_xp: base_xp_for_level(profile.level),
  })
}

#[instrument(level = "info", skip(state, credential, history), fields(history_len = history.len()))]
pub async fn request_assignment(
  state: &AppState,
  credential: &str,
  level: i64,
  history: &[String],
) -> Result<Assignment, ActionError> {
  let credential = require(credential, ActionError::MissingCredential)?;
  let profile = state.catalog.profile_for(level);
  let g = &state.config.gateway;

  let pair = assignment_prompt(&state.config.prompts, profile, history);
  let request = ChatRequest::new(&g.strong_model, g.assignment_max_tokens, g.temperature).prompt(pair);

  let raw = state.gateway.complete(credential, &request).await.map_err(|e| {
    error!(target: "assignment", level = profile.level, error = %e, "Assignment generation call failed");
    ActionError::AssignmentUnavailable(client_reason(&e))
  })?;

  let assignment = extract(&raw)
    .map_err(|e| e.to_string())
    .and_then(|payload| assignment_from_payload(payload, profile))
    .map_err(|reason| {
      error!(target: "assignment", level = profile.level, %reason, preview = %trunc_for_log(&raw, 200), "Model reply is not a usable assignment");
      ActionError::AssignmentUnavailable(reason)
    })?;

  if assignment.ai_integration {
    let criteria = assignment.success_criteria.join(" ").to_lowercase();
    let absent: Vec<&str> = INTEGRATION_MARKERS.iter().copied().filter(|m| !criteria.contains(m)).collect();
    if !absent.is_empty() {
      warn!(target: "assignment", id = %assignment.id, ?absent, "AI-tier assignment lacks integration markers");
    }
  }

  info!(
    target: "assignment",
    id = %assignment.id,
    level = assignment.level,
    title = %assignment.title,
    criteria = assignment.success_criteria.len(),
    "Assignment generated"
  );
  Ok(assignment)
}

#[instrument(level = "info", skip_all, fields(instruction_len = instruction.len(), has_assignment = assignment.is_some()))]
pub async fn submit_instruction(
  state: &AppState,
  credential: &str,
  instruction: &str,
  assignment: Option<&Assignment>,
) -> Result<SubmissionResult, ActionError> {
  let credential = require(credential, ActionError::MissingCredential)?;
  let instruction = require(instruction, ActionError::MissingInstruction)?;
  let assignment = assignment.ok_or(ActionError::MissingAssignment)?;
  let g = &state.config.gateway;

  // The client holds the assignment; XP is derived from the ladder, not from its base_xp field.
  let profile = state.catalog.profile_for(i64::from(assignment.level));
  let base_xp = base_xp_for_level(profile.level);

  let pair = code_prompt(&state.config.prompts, assignment, instruction);
  let request = ChatRequest::new(&g.strong_model, g.code_max_tokens, g.temperature).prompt(pair);
  let raw = state.gateway.complete(credential, &request).await.map_err(|e| {
    error!(target: "vibecode_tutor", id = %assignment.id, error = %e, "Code generation call failed");
    ActionError::CodeUnavailable(client_reason(&e))
  })?;
  if raw.trim().is_empty() {
    error!(target: "vibecode_tutor", id = %assignment.id, "Code generation returned nothing");
    return Err(ActionError::CodeUnavailable("empty response".into()));
  }
  let code = normalize(&raw);

  let grader = ModelEvaluator::new(state.gateway.clone(), credential, g, &state.config.prompts);
  let submission = Submission { assignment, instruction, code: &code };
  let evaluation = evaluate_with_fallback(&grader, &submission).await;
  let earned = award(evaluation.score, base_xp);

  info!(
    target: "evaluation",
    id = %assignment.id,
    score = evaluation.score,
    method = ?evaluation.method,
    xp = earned.xp,
    complete = earned.complete,
    "Submission graded"
  );
  Ok(SubmissionResult::new(code, evaluation, earned))
}

#[instrument(level = "info", skip_all)]
pub async fn validate_credential(state: &AppState, credential: &str) -> CredentialStatus {
  let g = &state.config.gateway;
  let credential = credential.trim();
  if credential.is_empty() || !credential.starts_with(g.credential_prefix.as_str()) {
    return CredentialStatus::BadFormat;
  }

  let probe = ChatRequest::new(&g.fast_model, g.probe_max_tokens, g.temperature).user("Hi");
  match state.gateway.complete(credential, &probe).await {
    Ok(_) => CredentialStatus::Valid,
    Err(e) => {
      warn!(target: "vibecode_tutor", error = %e, "Credential probe failed");
      CredentialStatus::Rejected(e)
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::config::AppConfig;
  use crate::domain::EvaluationMethod;
  use crate::openai::Role;
  use crate::testing::{assignment_with_criteria, ScriptedGateway};

  fn state(gw: &Arc<ScriptedGateway>) -> AppState {
    AppState::new(AppConfig::default(), gw.clone())
  }

  const ASSIGNMENT_REPLY: &str = r#"Here is your assignment:
```json
{
  "title": "Flower shop flyer",
  "client_name": "Fleur",
  "client_emoji": "💐",
  "scenario": "Fleur opens a shop.",
  "task": "Build a flyer page.",
  "requirements": ["Header", "Price list", "Button", "Colors"],
  "success_criteria": ["h1", "ul", "button", "color", "footer"],
  "hints": ["Start with a header", "Use a list", "Pick two colors"]
}
```"#;

  #[tokio::test]
  async fn assignment_gets_level_fields_from_clamped_profile() {
    let gw = Arc::new(ScriptedGateway::new(vec![Ok(ASSIGNMENT_REPLY.into())]));
    let a = request_assignment(&state(&gw), "sk-abc", 42, &["Old one".into()]).await.expect("assignment");

    assert_eq!(a.title, "Flower shop flyer");
    assert_eq!(a.success_criteria.len(), 5);
    assert_eq!(a.level, 8);
    assert_eq!(a.level_name, "AI Apps");
    assert!(a.ai_integration);
    assert_eq!(a.base_xp, 140);
    assert!(!a.id.is_empty());

    let calls = gw.requests();
    assert_eq!(calls.len(), 1);
    let (credential, req) = &calls[0];
    assert_eq!(credential, "sk-abc");
    assert_eq!(req.messages[0].role, Role::System);
    assert!(req.messages[1].content.contains("Old one"));
    assert_eq!(req.max_tokens, 4000);
  }

  #[tokio::test]
  async fn missing_credential_makes_no_call() {
    let gw = Arc::new(ScriptedGateway::new(vec![]));
    let err = request_assignment(&state(&gw), "  ", 1, &[]).await.unwrap_err();
    assert!(matches!(err, ActionError::MissingCredential));
    assert!(err.is_input_error());
    assert!(gw.requests().is_empty());
  }

  #[tokio::test]
  async fn gateway_failure_or_bad_reply_means_no_assignment() {
    for reply in [
      Err(GatewayError::QuotaExceeded),
      Ok("Sorry, I can't do that.".to_string()),
      Ok("{\"title\": \"No task or criteria\"}".to_string()),
      Ok("{\"title\": \" \", \"task\": \"x\", \"success_criteria\": []}".to_string()),
    ] {
      let gw = Arc::new(ScriptedGateway::new(vec![reply]));
      let err = request_assignment(&state(&gw), "sk-abc", 1, &[]).await.unwrap_err();
      assert!(matches!(err, ActionError::AssignmentUnavailable(_)), "{err:?}");
      assert!(!err.is_input_error());
    }
  }

  #[tokio::test]
  async fn full_success_with_evaluation_timeout() {
    let page = "```html\n<html><body><button onclick=\"go()\">Click</button><style>p{color:red}</style></body></html>\n```";
    let gw = Arc::new(ScriptedGateway::new(vec![Ok(page.into()), Err(GatewayError::Timeout)]));
    let a = assignment_with_criteria(&["button", "click", "color"]);

    let r = submit_instruction(&state(&gw), "sk-abc", "a red button", Some(&a)).await.expect("result");
    assert!(r.generated_code.starts_with("<!DOCTYPE html>\n<html>"));
    assert_eq!(r.evaluation.method, EvaluationMethod::Keyword);
    assert_eq!(r.evaluation.score, 100);
    assert_eq!(r.xp_earned, 35);
    assert!(r.is_complete);
    assert_eq!(gw.requests().len(), 2);
  }

  #[tokio::test]
  async fn partial_success_with_evaluation_timeout() {
    let gw = Arc::new(ScriptedGateway::new(vec![
      Ok("<html><button>Click me</button></html>".into()),
      Err(GatewayError::Timeout),
    ]));
    let a = assignment_with_criteria(&["button", "click", "color"]);

    let r = submit_instruction(&state(&gw), "sk-abc", "a button", Some(&a)).await.expect("result");
    assert_eq!(r.evaluation.score, 70);
    assert_eq!(r.evaluation.missing, vec!["color"]);
    assert_eq!(r.xp_earned, 21);
    assert!(r.is_complete);
  }

  #[tokio::test]
  async fn model_grade_drives_award() {
    let gw = Arc::new(ScriptedGateway::new(vec![
      Ok("<!DOCTYPE html><html></html>".into()),
      Ok("{\"score\": 55, \"feedback\": \"Half way\"}".into()),
    ]));
    let a = assignment_with_criteria(&["button"]);

    let r = submit_instruction(&state(&gw), "sk-abc", "anything", Some(&a)).await.expect("result");
    assert_eq!(r.evaluation.method, EvaluationMethod::Model);
    assert_eq!(r.xp_earned, 10);
    assert!(!r.is_complete);
  }

  #[tokio::test]
  async fn inflated_base_xp_is_ignored() {
    let gw = Arc::new(ScriptedGateway::new(vec![Ok("<html>button</html>".into()), Err(GatewayError::Timeout)]));
    let mut a = assignment_with_criteria(&["button"]);
    a.base_xp = 10_000;

    let r = submit_instruction(&state(&gw), "sk-abc", "x", Some(&a)).await.expect("result");
    assert_eq!(r.xp_earned, 35);
  }

  #[tokio::test]
  async fn code_generation_failure_is_fatal() {
    for reply in [Err(GatewayError::Unauthorized), Ok("   ".to_string())] {
      let gw = Arc::new(ScriptedGateway::new(vec![reply]));
      let a = assignment_with_criteria(&["button"]);
      let err = submit_instruction(&state(&gw), "sk-abc", "x", Some(&a)).await.unwrap_err();
      assert!(matches!(err, ActionError::CodeUnavailable(_)), "{err:?}");
      assert_eq!(gw.requests().len(), 1);
    }
  }

  #[tokio::test]
  async fn large_upstream_body_is_shortened_for_the_caller() {
    let body = "x".repeat(5_000);
    let gw = Arc::new(ScriptedGateway::new(vec![Err(GatewayError::Upstream { status: 500, body: body.clone() })]));
    let a = assignment_with_criteria(&["button"]);
    let err = submit_instruction(&state(&gw), "sk-abc", "x", Some(&a)).await.unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("could not generate code: text service returned HTTP 500"), "{message}");
    assert!(!message.contains(&body));
    assert!(message.chars().count() < 300);
  }

  #[tokio::test]
  async fn submission_input_errors() {
    let gw = Arc::new(ScriptedGateway::new(vec![]));
    let st = state(&gw);
    let a = assignment_with_criteria(&["button"]);

    assert!(matches!(submit_instruction(&st, "", "x", Some(&a)).await, Err(ActionError::MissingCredential)));
    assert!(matches!(submit_instruction(&st, "sk-1", " ", Some(&a)).await, Err(ActionError::MissingInstruction)));
    assert!(matches!(submit_instruction(&st, "sk-1", "x", None).await, Err(ActionError::MissingAssignment)));
    assert!(gw.requests().is_empty());
  }

  #[tokio::test]
  async fn credential_checks() {
    let gw = Arc::new(ScriptedGateway::new(vec![Ok("Hello".into()), Err(GatewayError::Unauthorized)]));
    let st = state(&gw);

    assert_eq!(validate_credential(&st, "not-a-key").await, CredentialStatus::BadFormat);
    assert_eq!(validate_credential(&st, "").await, CredentialStatus::BadFormat);
    assert!(gw.requests().is_empty());

    assert!(validate_credential(&st, " sk-good ").await.is_valid());
    let rejected = validate_credential(&st, "sk-revoked").await;
    assert_eq!(rejected, CredentialStatus::Rejected(GatewayError::Unauthorized));
    assert!(!rejected.is_valid());
    assert!(rejected.reason().is_some());

    let calls = gw.requests();
    assert_eq!(calls[0].0, "sk-good");
    assert_eq!(calls[0].1.max_tokens, 5);
  }
}
