//! Grading generated code against an assignment.
//!
//! - [`ModelEvaluator`] implements [`Evaluator`] and asks the text service for a verdict;
//! - [`KeywordEvaluator`] checks success-criteria tokens in the code and cannot fail.
//!
//! [`evaluate_with_fallback`] tries the primary grader when it reports itself
//! available and degrades to keywords on any failure, so a learner always gets
//! a score.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::{GatewaySettings, PromptSettings};
use crate::domain::{Assignment, Evaluation, EvaluationMethod};
use crate::extract::{extract, ExtractionError};
use crate::openai::{ChatRequest, GatewayError, TextGateway};
use crate::prompts::evaluation_prompt;
use crate::util::trunc_for_log;

const FALLBACK_SUGGESTIONS: [&str; 2] = [
  "Be more specific in your prompt",
  "Name every requirement explicitly",
];

#[derive(Debug, Error)]
pub enum EvaluationError {
  #[error(transparent)]
  Gateway(#[from] GatewayError),
  #[error(transparent)]
  Extraction(#[from] ExtractionError),
  #[error("verdict has no numeric score")]
  MissingScore,
}

/// What is being graded.
#[derive(Clone, Copy, Debug)]
pub struct Submission<'a> {
  pub assignment: &'a Assignment,
  pub instruction: &'a str,
  pub code: &'a str,
}

#[async_trait]
pub trait Evaluator: Send + Sync {
  fn method(&self) -> EvaluationMethod;

  /// Whether this grader can be tried right now.
  fn is_available(&self) -> bool {
    true
  }

  async fn evaluate(&self, submission: &Submission<'_>) -> Result<Evaluation, EvaluationError>;
}

/// Grades through the text service using the learner's credential.
pub struct ModelEvaluator {
  gateway: Arc<dyn TextGateway>,
  credential: String,
  gateway_settings: GatewaySettings,
  prompt_settings: PromptSettings,
}

impl ModelEvaluator {
  pub fn new(
    gateway: Arc<dyn TextGateway>,
    credential: impl Into<String>,
    gateway_settings: &GatewaySettings,
    prompt_settings: &PromptSettings,
  ) -> Self {
    Self {
      gateway,
      credential: credential.into(),
      gateway_settings: gateway_settings.clone(),
      prompt_settings: prompt_settings.clone(),
    }
  }
}

#[async_trait]
impl Evaluator for ModelEvaluator {
  fn method(&self) -> EvaluationMethod {
    EvaluationMethod::Model
  }

  fn is_available(&self) -> bool {
    !self.credential.trim().is_empty()
  }

  #[instrument(target = "evaluation", level = "info", skip_all, fields(title = %submission.assignment.title, code_len = submission.code.len()))]
  async fn evaluate(&self, submission: &Submission<'_>) -> Result<Evaluation, EvaluationError> {
    let pair = evaluation_prompt(&self.prompt_settings, submission.assignment, submission.instruction, submission.code);
    let s = &self.gateway_settings;
    let request = ChatRequest::new(&s.fast_model, s.evaluation_max_tokens, s.temperature).prompt(pair);

    let raw = self.gateway.complete(&self.credential, &request).await?;
    let payload = extract(&raw).map_err(|e| {
      debug!(target: "evaluation", preview = %trunc_for_log(&raw, 160), "Verdict not extractable");
      e
    })?;
    verdict_from_payload(&payload)
  }
}

/// Read a model verdict. Only `score` is required; other fields are taken
/// as far as they have the expected shape.
fn verdict_from_payload(payload: &Map<String, Value>) -> Result<Evaluation, EvaluationError> {
  let score = payload.get("score").and_then(Value::as_f64).ok_or(EvaluationError::MissingScore)?;

  let criteria_results: BTreeMap<String, bool> = payload
    .get("criteria_results")
    .and_then(Value::as_object)
    .map(|m| m.iter().filter_map(|(k, v)| v.as_bool().map(|b| (k.clone(), b))).collect())
    .unwrap_or_default();

  Ok(Evaluation {
    score: score.clamp(0.0, 100.0).round() as u8,
    criteria_results,
    feedback: payload.get("feedback").and_then(Value::as_str).unwrap_or_default().to_string(),
    missing: string_list(payload.get("missing")),
    suggestions: string_list(payload.get("suggestions")),
    method: EvaluationMethod::Model,
  })
}

fn string_list(v: Option<&Value>) -> Vec<String> {
  v.and_then(Value::as_array)
    .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
    .unwrap_or_default()
}

/// Deterministic grader: a criterion passes when its token occurs in the code,
/// ignoring case.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordEvaluator;

impl KeywordEvaluator {
  pub fn grade(&self, submission: &Submission<'_>) -> Evaluation {
    let code = submission.code.to_lowercase();
    let criteria = &submission.assignment.success_criteria;

    let mut criteria_results = BTreeMap::new();
    let mut missing = Vec::new();
    let mut met = 0usize;
    for token in criteria {
      let found = code.contains(&token.to_lowercase());
      let first = criteria_results.insert(token.clone(), found).is_none();
      if found {
        met += 1;
      } else if first {
        missing.push(token.clone());
      }
    }
    let total = criteria.len().max(1);

    Evaluation {
      score: keyword_score(met, total),
      criteria_results,
      feedback: format!("{}/{} criteria found in the code", met, total),
      missing,
      suggestions: FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
      method: EvaluationMethod::Keyword,
    }
  }
}

/// Score for `met` of `total` criteria. Ratios are compared in integers so
/// 4/5 lands exactly on the 0.8 band.
pub fn keyword_score(met: usize, total: usize) -> u8 {
  let total = total.max(1);
  if met >= total {
    100
  } else if 5 * met >= 4 * total {
    85
  } else if 5 * met >= 3 * total {
    70
  } else if 5 * met >= 2 * total {
    55
  } else {
    35
  }
}

/// Grade with `primary` when available, otherwise (or on failure) with keywords.
#[instrument(target = "evaluation", level = "info", skip_all, fields(primary = ?primary.method()))]
pub async fn evaluate_with_fallback(primary: &dyn Evaluator, submission: &Submission<'_>) -> Evaluation {
  if primary.is_available() {
    match primary.evaluate(submission).await {
      Ok(evaluation) => return evaluation,
      Err(e) => warn!(target: "evaluation", error = %e, "Primary grader failed; using keyword fallback"),
    }
  } else {
    warn!(target: "evaluation", "Primary grader unavailable; using keyword fallback");
  }
  KeywordEvaluator.grade(submission)
}
