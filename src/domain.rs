//! Domain models: difficulty profiles, assignments, evaluations and submission results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One rung of the difficulty ladder.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelProfile {
  pub level: u32,
  pub name: String,
  #[serde(rename = "focus")]
  pub focus_description: String,
  #[serde(default, rename = "ai_integration")]
  pub requires_ai_integration: bool,
  #[serde(default)]
  pub min_xp: u64,
  /// Example project ideas the assignment prompt may draw from.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub examples: Vec<String>,
}

/// XP awarded for a perfect score at `level`.
pub fn base_xp_for_level(level: u32) -> u32 {
  20 + level * 15
}

/// A generated exercise. Produced once per request and never mutated afterwards;
/// the client holds it and sends it back with each attempt.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
  #[serde(default)]
  pub id: String,
  pub title: String,
  #[serde(default)] pub client_name: String,
  #[serde(default)] pub client_emoji: String,
  #[serde(default)] pub scenario: String,
  #[serde(default)] pub task: String,
  #[serde(default)] pub requirements: Vec<String>,
  #[serde(default)] pub success_criteria: Vec<String>,
  #[serde(default)] pub hints: Vec<String>,

  // Copied from the profile that produced it.
  pub level: u32,
  #[serde(default)] pub level_name: String,
  #[serde(default)] pub ai_integration: bool,
  #[serde(default)] pub base_xp: u32,
}

/// Which grader produced an evaluation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMethod {
  Model,
  Keyword,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Evaluation {
  pub score: u8,
  pub criteria_results: BTreeMap<String, bool>,
  pub feedback: String,
  pub missing: Vec<String>,
  pub suggestions: Vec<String>,
  pub method: EvaluationMethod,
}

/// XP outcome of one score.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct Award {
  pub xp: u32,
  pub complete: bool,
}

/// Everything a learner gets back for one attempt.
#[derive(Clone, Debug, Serialize)]
pub struct SubmissionResult {
  #[serde(rename = "code")]
  pub generated_code: String,
  pub evaluation: Evaluation,
  pub xp_earned: u32,
  pub is_complete: bool,
}

impl SubmissionResult {
  /// XP and completion always come from the award for `evaluation.score`.
  pub fn new(generated_code: String, evaluation: Evaluation, award: Award) -> Self {
    Self { generated_code, evaluation, xp_earned: award.xp, is_complete: award.complete }
  }
}
