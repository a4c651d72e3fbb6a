//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Assignment, LevelProfile, SubmissionResult};
use crate::levels::Progress;

#[derive(Deserialize)]
pub struct ValidateKeyIn {
    #[serde(default)]
    pub api_key: String,
}
#[derive(Serialize)]
pub struct ValidateKeyOut {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct AssignmentIn {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "first_level")]
    pub level: i64,
    /// Titles of assignments the learner already finished.
    #[serde(default)]
    pub completed: Vec<String>,
}

fn first_level() -> i64 {
    1
}

#[derive(Serialize)]
pub struct AssignmentOut {
    pub success: bool,
    pub assignment: Assignment,
}

#[derive(Deserialize)]
pub struct SubmitIn {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub assignment: Option<Assignment>,
}
#[derive(Serialize)]
pub struct SubmitOut {
    pub success: bool,
    #[serde(flatten)]
    pub result: SubmissionResult,
}

/// Body for every failed action.
#[derive(Serialize)]
pub struct FailureOut {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    #[serde(default)]
    pub xp: u64,
}
pub type ProgressOut = Progress;

#[derive(Serialize)]
pub struct LevelsOut {
    pub levels: Vec<LevelProfile>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
