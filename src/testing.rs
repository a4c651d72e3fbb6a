//! Test doubles shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{base_xp_for_level, Assignment};
use crate::openai::{ChatRequest, GatewayError, TextGateway};

/// Replays canned replies in order and records every request it sees.
/// Runs out → `Transport` error.
pub struct ScriptedGateway {
  replies: Mutex<VecDeque<Result<String, GatewayError>>>,
  seen: Mutex<Vec<(String, ChatRequest)>>,
}

impl ScriptedGateway {
  pub fn new(replies: Vec<Result<String, GatewayError>>) -> Self {
    Self { replies: Mutex::new(replies.into()), seen: Mutex::new(Vec::new()) }
  }

  pub fn requests(&self) -> Vec<(String, ChatRequest)> {
    self.seen.lock().unwrap().clone()
  }
}

#[async_trait]
impl TextGateway for ScriptedGateway {
  async fn complete(&self, credential: &str, request: &ChatRequest) -> Result<String, GatewayError> {
    self.seen.lock().unwrap().push((credential.to_string(), request.clone()));
    self.replies
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or_else(|| Err(GatewayError::Transport("script exhausted".into())))
  }
}

pub fn assignment_with_criteria(criteria: &[&str]) -> Assignment {
  Assignment {
    id: "test".into(),
    title: "Coffee corner".into(),
    client_name: "Sam".into(),
    client_emoji: "☕".into(),
    scenario: "Sam opens a coffee corner.".into(),
    task: "Build the menu page.".into(),
    requirements: vec!["A menu".into()],
    success_criteria: criteria.iter().map(|s| s.to_string()).collect(),
    hints: vec![],
    level: 1,
    level_name: "HTML Basics".into(),
    ai_integration: false,
    base_xp: base_xp_for_level(1),
  }
}
