//! The difficulty ladder: an ordered, immutable table of `LevelProfile`s.
//!
//! Lookups never fail. Out-of-range levels clamp to the nearest rung so
//! callers always get a usable profile.

use serde::Serialize;
use thiserror::Error;

use crate::domain::LevelProfile;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
  #[error("level ladder is empty")]
  Empty,
  #[error("levels must be contiguous from 1: expected {expected}, found {found}")]
  NotContiguous { expected: u32, found: u32 },
  #[error("min_xp must not decrease: level {level} has {min_xp} after {previous}")]
  DecreasingXp { level: u32, min_xp: u64, previous: u64 },
}

#[derive(Clone, Debug)]
pub struct LevelCatalog {
  profiles: Vec<LevelProfile>,
}

/// Where a learner with some cumulative XP stands on the ladder.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Progress {
  pub xp: u64,
  pub level: u32,
  pub name: String,
  pub next_level_xp: Option<u64>,
}

impl LevelCatalog {
  pub fn new(profiles: Vec<LevelProfile>) -> Result<Self, CatalogError> {
    if profiles.is_empty() {
      return Err(CatalogError::Empty);
    }
    let mut previous = 0u64;
    for (idx, p) in profiles.iter().enumerate() {
      let expected = idx as u32 + 1;
      if p.level != expected {
        return Err(CatalogError::NotContiguous { expected, found: p.level });
      }
      if p.min_xp < previous {
        return Err(CatalogError::DecreasingXp { level: p.level, min_xp: p.min_xp, previous });
      }
      previous = p.min_xp;
    }
    Ok(Self { profiles })
  }

  pub fn profiles(&self) -> &[LevelProfile] {
    &self.profiles
  }

  pub fn len(&self) -> usize {
    self.profiles.len()
  }

  /// Profile for `level`, clamped into `1..=len`.
  pub fn profile_for(&self, level: i64) -> &LevelProfile {
    let last = self.profiles.len() - 1;
    let idx = if level < 1 { 0 } else { ((level - 1) as u64).min(last as u64) as usize };
    &self.profiles[idx]
  }

  /// Highest profile whose threshold `xp` has reached.
  pub fn progress_for(&self, xp: u64) -> Progress {
    let pos = self.profiles.iter().rposition(|p| p.min_xp <= xp).unwrap_or(0);
    let current = &self.profiles[pos];
    Progress {
      xp,
      level: current.level,
      name: current.name.clone(),
      next_level_xp: self.profiles.get(pos + 1).map(|p| p.min_xp),
    }
  }
}

impl Default for LevelCatalog {
  fn default() -> Self {
    Self { profiles: default_ladder() }
  }
}

fn rung(level: u32, name: &str, focus: &str, ai: bool, min_xp: u64, examples: &[&str]) -> LevelProfile {
  LevelProfile {
    level,
    name: name.into(),
    focus_description: focus.into(),
    requires_ai_integration: ai,
    min_xp,
    examples: examples.iter().map(|s| s.to_string()).collect(),
  }
}

/// Built-in ladder: four web fundamentals tiers, then four tiers that call the text service.
pub fn default_ladder() -> Vec<LevelProfile> {
  vec![
    rung(1, "HTML Basics", "Simple HTML structure and text: headings, lists, semantic markup", false, 0, &[]),
    rung(2, "Styling", "CSS styling, colors, fonts, layout with flexbox", false, 50, &[]),
    rung(3, "Interaction", "JavaScript buttons, click events, DOM manipulation, animations", false, 150, &[]),
    rung(4, "Forms", "Input fields, validation, form handling and data processing", false, 300, &[]),
    rung(5, "AI Text", "AI-generated content", true, 500,
      &["Blog post generator", "Product description writer", "Email template maker", "Slogan generator for businesses"]),
    rung(6, "AI Chat", "Chatbot integration", true, 750,
      &["Customer service chatbot", "Personal assistant", "FAQ answerer", "Virtual sales agent"]),
    rung(7, "AI Tools", "AI-powered tools and analysis", true, 1000,
      &["Sentiment analyser for reviews", "Text summariser", "Translation app", "Code explainer"]),
    rung(8, "AI Apps", "Complete AI applications", true, 1500,
      &["AI-powered dashboard", "Interactive learning app", "AI content management system", "Multi-purpose AI workspace"]),
  ]
}
