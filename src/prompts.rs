//! Prompt construction for the three model tasks: assignment generation,
//! code generation and evaluation.
//!
//! Builders are pure: identical inputs give identical prompts. Anything that
//! differs between the web-fundamentals tiers and the AI tiers goes through
//! [`TierStrategy`] rather than separate code paths.

use crate::config::PromptSettings;
use crate::domain::{Assignment, LevelProfile};
use crate::util::{fill_template, prefix_chars};

/// Tokens every AI-tier assignment must list in its success criteria. Their
/// presence shows the page makes an asynchronous call to the text service.
pub const INTEGRATION_MARKERS: [&str; 3] = ["fetch", "openai", "async"];

/// How many recent history entries the assignment prompt names.
pub const RECENT_HISTORY: usize = 3;

/// System + user instruction pair for one model call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptPair {
  pub system: String,
  pub user: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TierStrategy {
  /// HTML, CSS and plain JavaScript.
  Foundations,
  /// Pages that call the text service from the browser.
  AiIntegration,
}

impl TierStrategy {
  pub fn for_profile(profile: &LevelProfile) -> Self {
    Self::from_flag(profile.requires_ai_integration)
  }

  pub fn from_flag(ai_integration: bool) -> Self {
    if ai_integration { Self::AiIntegration } else { Self::Foundations }
  }

  fn assignment_brief(self, profile: &LevelProfile) -> String {
    match self {
      Self::Foundations => fill_template(FOUNDATIONS_BRIEF, &[("focus", profile.focus_description.as_str())]),
      Self::AiIntegration => {
        let examples = if profile.examples.is_empty() {
          String::new()
        } else {
          let list: Vec<String> = profile.examples.iter().map(|e| format!("- {}", e)).collect();
          format!("\nExample projects for this level:\n{}\n", list.join("\n"))
        };
        let markers = marker_list();
        fill_template(AI_BRIEF, &[("examples", examples.as_str()), ("markers", markers.as_str())])
      }
    }
  }

  fn code_rules(self, settings: &PromptSettings) -> String {
    match self {
      Self::Foundations => String::new(),
      Self::AiIntegration => fill_template(
        AI_CODE_SNIPPET,
        &[("endpoint", settings.browser_endpoint.as_str()), ("model", settings.browser_model.as_str())],
      ),
    }
  }
}

fn marker_list() -> String {
  INTEGRATION_MARKERS.iter().map(|m| format!("\"{}\"", m)).collect::<Vec<_>>().join(", ")
}

fn json_list(items: &[String]) -> String {
  serde_json::to_string(items).unwrap_or_else(|_| "[]".into())
}

const ASSIGNMENT_SYSTEM: &str = r#"You are a creative assignment generator for a platform where people learn to build websites by instructing an AI.

You write CHALLENGING, REALISTIC assignments. Write every text field in {language} and address the learner directly as "you".

IMPORTANT:
- Make the scenario recognisable (local businesses, students, clubs, startups).
- The task must be CONCRETE with clear, measurable requirements.
- Give exactly 5 specific success criteria the result MUST satisfy.
- Criteria must be CHECKABLE: short keywords that have to appear in the code.

OUTPUT ONLY VALID JSON:
{
  "title": "Short catchy title",
  "client_name": "Name of the fictional client",
  "client_emoji": "One emoji for the client",
  "scenario": "The story (2-3 sentences)",
  "task": "Concrete task (1-2 sentences)",
  "requirements": ["Requirement 1", "Requirement 2", "Requirement 3", "Requirement 4", "Requirement 5"],
  "success_criteria": ["keyword1", "keyword2", "keyword3", "keyword4", "keyword5"],
  "hints": ["Tip 1", "Tip 2", "Tip 3"]
}"#;

const ASSIGNMENT_USER: &str = "LEVEL: {level} - {name}
FOCUS: {focus}
ASSIGNMENT NUMBER: {number}
{history}
{brief}";

const FOUNDATIONS_BRIEF: &str = "This level focuses on: {focus}

PROGRESSION PER LEVEL:
Level 1 (HTML): text, headings, lists, structure, semantic HTML
Level 2 (Styling): colors, fonts, layout, flexbox, modern CSS
Level 3 (Interaction): buttons, click events, DOM manipulation, animations
Level 4 (Forms): input fields, validation, form handling, data processing

Make the assignment CHALLENGING but achievable for this level.
Success criteria must be relevant HTML/CSS/JS keywords that will appear in the code.";

const AI_BRIEF: &str = "This level REQUIRES AI INTEGRATION. The learner must build a website that:
- calls the OpenAI API from JavaScript in the browser
- shows AI-generated content to the user
- ACTUALLY WORKS and is impressive
{examples}
The success_criteria MUST include {markers} plus relevant UI elements.
Generate an IMPRESSIVE assignment that shows the learner what is possible!";

const CODE_SYSTEM: &str = "You are an expert web developer who generates COMPLETE, WORKING HTML/CSS/JS code.

STRICT RULES:
1. Output ONLY complete HTML (one file, NO markdown, NO explanation)
2. CSS MUST live in a <style> tag inside the HTML
3. JavaScript MUST live in a <script> tag inside the HTML
4. NO external files, EVERYTHING inline
5. For images use: https://picsum.photos/[width]/[height]?random=[number]
6. Modern, BEAUTIFUL styling (gradients, shadows, border-radius, animations)
7. RESPONSIVE design
8. The code must WORK DIRECTLY inside an iframe
9. Visible page text is written in {language}
{ai_rules}
ASSIGNMENT CONTEXT:
Title: {title}
Client: {client}
Scenario: {scenario}
Task: {task}
Requirements: {requirements}

Start DIRECTLY with <!DOCTYPE html> - NO explanation, NO markdown!";

const AI_CODE_SNIPPET: &str = "
REQUIRED FOR AI INTEGRATION:
The code MUST contain this working API call:

// The platform injects the key at render time; never hard-code one.
const OPENAI_API_KEY = window.OPENAI_API_KEY;

async function callAI(prompt) {
    const response = await fetch('{endpoint}', {
        method: 'POST',
        headers: {
            'Authorization': 'Bearer ' + OPENAI_API_KEY,
            'Content-Type': 'application/json'
        },
        body: JSON.stringify({
            model: '{model}',
            messages: [{role: 'user', content: prompt}],
            max_tokens: 1000
        })
    });
    const data = await response.json();
    return data.choices[0].message.content;
}

Use this function for all AI functionality!
";

const EVALUATION_SYSTEM: &str = r#"You are a fair reviewer of web development assignments.
Your job is to judge whether the code satisfies the requirements.

SCORING GUIDELINES:
- 100: All requirements implemented well, looks professional
- 85-99: Almost perfect, small details could be better
- 70-84: Good work, most requirements are present
- 50-69: The basics are there but important things are missing
- 30-49: Partially done, many points to improve
- 0-29: Does not satisfy the assignment

BE FAIR BUT NOT TOO STRICT:
- If the basics are right and it works, give at least 70
- Small styling differences are not big problems
- Focus on functionality and the core requirements

Write feedback, missing and suggestions in {language}.

Output ONLY valid JSON:
{
  "score": 0-100,
  "criteria_results": {"criterion": true/false, ...},
  "feedback": "Specific feedback",
  "missing": ["What is concretely missing"],
  "suggestions": ["Concrete improvement for the prompt"]
}"#;

const EVALUATION_USER: &str = "ASSIGNMENT: {title}
CLIENT: {client}
TASK: {task}

REQUIREMENTS:
{requirements}

SUCCESS CRITERIA (keywords/elements):
{criteria}

LEARNER'S PROMPT:
{instruction}

GENERATED CODE:
{code}

Judge honestly but fairly.";

/// Prompt asking for one new assignment at `profile`'s level.
///
/// `history` holds titles of assignments the learner already did; the most
/// recent [`RECENT_HISTORY`] are named so the model avoids repeating them.
pub fn assignment_prompt(settings: &PromptSettings, profile: &LevelProfile, history: &[String]) -> PromptPair {
  let history_note = if history.is_empty() {
    String::new()
  } else {
    let recent = &history[history.len().saturating_sub(RECENT_HISTORY)..];
    format!(
      "\nThe learner has already completed {} assignments. Recent: {}. Do NOT repeat these titles or themes; give something NEW.\n",
      history.len(),
      recent.join(", ")
    )
  };
  let number = (history.len() + 1).to_string();
  let level = profile.level.to_string();
  let brief = TierStrategy::for_profile(profile).assignment_brief(profile);

  PromptPair {
    system: fill_template(ASSIGNMENT_SYSTEM, &[("language", settings.language.as_str())]),
    user: fill_template(
      ASSIGNMENT_USER,
      &[
        ("level", level.as_str()),
        ("name", profile.name.as_str()),
        ("focus", profile.focus_description.as_str()),
        ("number", number.as_str()),
        ("history", history_note.as_str()),
        ("brief", brief.as_str()),
      ],
    ),
  }
}

/// Prompt turning the learner's instruction into one self-contained page.
pub fn code_prompt(settings: &PromptSettings, assignment: &Assignment, instruction: &str) -> PromptPair {
  let ai_rules = TierStrategy::from_flag(assignment.ai_integration).code_rules(settings);
  let requirements = json_list(&assignment.requirements);

  PromptPair {
    system: fill_template(
      CODE_SYSTEM,
      &[
        ("language", settings.language.as_str()),
        ("ai_rules", ai_rules.as_str()),
        ("title", assignment.title.as_str()),
        ("client", assignment.client_name.as_str()),
        ("scenario", assignment.scenario.as_str()),
        ("task", assignment.task.as_str()),
        ("requirements", requirements.as_str()),
      ],
    ),
    user: format!("Generate code for:\n\n{}", instruction),
  }
}

/// Prompt asking the model to grade `code`. Only the first
/// `settings.eval_code_limit` characters of the code are sent.
pub fn evaluation_prompt(
  settings: &PromptSettings,
  assignment: &Assignment,
  instruction: &str,
  code: &str,
) -> PromptPair {
  let requirements: Vec<String> = assignment.requirements.iter().map(|r| format!("- {}", r)).collect();
  let requirements = requirements.join("\n");
  let criteria = json_list(&assignment.success_criteria);
  let code = prefix_chars(code, settings.eval_code_limit);

  PromptPair {
    system: fill_template(EVALUATION_SYSTEM, &[("language", settings.language.as_str())]),
    user: fill_template(
      EVALUATION_USER,
      &[
        ("title", assignment.title.as_str()),
        ("client", assignment.client_name.as_str()),
        ("task", assignment.task.as_str()),
        ("requirements", requirements.as_str()),
        ("criteria", criteria.as_str()),
        ("instruction", instruction),
        ("code", code),
      ],
    ),
  }
}
