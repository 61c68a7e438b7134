//! The interview being scheduled, the record sent to the panel API and the
//! scheduled interviews it lists back.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EvaluationError;
use crate::evaluation::{EvaluationSummary, SkillRating};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewDraft {
    pub subject: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    pub candidate_name: String,
    /// Comma separated skill names
    pub required_expertise: String,
}

fn date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").expect("valid regex"))
}

impl InterviewDraft {
    pub fn validate(&self) -> Result<(), EvaluationError> {
        let required = [
            ("subject", &self.subject),
            ("date", &self.date),
            ("candidate name", &self.candidate_name),
            ("required expertise", &self.required_expertise),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(EvaluationError::InvalidInput(format!("{} is required", name)));
            }
        }
        if !date_pattern().is_match(self.date.trim()) {
            return Err(EvaluationError::InvalidInput(format!(
                "date '{}' is not in YYYY-MM-DD form",
                self.date
            )));
        }
        if self.skills().is_empty() {
            return Err(EvaluationError::InvalidInput(
                "required expertise names no skills".to_string(),
            ));
        }
        Ok(())
    }

    pub fn skills(&self) -> Vec<String> {
        parse_skills(&self.required_expertise)
    }
}

/// Split a free-form skill list on commas, semicolons or newlines, keeping order and
/// repeats.
pub fn parse_skills(text: &str) -> Vec<String> {
    text.split([',', '\n', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// What gets POSTed to `/api/interviews`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewRecord {
    #[serde(flatten)]
    pub draft: InterviewDraft,
    pub expertise_ratings: Vec<SkillRating>,
    pub overall_rating: i64,
}

impl InterviewRecord {
    pub fn new(draft: InterviewDraft, summary: EvaluationSummary) -> Self {
        Self {
            draft,
            expertise_ratings: summary.ratings,
            overall_rating: summary.overall,
        }
    }
}

/// An interview as listed by `GET /api/interviews`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    #[serde(default, alias = "_id")]
    pub id: Value,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub candidate_name: String,
    #[serde(default)]
    pub required_expertise: String,
    #[serde(default)]
    pub status: String,
    /// Expert id or flag; absent, null, false or empty means unassigned
    #[serde(default)]
    pub expert_assigned: Value,
}

impl Interview {
    /// Case-insensitive substring match on subject or candidate name
    pub fn matches(&self, search: &str) -> bool {
        let needle = search.trim().to_lowercase();
        needle.is_empty()
            || self.subject.to_lowercase().contains(&needle)
            || self.candidate_name.to_lowercase().contains(&needle)
    }

    pub fn is_pending_assignment(&self) -> bool {
        match &self.expert_assigned {
            Value::Null => true,
            Value::Bool(assigned) => !assigned,
            Value::String(s) => s.is_empty(),
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::Array(_) | Value::Object(_) => false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

/// Dashboard counts over every listed interview
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterviewStats {
    pub total: usize,
    pub pending_assignments: usize,
    pub completed: usize,
}

impl InterviewStats {
    pub fn from_interviews(interviews: &[Interview]) -> Self {
        Self {
            total: interviews.len(),
            pending_assignments: interviews.iter().filter(|i| i.is_pending_assignment()).count(),
            completed: interviews.iter().filter(|i| i.is_completed()).count(),
        }
    }
}

pub fn filter_interviews<'a>(interviews: &'a [Interview], search: &str) -> Vec<&'a Interview> {
    interviews.iter().filter(|i| i.matches(search)).collect()
}
