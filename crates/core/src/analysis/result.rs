//! Typed results parsed from the model's JSON answer.
//!
//! JSON mode guarantees syntax, not shape, so every field has a default and wrong-typed values
//! are treated as absent.

use crate::error::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const DEFAULT_SUMMARY_TITLE: &str = "Document Summary";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    pub title: String,
    pub content: String,
    pub key_points: Vec<String>,
}

impl SummaryResult {
    pub fn from_model_output(raw: &str) -> AnalysisResult<Self> {
        let object = parse_object(raw)?;
        Ok(Self {
            title: string_field(&object, "title")
                .unwrap_or_else(|| DEFAULT_SUMMARY_TITLE.to_owned()),
            content: string_field(&object, "content").unwrap_or_default(),
            key_points: string_list(&object, "keyPoints"),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Case-insensitive; anything unrecognised is [`Priority::Medium`].
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Priority::Low,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            _ => Priority::Medium,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomAnalysis {
    pub priority: Priority,
    pub recommended_specialties: Vec<String>,
    pub description: String,
}

impl SymptomAnalysis {
    /// When `allowed` is non-empty, specialties not on it are dropped and the rest take the
    /// allowed list's spelling.
    pub fn from_model_output(raw: &str, allowed: &[String]) -> AnalysisResult<Self> {
        let object = parse_object(raw)?;

        let mut specialties: Vec<String> = Vec::new();
        for specialty in string_list(&object, "recommendedSpecialties") {
            let kept = if allowed.is_empty() {
                Some(specialty)
            } else {
                allowed
                    .iter()
                    .find(|a| a.trim().eq_ignore_ascii_case(&specialty))
                    .map(|a| a.trim().to_owned())
            };
            if let Some(kept) = kept {
                if !specialties.contains(&kept) {
                    specialties.push(kept);
                }
            }
        }

        Ok(Self {
            priority: string_field(&object, "priority")
                .map(|p| Priority::parse_lenient(&p))
                .unwrap_or_default(),
            recommended_specialties: specialties,
            description: string_field(&object, "description").unwrap_or_default(),
        })
    }
}

fn parse_object(raw: &str) -> AnalysisResult<Map<String, Value>> {
    let cleaned = strip_code_fence(raw);
    match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(AnalysisError::InvalidResponse(
            "expected a JSON object".into(),
        )),
        Err(e) => Err(AnalysisError::InvalidResponse(e.to_string())),
    }
}

/// Some models wrap JSON mode output in a markdown fence anyway.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    else {
        return trimmed;
    };
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn string_list(object: &Map<String, Value>, key: &str) -> Vec<String> {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}
