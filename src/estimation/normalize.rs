//! Tolerant parsing of model output into canonical sub-tasks.
//!
//! The generative model is asked for `{ "subTasks": [...], "cost": n }` but in
//! practice answers with several shapes and field spellings. Everything is
//! funnelled into [`SubTask`] here, and the total is always recomputed from
//! the normalized day values.

use crate::types::SubTask;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

const NAME_KEYS: [&str; 4] = ["Sub-Task", "task", "taskName", "name"];
const DESCRIPTION_KEYS: [&str; 3] = ["Description", "description", "details"];
const DAY_KEYS: [&str; 4] = ["Days", "days", "estimatedDays", "estimatedDuration"];
const FLAT_LIST_KEYS: [&str; 3] = ["subTasks", "sub_tasks", "tasks"];

const UNNAMED_TASK: &str = "N/A";
const UNTITLED_STORY_TASK: &str = "Untitled Task";
const MISSING_STORY_DESCRIPTION: &str = "No description provided.";

/// Model output that could not be turned into a task list.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("AI returned an invalid format: {source}. Raw response: {raw}")]
    InvalidJson {
        source: serde_json::Error,
        raw: String,
    },
    #[error("AI response does not contain a recognizable {0}")]
    UnrecognizedShape(&'static str),
}

/// Which response layout the model used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{ "subTasks": [...] }` or a bare array
    Flat,
    /// `{ "userStories": [{ "tasks": [...] }] }`
    UserStories,
}

/// Normalized model output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEstimation {
    pub sub_tasks: Vec<SubTask>,
    /// Sum of normalized days
    pub cost: f64,
    /// Whatever total the model claimed, kept for logging only
    pub reported_cost: Option<f64>,
    pub shape: ResponseShape,
}

/// Parse raw model text into normalized sub-tasks with a derived cost.
pub fn parse_estimation(raw: &str) -> Result<ParsedEstimation, ParseError> {
    let value = parse_json(raw)?;
    let (sub_tasks, shape) = extract_sub_tasks(&value)?;
    let reported_cost = value.get("cost").and_then(number_like);

    Ok(ParsedEstimation {
        cost: total_cost(&sub_tasks),
        sub_tasks,
        reported_cost,
        shape,
    })
}

/// Parse JSON, tolerating a surrounding markdown code fence.
pub fn parse_json(raw: &str) -> Result<Value, ParseError> {
    serde_json::from_str(strip_code_fences(raw)).map_err(|source| ParseError::InvalidJson {
        source,
        raw: raw.to_string(),
    })
}

fn extract_sub_tasks(value: &Value) -> Result<(Vec<SubTask>, ResponseShape), ParseError> {
    const SHAPE: &str = "'subTasks' or 'userStories' array";

    match value {
        Value::Array(items) => Ok((items.iter().map(normalize_sub_task).collect(), ResponseShape::Flat)),
        Value::Object(map) => {
            if let Some(stories) = map.get("userStories").and_then(Value::as_array) {
                let tasks = stories
                    .iter()
                    .filter_map(|story| story.get("tasks").and_then(Value::as_array))
                    .flatten()
                    .map(normalize_story_task)
                    .collect();
                return Ok((tasks, ResponseShape::UserStories));
            }

            FLAT_LIST_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_array))
                .map(|items| (items.iter().map(normalize_sub_task).collect(), ResponseShape::Flat))
                .ok_or(ParseError::UnrecognizedShape(SHAPE))
        }
        _ => Err(ParseError::UnrecognizedShape(SHAPE)),
    }
}

/// Map one item of a flat sub-task list into the canonical shape.
pub fn normalize_sub_task(item: &Value) -> SubTask {
    let Some(obj) = item.as_object() else {
        // A bare string is taken as the task name
        return SubTask::new(
            truthy_text(item).unwrap_or_else(|| UNNAMED_TASK.to_string()),
            "",
            0.0,
        );
    };

    SubTask {
        name: first_text(obj, &NAME_KEYS).unwrap_or_else(|| UNNAMED_TASK.to_string()),
        description: first_text(obj, &DESCRIPTION_KEYS).unwrap_or_default(),
        days: first_days(obj, &DAY_KEYS),
    }
}

/// Map one task of the nested `userStories[].tasks[]` layout.
pub fn normalize_story_task(item: &Value) -> SubTask {
    let Some(obj) = item.as_object() else {
        return SubTask::new(
            truthy_text(item).unwrap_or_else(|| UNTITLED_STORY_TASK.to_string()),
            MISSING_STORY_DESCRIPTION,
            0.0,
        );
    };

    let name = first_text(obj, &["task"])
        .or_else(|| first_text(obj, &NAME_KEYS))
        .unwrap_or_else(|| UNTITLED_STORY_TASK.to_string());

    let steps: Vec<String> = obj
        .get("subTasks")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(truthy_text).collect())
        .unwrap_or_default();

    let description = if steps.is_empty() {
        first_text(obj, &["dod"])
            .or_else(|| first_text(obj, &DESCRIPTION_KEYS))
            .unwrap_or_else(|| MISSING_STORY_DESCRIPTION.to_string())
    } else {
        format!("- {}", steps.join("\n- "))
    };

    let days = match first_truthy(obj, &["estimatedDuration"]) {
        Some(v) => days_from(v),
        None => first_days(obj, &DAY_KEYS),
    };

    SubTask {
        name,
        description,
        days,
    }
}

/// Total man-days, rounded to 6 decimals so repeated sums stay stable.
pub fn total_cost(sub_tasks: &[SubTask]) -> f64 {
    let sum = sub_tasks
        .iter()
        .map(|t| sanitize_days(t.days))
        .fold(0.0, |acc: f64, days| (acc + days).min(f64::MAX));
    let scaled = sum * 1_000_000.0;
    if !scaled.is_finite() {
        return sum;
    }
    scaled.round() / 1_000_000.0
}

/// Parse a leading decimal number the way JavaScript's `parseFloat` does:
/// `"2.5 days"` is 2.5, `"abc"` is `None`.
pub fn parse_leading_float(s: &str) -> Option<f64> {
    static NUMBER: OnceLock<Option<Regex>> = OnceLock::new();
    let re = NUMBER
        .get_or_init(|| Regex::new(r"^\s*[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").ok())
        .as_ref()?;
    re.find(s).and_then(|m| m.as_str().trim().parse::<f64>().ok())
}

/// Remove a surrounding ```json ... ``` fence if present.
pub fn strip_code_fences(raw: &str) -> &str {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    let trimmed = raw.trim();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*(.*?)\s*```$").ok())
        .as_ref()
        .and_then(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str())
}

/// First value under `keys` that is a non-blank string or a non-zero number.
pub(crate) fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| obj.get(*key).and_then(truthy_text))
}

fn truthy_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

fn first_truthy<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|key| obj.get(*key)).find(|v| match v {
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// The first truthy key wins even when it does not parse; that yields 0.
fn first_days(obj: &Map<String, Value>, keys: &[&str]) -> f64 {
    first_truthy(obj, keys).map_or(0.0, days_from)
}

fn days_from(value: &Value) -> f64 {
    sanitize_days(number_like(value).unwrap_or(0.0))
}

fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_leading_float(s),
        _ => None,
    }
}

fn sanitize_days(days: f64) -> f64 {
    if days.is_finite() && days > 0.0 {
        days
    } else {
        0.0
    }
}
