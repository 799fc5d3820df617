//! Prompt construction for estimation and story generation.

use crate::types::{SimilarEstimation, SubTask};
use serde::{Deserialize, Serialize};

/// Output language used when none is configured.
pub const DEFAULT_LANGUAGE: &str = "Thai";

/// Model turn inserted between the system prompt and the feature description.
pub const ACKNOWLEDGEMENT: &str = "OK. I am ready. Please provide the feature description.";

const EXAMPLES_HEADER: &str = "\n\nHere are some examples of past estimations. Use them as a reference for style, structure, and complexity assessment:\n\n";

/// Default estimator persona, asking for strict JSON in `language`.
pub fn default_system_prompt(language: &str) -> String {
    format!(
        "You are an expert software project estimator. Break the feature you are given down into \
         concrete technical sub-tasks and estimate the effort of each one in man-days, where \
         1 man-day equals 6 working hours. Fractional days such as 0.5 or 1.5 are allowed.\n\n\
         Respond with a single valid JSON object and nothing else. The object must have a \
         \"subTasks\" array, where every element has \"task\" (short name), \"days\" (number) and \
         \"description\" (what has to be done), and a \"cost\" field holding the total number of \
         man-days.\n\n\
         Write every task name and description in {language}."
    )
}

#[derive(Serialize)]
struct ExampleJson<'a> {
    #[serde(rename = "subTasks")]
    sub_tasks: &'a [SubTask],
    cost: f64,
}

/// Render reference estimations as few-shot examples.
///
/// Returns an empty string when there are no references so the result can be
/// appended to a prompt unconditionally.
pub fn format_examples(references: &[SimilarEstimation]) -> String {
    if references.is_empty() {
        return String::new();
    }

    let blocks: Vec<String> = references
        .iter()
        .map(|similar| {
            let record = &similar.record;
            let json = serde_json::to_string_pretty(&ExampleJson {
                sub_tasks: &record.sub_tasks.0,
                cost: record.cost,
            })
            .unwrap_or_default();
            format!(
                "---\nEXAMPLE\nFunction Name: {}\nFeature Description: {}\nResulting JSON:\n{}\n---",
                record.function_name, record.feature_description, json
            )
        })
        .collect();

    format!("{EXAMPLES_HEADER}{}", blocks.join("\n\n"))
}

/// Base prompt followed by the rendered examples.
pub fn augment_prompt(base: &str, references: &[SimilarEstimation]) -> String {
    format!("{base}{}", format_examples(references))
}

/// Combine optional project context with the task being estimated.
pub fn compose_feature_description(project_context: Option<&str>, task: &str) -> String {
    match project_context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!("Project Context:\n{context}\n\nTask to Estimate:\n{task}"),
        None => task.to_string(),
    }
}

/// A story already in the project, passed as context for feature suggestions.
#[derive(Debug, Clone, Deserialize)]
pub struct ExistingStory {
    #[serde(rename = "featureName", alias = "feature_name", default)]
    pub feature_name: String,
    #[serde(rename = "storyText", alias = "story_text", default)]
    pub story_text: String,
}

/// Turn a rough task description into one user story.
pub fn suggest_story_prompt(language: &str, task: &str) -> String {
    format!(
        "You are an experienced product owner. Rewrite the following task as a single user story \
         in the form \"As a <role>, I want <goal> so that <benefit>\" and give it a short feature name.\n\n\
         Task:\n{task}\n\n\
         Respond with a JSON object only: {{\"featureName\": string, \"storyText\": string}}. \
         Write both values in {language}."
    )
}

/// Generate a first set of stories for a project description.
pub fn generate_stories_prompt(language: &str, project_description: &str) -> String {
    format!(
        "You are an experienced product owner. Read the project description below and write \
         between 5 and 7 user stories that together cover its core functionality. Each story uses \
         the form \"As a <role>, I want <goal> so that <benefit>\" and has a short feature name.\n\n\
         Project description:\n{project_description}\n\n\
         Respond with a JSON object only: {{\"stories\": [{{\"featureName\": string, \"storyText\": string}}]}}. \
         Write all values in {language}."
    )
}

/// Suggest new features that the existing stories do not cover yet.
pub fn suggest_features_prompt(
    language: &str,
    project_description: &str,
    existing: &[ExistingStory],
) -> String {
    let listed = if existing.is_empty() {
        "(none yet)".to_string()
    } else {
        existing
            .iter()
            .map(|s| format!("- {}: {}", s.feature_name, s.story_text))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are an experienced product owner. Given the project description and the user stories \
         that already exist, suggest between 3 and 5 additional user stories for features that are \
         still missing. Do not repeat or rephrase existing stories.\n\n\
         Project description:\n{project_description}\n\n\
         Existing stories:\n{listed}\n\n\
         Respond with a JSON object only: {{\"stories\": [{{\"featureName\": string, \"storyText\": string}}]}}. \
         Write all values in {language}."
    )
}
