//! User-story suggestions from the generative model.

use super::normalize::{first_text, parse_json, ParseError};
use super::pipeline::{require, EstimationError};
use super::prompt::{self, ExistingStory};
use crate::llm::{Generator, Turn};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

const FEATURE_KEYS: [&str; 4] = ["featureName", "feature_name", "name", "title"];
const STORY_KEYS: [&str; 4] = ["storyText", "story_text", "story", "text"];
const LIST_KEYS: [&str; 3] = ["stories", "userStories", "features"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorySuggestion {
    #[serde(rename = "featureName")]
    pub feature_name: String,
    #[serde(rename = "storyText")]
    pub story_text: String,
}

fn story_from(value: &Value) -> Option<StorySuggestion> {
    let obj = value.as_object()?;
    let story_text = first_text(obj, &STORY_KEYS)?;
    Some(StorySuggestion {
        feature_name: first_text(obj, &FEATURE_KEYS).unwrap_or_default(),
        story_text,
    })
}

/// Parse a single `{featureName, storyText}` object.
pub fn parse_story(raw: &str) -> Result<StorySuggestion, ParseError> {
    let value = parse_json(raw)?;
    // Some answers wrap the single story in a list
    let candidate = match &value {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    };
    story_from(candidate).ok_or(ParseError::UnrecognizedShape("'storyText' field"))
}

/// Parse a list of stories; items without story text are dropped.
pub fn parse_story_list(raw: &str) -> Result<Vec<StorySuggestion>, ParseError> {
    let value = parse_json(raw)?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => LIST_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .ok_or(ParseError::UnrecognizedShape("'stories' array"))?,
        _ => return Err(ParseError::UnrecognizedShape("'stories' array")),
    };

    let stories: Vec<StorySuggestion> = items.iter().filter_map(story_from).collect();
    if stories.len() < items.len() {
        debug!(
            kept = stories.len(),
            dropped = items.len() - stories.len(),
            "Dropped story suggestions without text"
        );
    }
    Ok(stories)
}

async fn ask(generator: &dyn Generator, prompt: String) -> Result<String, EstimationError> {
    generator
        .generate(&[Turn::user(prompt)])
        .await
        .map_err(|e| {
            warn!(model = generator.model_name(), error = %e, "Story generation failed");
            EstimationError::Generation(e)
        })
}

/// Rewrite a rough task as one user story.
pub async fn suggest_story(
    generator: &dyn Generator,
    language: &str,
    task: &str,
) -> Result<StorySuggestion, EstimationError> {
    require(task, "taskDescription")?;
    let raw = ask(generator, prompt::suggest_story_prompt(language, task)).await?;
    Ok(parse_story(&raw)?)
}

/// Draft an initial set of stories for a project.
pub async fn generate_stories(
    generator: &dyn Generator,
    language: &str,
    project_description: &str,
) -> Result<Vec<StorySuggestion>, EstimationError> {
    require(project_description, "projectDescription")?;
    let raw = ask(
        generator,
        prompt::generate_stories_prompt(language, project_description),
    )
    .await?;
    Ok(parse_story_list(&raw)?)
}

/// Suggest features not yet covered by `existing`.
pub async fn suggest_features(
    generator: &dyn Generator,
    language: &str,
    project_description: &str,
    existing: &[ExistingStory],
) -> Result<Vec<StorySuggestion>, EstimationError> {
    require(project_description, "projectDescription")?;
    let raw = ask(
        generator,
        prompt::suggest_features_prompt(language, project_description, existing),
    )
    .await?;
    Ok(parse_story_list(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_story_variants() {
        let s = parse_story(r#"{"featureName":"Login","storyText":"As a user..."}"#).unwrap();
        assert_eq!(s.feature_name, "Login");

        let s = parse_story(r#"[{"title":"Export","story":"As an admin..."}]"#).unwrap();
        assert_eq!(s.feature_name, "Export");
        assert_eq!(s.story_text, "As an admin...");

        assert!(parse_story(r#"{"featureName":"x"}"#).is_err());
    }

    #[test]
    fn test_parse_story_list_shapes() {
        let raw = "```json\n{\"stories\":[{\"featureName\":\"a\",\"storyText\":\"x\"},{\"featureName\":\"b\"}]}\n```";
        let stories = parse_story_list(raw).unwrap();
        assert_eq!(stories.len(), 1);

        let stories = parse_story_list(r#"[{"feature_name":"c","story_text":"y"}]"#).unwrap();
        assert_eq!(stories[0].feature_name, "c");

        assert!(matches!(
            parse_story_list(r#"{"ideas": []}"#),
            Err(ParseError::UnrecognizedShape(_))
        ));
    }

    #[test]
    fn test_suggestion_serializes_camel_case() {
        let s = StorySuggestion {
            feature_name: "a".into(),
            story_text: "b".into(),
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["featureName"], "a");
        assert_eq!(v["storyText"], "b");
    }
}
