use regex::Regex;
use std::path::{Path, PathBuf};

use crate::conversation::Conversation;
use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::tool::ArtifactKind;
use crate::providers::base::Provider;

/// Longest reply sent as-is; Discord rejects messages over 2000 characters
pub const DISCORD_MESSAGE_LIMIT: usize = 1900;

pub const SPREADSHEET_CAPTION: &str = "Here is the Excel file you requested:";
pub const IMAGE_CAPTION: &str = "Here is the image you requested:";
pub const EMPTY_REPLY: &str = "I don't have an answer for that.";

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Upload a file and show the caption in place of the text reply
    Attachment {
        path: PathBuf,
        kind: ArtifactKind,
        caption: String,
    },
    Text(String),
    /// Too long to send; ask the model for a shorter version first
    Summarize(String),
}

pub fn kind_for_path(path: &Path) -> Option<ArtifactKind> {
    let extension = path.extension()?.to_string_lossy().to_lowercase();
    match extension.as_str() {
        "xlsx" => Some(ArtifactKind::Spreadsheet),
        "png" | "jpg" | "jpeg" => Some(ArtifactKind::Image),
        _ => None,
    }
}

pub fn caption_for(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Spreadsheet => SPREADSHEET_CAPTION,
        ArtifactKind::Image => IMAGE_CAPTION,
    }
}

/// Find the first file path in `text` that exists and lives under `output_dir`.
///
/// Candidates start at the output directory, either as configured or canonical, and
/// run lazily to the first artifact extension, so directories with spaces still match.
pub fn find_artifact_path(text: &str, output_dir: &Path) -> Option<PathBuf> {
    let root = std::fs::canonicalize(output_dir).ok()?;
    let normalized = text.replace('\\', "/");

    let mut prefixes = vec![regex::escape(&root.to_string_lossy().replace('\\', "/"))];
    let configured = output_dir.to_string_lossy().replace('\\', "/");
    let configured = configured.trim_end_matches('/');
    if !configured.is_empty() {
        prefixes.push(regex::escape(configured));
    }
    let pattern = format!(
        r"(?:{})/(?i:.*?\.(?:xlsx|png|jpe?g))\b",
        prefixes.join("|")
    );
    let re = Regex::new(&pattern).ok()?;

    for candidate in re.find_iter(&normalized) {
        let Ok(resolved) = std::fs::canonicalize(candidate.as_str()) else {
            tracing::debug!(candidate = candidate.as_str(), "path in reply does not exist");
            continue;
        };
        if resolved.is_file() && resolved.starts_with(&root) {
            return Some(resolved);
        }
        tracing::debug!(path = %resolved.display(), "path in reply is outside the output directory");
    }
    None
}

/// Decide how the outcome of a workflow run reaches the user
pub fn plan_delivery(conversation: &Conversation, output_dir: &Path, limit: usize) -> Delivery {
    if let Some(artifact) = conversation
        .artifacts()
        .into_iter()
        .rev()
        .find(|a| a.path.is_file())
    {
        return Delivery::Attachment {
            path: artifact.path.clone(),
            kind: artifact.kind,
            caption: caption_for(artifact.kind).to_string(),
        };
    }

    let text = conversation.final_text().unwrap_or_default();
    if let Some(path) = find_artifact_path(&text, output_dir) {
        if let Some(kind) = kind_for_path(&path) {
            return Delivery::Attachment {
                path,
                kind,
                caption: caption_for(kind).to_string(),
            };
        }
    }

    if text.is_empty() {
        Delivery::Text(EMPTY_REPLY.to_string())
    } else if text.chars().count() > limit {
        Delivery::Summarize(text)
    } else {
        Delivery::Text(text)
    }
}

pub fn summarize_prompt(text: &str) -> String {
    format!(
        "Please summarize the following text into a short, readable response for Discord: {}",
        text
    )
}

/// Cut `text` to at most `limit` characters
pub fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Ask the text model for a shorter reply, truncating if it is still too long
pub async fn summarize(provider: &dyn Provider, text: &str, limit: usize) -> AgentResult<String> {
    let request = Message::user().with_text(summarize_prompt(text));
    let (response, _) = provider
        .complete("", &[request], &[])
        .await
        .map_err(AgentError::from)?;

    let summary = response.text().trim().to_string();
    if summary.chars().count() > limit {
        tracing::warn!(limit, "summary still too long, truncating");
        return Ok(truncate(&summary, limit));
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tool::{Artifact, ToolCall};
    use crate::providers::mock::MockProvider;
    use serde_json::json;
    use std::fs;

    fn answer(text: &str) -> Conversation {
        let mut conversation = Conversation::from_message(Message::user().with_text("q"));
        conversation.push(Message::assistant().with_text(text));
        conversation
    }

    #[test]
    fn test_find_existing_path() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("customers_20240101_120000.xlsx");
        fs::write(&file, b"x").unwrap();
        let expected = fs::canonicalize(&file).unwrap();

        let text = format!("Done! The file is saved at ({}).", file.display());
        assert_eq!(find_artifact_path(&text, temp.path()), Some(expected.clone()));

        let quoted = format!("Saved to '{}'", file.display());
        assert_eq!(find_artifact_path(&quoted, temp.path()), Some(expected));
    }

    #[test]
    fn test_find_path_in_directory_with_spaces() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("bot data").join("output");
        fs::create_dir_all(&output).unwrap();
        let file = output.join("customers_20240101_120000.xlsx");
        fs::write(&file, b"x").unwrap();
        let expected = fs::canonicalize(&file).unwrap();

        let text = format!(
            "Successfully exported data to {}. Let me know if you need more.",
            expected.display()
        );
        assert_eq!(find_artifact_path(&text, &output), Some(expected));
    }

    #[test]
    fn test_find_path_with_space_in_file_name() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("report 2024.xlsx");
        fs::write(&file, b"x").unwrap();

        let text = format!("Saved as {}/report 2024.xlsx", temp.path().display());
        assert_eq!(
            find_artifact_path(&text, temp.path()),
            Some(fs::canonicalize(&file).unwrap())
        );
    }

    #[test]
    fn test_missing_path_is_none() {
        let temp = tempfile::tempdir().unwrap();
        let text = format!(
            "Saved to {}",
            temp.path().join("nothing_here.xlsx").display()
        );
        assert_eq!(find_artifact_path(&text, temp.path()), None);
        assert_eq!(find_artifact_path("no paths at all", temp.path()), None);
    }

    #[test]
    fn test_path_outside_output_dir_is_ignored() {
        let output = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let file = elsewhere.path().join("secret.png");
        fs::write(&file, b"x").unwrap();

        let text = format!("Here: {}", file.display());
        assert_eq!(find_artifact_path(&text, output.path()), None);
    }

    #[test]
    fn test_image_extensions_case_insensitive() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("generated_image_20240101_120000.PNG");
        fs::write(&file, b"x").unwrap();

        let text = format!("Successfully generated image and saved it to the following path: {}", file.display());
        let found = find_artifact_path(&text, temp.path()).unwrap();
        assert_eq!(kind_for_path(&found), Some(ArtifactKind::Image));
    }

    #[test]
    fn test_plan_prefers_structured_artifact() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("orders_20240101_120000.xlsx");
        fs::write(&file, b"x").unwrap();

        let mut conversation = Conversation::from_message(Message::user().with_text("export"));
        conversation.push(
            Message::assistant()
                .with_tool_request("1", Ok(ToolCall::new("export_to_excel", json!({})))),
        );
        conversation.push(Message::user().with_tool_output(
            "1",
            Ok(vec![]),
            vec![Artifact::new(&file, ArtifactKind::Spreadsheet)],
        ));
        // The model forgot to repeat the path
        conversation.push(Message::assistant().with_text("Your export is ready."));

        assert_eq!(
            plan_delivery(&conversation, temp.path(), DISCORD_MESSAGE_LIMIT),
            Delivery::Attachment {
                path: file,
                kind: ArtifactKind::Spreadsheet,
                caption: SPREADSHEET_CAPTION.to_string(),
            }
        );
    }

    #[test]
    fn test_plan_falls_back_to_text_scan() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("generated_image_20240101_120000.png");
        fs::write(&file, b"x").unwrap();

        let conversation = answer(&format!("Image saved to {}", file.display()));
        match plan_delivery(&conversation, temp.path(), DISCORD_MESSAGE_LIMIT) {
            Delivery::Attachment { kind, caption, .. } => {
                assert_eq!(kind, ArtifactKind::Image);
                assert_eq!(caption, IMAGE_CAPTION);
            }
            other => panic!("expected attachment, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_text_and_summary() {
        let temp = tempfile::tempdir().unwrap();

        assert_eq!(
            plan_delivery(&answer("42 rows"), temp.path(), DISCORD_MESSAGE_LIMIT),
            Delivery::Text("42 rows".into())
        );

        let exact = "a".repeat(DISCORD_MESSAGE_LIMIT);
        assert_eq!(
            plan_delivery(&answer(&exact), temp.path(), DISCORD_MESSAGE_LIMIT),
            Delivery::Text(exact.clone())
        );

        let long = "a".repeat(DISCORD_MESSAGE_LIMIT + 1);
        assert_eq!(
            plan_delivery(&answer(&long), temp.path(), DISCORD_MESSAGE_LIMIT),
            Delivery::Summarize(long)
        );

        assert_eq!(
            plan_delivery(&answer("   "), temp.path(), DISCORD_MESSAGE_LIMIT),
            Delivery::Text(EMPTY_REPLY.into())
        );
    }

    #[tokio::test]
    async fn test_summarize() {
        let provider = MockProvider::new(vec![Message::assistant().with_text("  short version ")]);
        let summary = summarize(&provider, "a very long text", 100).await.unwrap();
        assert_eq!(summary, "short version");

        let sent = &provider.received()[0][0];
        assert_eq!(
            sent.text(),
            "Please summarize the following text into a short, readable response for Discord: a very long text"
        );
    }

    #[tokio::test]
    async fn test_summarize_truncates() {
        let provider = MockProvider::new(vec![Message::assistant().with_text("x".repeat(50))]);
        let summary = summarize(&provider, "long", 10).await.unwrap();
        assert_eq!(summary, "x".repeat(10));
    }
}
