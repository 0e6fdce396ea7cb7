use quill::delivery::{plan_delivery, summarize, Delivery, DISCORD_MESSAGE_LIMIT};
use quill::ingest::{compose_user_message, ingest_file, IngestedFile};
use quill::workflow::Workflow;
use serenity::all::{
    Attachment, Context, CreateAttachment, CreateMessage, EditMessage, EventHandler, Message,
    Ready,
};
use serenity::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const HELP_COMMAND: &str = "!helpme";
pub const GREETING: &str = "How can I help you?";
pub const PLACEHOLDER: &str = "⏳ Processing your request...";
pub const FAILURE_NOTICE: &str = "An unexpected error occurred. Please check the logs.";

pub const HELP_TEXT: &str = "**Hello! I am an AI assistant.**

You can ask me questions about data in the database or about files you upload.

**Database Queries:**
- `@Quill show me all users from the customers table`
- `@Quill what is the total sales for the last month?`
- `@Quill show me the top 5 products and export the result to excel`

**File-based Questions:**
- Upload a file (PDF, TXT, CSV, XLSX, PNG, JPG) and **@mention me** with your question in the comment.
- Example: `(upload a sales_report.pdf) @Quill what were the total profits in Q3?`

**Images:**
- `@Quill draw a lighthouse at sunset`
- Upload a picture and **@mention me** with the change you want.";

pub struct Handler {
    workflow: Arc<Workflow>,
    output_dir: PathBuf,
    upload_dir: PathBuf,
}

impl Handler {
    pub fn new(workflow: Arc<Workflow>, output_dir: PathBuf, upload_dir: PathBuf) -> Self {
        Self {
            workflow,
            output_dir,
            upload_dir,
        }
    }

    async fn download(&self, attachment: &Attachment) -> anyhow::Result<PathBuf> {
        let bytes = attachment.download().await?;
        let path = upload_path(&self.upload_dir, &attachment.filename);
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(&path, bytes).await?;
        info!(path = %path.display(), "saved attachment");
        Ok(path)
    }

    async fn ingest(&self, attachment: &Attachment) -> IngestedFile {
        let path = match self.download(attachment).await {
            Ok(path) => path,
            Err(e) => {
                warn!(file = %attachment.filename, error = %e, "failed to download attachment");
                return IngestedFile::text(format!(
                    "Error reading file {}: {}",
                    attachment.filename, e
                ));
            }
        };

        let file_name = attachment.filename.clone();
        tokio::task::spawn_blocking(move || ingest_file(&path))
            .await
            .unwrap_or_else(|e| {
                IngestedFile::text(format!("Error reading file {}: {}", file_name, e))
            })
    }

    /// Run the workflow for one request and turn its outcome into a reply
    async fn respond(&self, text: &str, file: Option<&IngestedFile>) -> anyhow::Result<Delivery> {
        let message = compose_user_message(text, file);
        let workflow = self.workflow.clone();
        let conversation = tokio::spawn(async move { workflow.invoke(message).await }).await??;

        match plan_delivery(&conversation, &self.output_dir, DISCORD_MESSAGE_LIMIT) {
            Delivery::Summarize(long) => {
                info!(chars = long.chars().count(), "reply too long, summarizing");
                let provider = self.workflow.agent().provider();
                let summary = summarize(provider.as_ref(), &long, DISCORD_MESSAGE_LIMIT).await?;
                Ok(Delivery::Text(summary))
            }
            delivery => Ok(delivery),
        }
    }

    async fn deliver(
        &self,
        ctx: &Context,
        msg: &Message,
        placeholder: &mut Message,
        delivery: Delivery,
    ) -> anyhow::Result<()> {
        match delivery {
            Delivery::Attachment { path, caption, .. } => {
                info!(path = %path.display(), "sending file");
                placeholder
                    .edit(ctx, EditMessage::new().content(caption))
                    .await?;
                let file = CreateAttachment::path(&path).await?;
                msg.channel_id
                    .send_message(&ctx.http, CreateMessage::new().add_file(file))
                    .await?;
            }
            Delivery::Text(text) | Delivery::Summarize(text) => {
                placeholder.edit(ctx, EditMessage::new().content(text)).await?;
            }
        }
        Ok(())
    }
}

/// Remove `<@id>` and `<@!id>` mentions of the bot and trim what is left
pub fn strip_mention(content: &str, bot_id: u64) -> String {
    content
        .replace(&format!("<@!{}>", bot_id), "")
        .replace(&format!("<@{}>", bot_id), "")
        .trim()
        .to_string()
}

/// Where an upload is stored; only the final path component of its name is kept
pub fn upload_path(upload_dir: &Path, file_name: &str) -> PathBuf {
    let name = Path::new(&file_name.replace('\\', "/"))
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "upload".to_string());
    upload_dir.join(name)
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, id = %ready.user.id, "bot is online");
        for dir in [&self.upload_dir, &self.output_dir] {
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                error!(dir = %dir.display(), error = %e, "failed to create directory");
            }
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.content.trim() == HELP_COMMAND {
            info!(author = %msg.author.name, "help requested");
            if let Err(e) = msg.channel_id.say(&ctx.http, HELP_TEXT).await {
                error!(error = %e, "failed to send help");
            }
            return;
        }

        let bot_id = ctx.cache.current_user().id;
        if msg.author.id == bot_id || !msg.mentions_user_id(bot_id) {
            return;
        }

        let text = strip_mention(&msg.content, bot_id.get());
        info!(author = %msg.author.name, %text, "received mention");

        if text.is_empty() && msg.attachments.is_empty() {
            if let Err(e) = msg.channel_id.say(&ctx.http, GREETING).await {
                error!(error = %e, "failed to send greeting");
            }
            return;
        }

        let file = match msg.attachments.first() {
            Some(attachment) => Some(self.ingest(attachment).await),
            None => None,
        };

        let mut placeholder = match msg.channel_id.say(&ctx.http, PLACEHOLDER).await {
            Ok(placeholder) => placeholder,
            Err(e) => {
                error!(error = %e, "failed to send placeholder");
                return;
            }
        };

        let outcome = match self.respond(&text, file.as_ref()).await {
            Ok(delivery) => self.deliver(&ctx, &msg, &mut placeholder, delivery).await,
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            error!(error = %e, "failed to handle request");
            if let Err(e) = placeholder
                .edit(&ctx, EditMessage::new().content(FAILURE_NOTICE))
                .await
            {
                error!(error = %e, "failed to report error");
            }
        }
    }
}
