//! These models represent the objects passed around by the workflow
//!
//! There are two external formats we need to interact with:
//! - gemini `generateContent` contents/parts, sent from the agent to the LLM
//! - chat platform messages and attachments, handled by the bot process
//!
//! Both are converted into these internal structs at the boundary. Tools and the
//! agent loop only ever see the internal models.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
