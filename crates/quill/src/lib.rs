pub mod agent;
pub mod conversation;
pub mod database;
pub mod delivery;
pub mod errors;
pub mod ingest;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod registry;
pub mod router;
pub mod toolbox;
pub mod tools;
pub mod workflow;
