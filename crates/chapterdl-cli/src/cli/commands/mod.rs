//! CLI command handlers, one file per command.

mod completions;
mod dedupe;
mod embed_cover;
mod fetch;
mod resume_point;

pub use completions::{run_completions, run_man};
pub use dedupe::run_dedupe;
pub use embed_cover::run_embed_cover;
pub use fetch::run_fetch;
pub use resume_point::run_resume_point;
