//! Session-log analysis: JSONL transcripts with real token usage.

pub mod project_scanner;
pub mod session_parser;
pub mod usage;

pub use project_scanner::{scan_projects, ScannedProject};
pub use session_parser::{ConversationUsage, TokenTotals};
pub use usage::{build_summary, roll_up, ProjectUsage};
