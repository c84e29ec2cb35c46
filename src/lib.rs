//! ghcheck: GitHub email registration checker
//!
//! Probes the signup form with headless Chrome to infer whether addresses
//! already have an account. Two front ends:
//! - check: one-shot batch from a local file
//! - bot: Telegram bot accepting .txt uploads

pub mod batch;
pub mod bot;
pub mod browser;
pub mod check;
pub mod classify;
pub mod parse;
pub mod probe;
pub mod report;
pub mod telegram;

pub use batch::{check_entries, run_batch, PaceConfig, ProgressReporter, ResultSet};
pub use classify::{classify, Outcome};
pub use parse::{parse_entries, Entry};
pub use probe::{BrowserProbe, ProbeConfig, SignupProbe};
