//! Telegram front end
//!
//! Long-polls the Bot API, routes commands, accepts `.txt` uploads, runs the
//! batch checker, and streams progress by editing a status message. Updates
//! are processed sequentially - a running batch occupies the single browser
//! session, so there is nothing to gain from interleaving chats.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use clap::Args;
use tokio::sync::Mutex;
use url::Url;

use crate::batch::{run_batch, PaceConfig, ProgressReporter};
use crate::classify::Outcome;
use crate::parse::parse_entries;
use crate::probe::ProbeConfig;
use crate::report::{progress_line, render_files, render_summary};
use crate::telegram::{Message, TelegramClient};

/// Minimum spacing between status-message edits (Telegram rate limit).
const EDIT_INTERVAL: Duration = Duration::from_millis(1500);

/// How many of the latest per-email results the status message shows.
const VISIBLE_RESULTS: usize = 15;

/// Long-poll timeout passed to getUpdates.
const POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Args)]
pub struct BotArgs {
    /// Telegram bot token
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    token: String,

    /// Comma-separated usernames or numeric ids allowed to use the bot
    /// (`*` allows everyone)
    #[arg(long, env = "TELEGRAM_ALLOWED_USERS", default_value = "*")]
    allowed_users: String,

    /// Base delay between checks in seconds (jitter is added on top)
    #[arg(long, default_value = "2.0")]
    delay: f64,

    /// Signup page to probe
    #[arg(long, default_value = "https://github.com/signup")]
    signup_url: String,
}

/// Bot configuration, assembled from CLI args and environment.
pub struct BotConfig {
    pub token: String,
    /// Usernames or numeric ids allowed to use the bot; `*` allows everyone.
    pub allowed_users: Vec<String>,
    pub probe: ProbeConfig,
    pub pace: PaceConfig,
}

/// Run the bot command.
pub async fn run_bot(args: BotArgs) -> Result<()> {
    Url::parse(&args.signup_url)
        .with_context(|| format!("Invalid signup URL: {}", args.signup_url))?;

    let allowed_users: Vec<String> = args
        .allowed_users
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    tracing::info!(
        allowed = %if allowed_users.iter().any(|u| u == "*") {
            "everyone".to_string()
        } else {
            allowed_users.join(", ")
        },
        "starting bot"
    );

    let config = BotConfig {
        token: args.token,
        allowed_users,
        probe: ProbeConfig {
            signup_url: args.signup_url,
            ..ProbeConfig::default()
        },
        pace: PaceConfig {
            base_delay_secs: args.delay,
        },
    };

    serve(config).await
}

/// Run the bot until the process is torn down.
async fn serve(config: BotConfig) -> Result<()> {
    let api = TelegramClient::new(&config.token);

    let me = api.get_me().await.context("Telegram authorization failed")?;
    tracing::info!(
        bot = me.username.as_deref().unwrap_or("?"),
        "bot authorized, waiting for messages"
    );

    if let Err(e) = api
        .set_my_commands(&[
            ("start", "Welcome message"),
            ("check", "Start a check (upload a .txt file)"),
            ("cancel", "Cancel the pending upload"),
            ("help", "How to use the bot"),
        ])
        .await
    {
        tracing::warn!(error = %e, "setMyCommands failed");
    }

    let mut bot = Bot {
        api,
        config,
        awaiting_file: HashSet::new(),
    };
    bot.poll_loop().await
}

struct Bot {
    api: TelegramClient,
    config: BotConfig,
    /// Chats that ran /check and owe us a file.
    awaiting_file: HashSet<i64>,
}

impl Bot {
    async fn poll_loop(&mut self) -> Result<()> {
        let mut offset: i64 = 0;

        loop {
            let updates = match self.api.get_updates(offset, POLL_TIMEOUT_SECS).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, "poll error");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                if let Some(message) = update.message {
                    self.handle_message(message).await;
                }
            }
        }
    }

    async fn handle_message(&mut self, msg: Message) {
        if !self.sender_allowed(&msg) {
            let from = msg.from.as_ref();
            tracing::warn!(
                username = from.and_then(|u| u.username.as_deref()).unwrap_or("unknown"),
                user_id = from.map(|u| u.id).unwrap_or_default(),
                "ignoring message from unauthorized user"
            );
            return;
        }

        if msg.document.is_some() {
            self.handle_document(&msg).await;
            return;
        }

        let chat_id = msg.chat.id;
        match msg.text.as_deref().and_then(parse_command) {
            Some("start") => {
                let name = msg
                    .from
                    .as_ref()
                    .and_then(|u| u.first_name.as_deref())
                    .unwrap_or("there");
                self.reply(chat_id, &start_text(name)).await;
            }
            Some("help") => self.reply(chat_id, HELP_TEXT).await,
            Some("check") => {
                self.awaiting_file.insert(chat_id);
                self.reply(chat_id, CHECK_TEXT).await;
            }
            Some("cancel") => {
                self.awaiting_file.remove(&chat_id);
                self.reply(chat_id, "\u{274C} Cancelled. Send a .txt file to start again.")
                    .await;
            }
            _ => {
                if self.awaiting_file.contains(&chat_id) {
                    self.reply(chat_id, "\u{274C} Send a .txt file, not a text message!")
                        .await;
                }
            }
        }
    }

    /// A `.txt` upload, with or without a preceding /check.
    async fn handle_document(&mut self, msg: &Message) {
        let chat_id = msg.chat.id;
        let Some(document) = msg.document.as_ref() else {
            return;
        };

        let file_name = document.file_name.as_deref().unwrap_or("");
        if !file_name.ends_with(".txt") {
            self.reply(
                chat_id,
                "\u{274C} The file must be a <code>.txt</code>!\nSend the correct file.",
            )
            .await;
            return;
        }

        tracing::info!(
            user_id = msg.from.as_ref().map(|u| u.id).unwrap_or_default(),
            file_name,
            file_size = document.file_size.unwrap_or_default(),
            "file uploaded"
        );

        let bytes = match self.api.download_file(&document.file_id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "file download failed");
                self.reply(chat_id, "\u{274C} Could not download the file, try again.")
                    .await;
                return;
            }
        };
        let text = String::from_utf8_lossy(&bytes);

        let entries = parse_entries(&text);
        self.awaiting_file.remove(&chat_id);

        if entries.is_empty() {
            self.reply(
                chat_id,
                "\u{274C} No valid emails found in the file!\n\n\
                 Expected format:\n<code>email@domain.com</code> or\n\
                 <code>email@domain.com:password</code>",
            )
            .await;
            return;
        }

        let total = entries.len();
        let status = match self
            .api
            .send_message(
                chat_id,
                &format!(
                    "\u{2705} Found <b>{total}</b> emails.\n\u{23F3} Starting checks...\n\n\
                     <code>Progress: 0/{total} (0%)</code>"
                ),
            )
            .await
        {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(error = %e, "could not send status message");
                return;
            }
        };

        let reporter = StatusMessageReporter::new(&self.api, chat_id, status.message_id);
        let results = run_batch(
            &entries,
            Some(&reporter),
            self.config.probe.clone(),
            &self.config.pace,
        )
        .await;

        // Final summary replaces the progress message
        let summary = render_summary(&results);
        if let Err(e) = self
            .api
            .edit_message_text(chat_id, status.message_id, &summary)
            .await
        {
            tracing::warn!(error = %e, "summary edit failed");
            self.reply(chat_id, &summary).await;
        }

        let now = Local::now();
        let stamp = now.format("%Y%m%d_%H%M%S").to_string();
        let date = now.format("%Y-%m-%d %H:%M:%S").to_string();
        for file in render_files(&results, &stamp, &date) {
            if let Err(e) = self
                .api
                .send_document(
                    chat_id,
                    file.body.into_bytes(),
                    &file.name,
                    Some(&file.caption),
                )
                .await
            {
                tracing::error!(error = %e, file = %file.name, "result upload failed");
            }
        }

        tracing::info!(
            user_id = msg.from.as_ref().map(|u| u.id).unwrap_or_default(),
            total,
            registered = results.registered.len(),
            available = results.available.len(),
            invalid = results.invalid.len(),
            error = results.error.len(),
            "batch finished"
        );
    }

    fn sender_allowed(&self, msg: &Message) -> bool {
        let Some(from) = msg.from.as_ref() else {
            return false;
        };
        let id = from.id.to_string();
        let mut identities = vec![id.as_str()];
        if let Some(username) = from.username.as_deref() {
            identities.push(username);
        }
        user_allowed(&self.config.allowed_users, &identities)
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.api.send_message(chat_id, text).await {
            tracing::warn!(error = %e, chat_id, "reply failed");
        }
    }
}

/// Progress reporter that edits the status message in place, at most once
/// per [`EDIT_INTERVAL`], always on the final entry. Edit failures are
/// swallowed - progress display must never disturb the batch.
struct StatusMessageReporter<'a> {
    api: &'a TelegramClient,
    chat_id: i64,
    message_id: i64,
    state: Mutex<ReporterState>,
}

struct ReporterState {
    lines: Vec<String>,
    last_edit: Option<Instant>,
}

impl<'a> StatusMessageReporter<'a> {
    fn new(api: &'a TelegramClient, chat_id: i64, message_id: i64) -> Self {
        Self {
            api,
            chat_id,
            message_id,
            state: Mutex::new(ReporterState {
                lines: Vec::new(),
                last_edit: None,
            }),
        }
    }
}

#[async_trait]
impl ProgressReporter for StatusMessageReporter<'_> {
    async fn report(&self, current: usize, total: usize, email: &str, outcome: Outcome) {
        let mut state = self.state.lock().await;
        state.lines.push(progress_line(email, outcome));

        let due = state
            .last_edit
            .map_or(true, |t| t.elapsed() >= EDIT_INTERVAL);
        if !due && current != total {
            return;
        }
        state.last_edit = Some(Instant::now());

        let text = progress_text(current, total, &state.lines);
        drop(state);

        if let Err(e) = self
            .api
            .edit_message_text(self.chat_id, self.message_id, &text)
            .await
        {
            tracing::debug!(error = %e, "progress edit failed");
        }
    }
}

/// Status message body: header plus the last [`VISIBLE_RESULTS`] lines.
fn progress_text(current: usize, total: usize, lines: &[String]) -> String {
    let pct = if total == 0 { 0 } else { current * 100 / total };

    let visible = if lines.len() > VISIBLE_RESULTS {
        let hidden = lines.len() - VISIBLE_RESULTS;
        format!(
            "<i>...{hidden} earlier results...</i>\n{}",
            lines[hidden..].join("\n")
        )
    } else {
        lines.join("\n")
    };

    format!("\u{23F3} Checking... <b>{current}/{total}</b> ({pct}%)\n\n{visible}")
}

/// Extract a bot command from message text, tolerating `/cmd@botname`.
fn parse_command(text: &str) -> Option<&str> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;
    let cmd = rest.split_whitespace().next()?;
    Some(cmd.split('@').next().unwrap_or(cmd))
}

/// Allowlist check: `*` matches anyone; otherwise exact match on any
/// identity (username or numeric id).
fn user_allowed(allowed: &[String], identities: &[&str]) -> bool {
    allowed
        .iter()
        .any(|a| a == "*" || identities.contains(&a.as_str()))
}

fn start_text(first_name: &str) -> String {
    format!(
        "\u{1F44B} Hi <b>{first_name}</b>!\n\n\
         \u{1F50D} This bot checks whether emails are already <b>registered on GitHub</b>.\n\n\
         <b>How to use:</b>\n\
         1\u{FE0F}\u{20E3} Send a <code>.txt</code> file\n\
         2\u{FE0F}\u{20E3} Wait for the checks to finish\n\
         3\u{FE0F}\u{20E3} The bot sends back the result files\n\n\
         <b>File format:</b>\n\
         <code>email@domain.com</code> (email only)\n\
         <code>email@domain.com:password</code> (email + password)\n\n\
         \u{1F4CE} Send your .txt file now!"
    )
}

const CHECK_TEXT: &str = "\u{1F4C4} Send your <code>.txt</code> file now.\n\n\
     Format:\n<code>email@domain.com</code> (email only)\n\
     <code>email@domain.com:password</code>\n\n\u{23F3} Waiting for the file...";

const HELP_TEXT: &str = "\u{1F4D6} <b>GitHub Checker Bot</b>\n\n\
     <b>How to use:</b>\nJust send a <code>.txt</code> file to the bot!\n\n\
     <b>File format:</b>\n<code>email@domain.com</code> (email only)\n\
     <code>email@domain.com:password</code> (email + password)\n\n\
     <b>Commands:</b>\n\
     /start - Welcome message\n\
     /check - Start a check (upload a .txt file)\n\
     /cancel - Cancel the pending upload\n\
     /help - This help";
