//! Operator channel: a Telegram bot that pushes progress/failure messages and
//! receives `/run` / `/report` commands over long polling.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{Error, Result};

const CMD_RUN: &str = "run";
const CMD_REPORT: &str = "report";

/// Server-side hold time of one getUpdates long poll.
const LONG_POLL_SECS: u64 = 60;

/// A command the operator can issue from the chat keyboard.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
	/// Run a full automation pass now.
	Run,
	/// Collect and send the not-yet-completed report without watching anything.
	Report,
}

impl Command {
	/// Parses an incoming message into a known command. Handles `/run@botname`
	/// and trailing arguments; anything unknown is `None` and gets ignored.
	pub fn parse(text: &str) -> Option<Self> {
		let word = text.trim().strip_prefix('/')?;
		let word = word.split_whitespace().next().unwrap_or_default();
		let word = word.split('@').next().unwrap_or_default();
		match word {
			CMD_RUN => Some(Command::Run),
			CMD_REPORT => Some(Command::Report),
			_ => None,
		}
	}
}

/// Bot handle bound to one chat. All sends target that chat; the reply
/// keyboard offering the two commands is attached to every message.
pub struct TelegramBot {
	http: reqwest::Client,
	base_url: String,
	chat_id: i64,
	/// getUpdates confirmation cursor: next poll acknowledges everything below.
	offset: AtomicI64,
}

impl TelegramBot {
	pub fn new(token: &str, chat_id: i64) -> Result<Self> {
		// The client timeout must outlast the server-side long-poll hold.
		let http = reqwest::Client::builder()
			.timeout(Duration::from_secs(LONG_POLL_SECS + 30))
			.build()
			.map_err(|e| Error::notify("build http client", e.to_string()))?;

		Ok(TelegramBot {
			http,
			base_url: format!("https://api.telegram.org/bot{token}"),
			chat_id,
			offset: AtomicI64::new(0),
		})
	}

	pub async fn send_message(&self, text: &str) -> Result<()> {
		let payload = json!({
			"chat_id": self.chat_id,
			"text": text,
			"reply_markup": keyboard_markup(),
		});
		let response = self.http.post(format!("{}/sendMessage", self.base_url)).json(&payload).send().await.map_err(|e| Error::notify("sendMessage", e.to_string()))?;
		check_status(response, "sendMessage").await
	}

	/// Sends PNG bytes as a photo, named after the current timestamp.
	pub async fn send_photo(&self, png: &[u8]) -> Result<()> {
		let file_name = format!("{}.png", chrono::Local::now().format("%Y-%m-%d %H:%M:%S %z"));
		let photo = reqwest::multipart::Part::bytes(png.to_vec())
			.file_name(file_name)
			.mime_str("image/png")
			.map_err(|e| Error::notify("sendPhoto", e.to_string()))?;
		let form = reqwest::multipart::Form::new()
			.text("chat_id", self.chat_id.to_string())
			.text("reply_markup", keyboard_markup().to_string())
			.part("photo", photo);

		let response = self.http.post(format!("{}/sendPhoto", self.base_url)).multipart(form).send().await.map_err(|e| Error::notify("sendPhoto", e.to_string()))?;
		check_status(response, "sendPhoto").await
	}

	/// Long-polls until the operator issues a recognized command. Only updates
	/// up to the consumed one get confirmed, so a second command queued in the
	/// same batch is redelivered by the next poll instead of vanishing.
	pub async fn next_command(&self) -> Result<Command> {
		loop {
			let updates = self.get_updates().await?;
			let (ack, command) = first_command(&updates);
			if let Some(ack) = ack {
				self.offset.store(ack, Ordering::Relaxed);
			}
			if let Some(command) = command {
				debug!(?command, "operator command received");
				return Ok(command);
			}
		}
	}

	async fn get_updates(&self) -> Result<Vec<Update>> {
		let payload = json!({
			"offset": self.offset.load(Ordering::Relaxed),
			"timeout": LONG_POLL_SECS,
		});
		let response = self.http.post(format!("{}/getUpdates", self.base_url)).json(&payload).send().await.map_err(|e| Error::notify("getUpdates", e.to_string()))?;
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(Error::notify("getUpdates", format!("HTTP {status}: {body}")));
		}

		let parsed: UpdatesResponse = response.json().await.map_err(|e| Error::notify("getUpdates", e.to_string()))?;
		if !parsed.ok {
			return Err(Error::notify("getUpdates", "api returned ok=false"));
		}
		Ok(parsed.result)
	}
}

async fn check_status(response: reqwest::Response, op: &'static str) -> Result<()> {
	let status = response.status();
	if !status.is_success() {
		let body = response.text().await.unwrap_or_default();
		return Err(Error::notify(op, format!("HTTP {status}: {body}")));
	}
	Ok(())
}

/// Picks the first recognized command out of a getUpdates batch, plus the
/// confirmation offset to store. The offset stops at the consumed update;
/// anything after it stays unconfirmed and comes back on the next poll.
fn first_command(updates: &[Update]) -> (Option<i64>, Option<Command>) {
	for update in updates {
		let command = update.message.as_ref().and_then(|m| m.text.as_deref()).and_then(Command::parse);
		if let Some(command) = command {
			return (Some(update.update_id + 1), Some(command));
		}
	}
	(updates.last().map(|last| last.update_id + 1), None)
}

/// Persistent reply keyboard exposing the two supported commands.
fn keyboard_markup() -> serde_json::Value {
	json!({
		"keyboard": [[
			{ "text": format!("/{CMD_RUN}") },
			{ "text": format!("/{CMD_REPORT}") },
		]],
		"resize_keyboard": true,
	})
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
	ok: bool,
	#[serde(default)]
	result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
	update_id: i64,
	message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
	text: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_known_commands() {
		assert_eq!(Command::parse("/run"), Some(Command::Run));
		assert_eq!(Command::parse("/report"), Some(Command::Report));
		assert_eq!(Command::parse("  /run  "), Some(Command::Run));
	}

	#[test]
	fn test_parse_bot_suffix_and_arguments() {
		assert_eq!(Command::parse("/run@autostudy_bot"), Some(Command::Run));
		assert_eq!(Command::parse("/report now please"), Some(Command::Report));
	}

	#[test]
	fn test_parse_rejects_everything_else() {
		assert_eq!(Command::parse("run"), None);
		assert_eq!(Command::parse("/stop"), None);
		assert_eq!(Command::parse("/"), None);
		assert_eq!(Command::parse(""), None);
		assert_eq!(Command::parse("안녕하세요"), None);
	}

	#[test]
	fn test_keyboard_lists_both_commands() {
		let rendered = keyboard_markup().to_string();
		assert!(rendered.contains("/run"));
		assert!(rendered.contains("/report"));
	}

	fn update(update_id: i64, text: &str) -> Update {
		Update {
			update_id,
			message: Some(IncomingMessage { text: Some(text.to_string()) }),
		}
	}

	#[test]
	fn test_second_command_in_a_batch_stays_unconfirmed() {
		let updates = [update(7, "/run"), update(8, "/report")];
		let (ack, command) = first_command(&updates);
		assert_eq!(command, Some(Command::Run));
		// Redelivery resumes at update 8, which has not been confirmed yet.
		assert_eq!(ack, Some(8));
	}

	#[test]
	fn test_chatter_before_a_command_is_confirmed_with_it() {
		let updates = [update(3, "안녕하세요"), update(4, "/report")];
		let (ack, command) = first_command(&updates);
		assert_eq!(command, Some(Command::Report));
		assert_eq!(ack, Some(5));
	}

	#[test]
	fn test_commandless_batch_is_fully_confirmed() {
		let updates = [update(1, "hello"), update(2, "/stop")];
		let (ack, command) = first_command(&updates);
		assert_eq!(command, None);
		assert_eq!(ack, Some(3));
	}

	#[test]
	fn test_empty_batch_keeps_the_cursor() {
		assert_eq!(first_command(&[]), (None, None));
	}
}
