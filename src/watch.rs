//! The watch flow: what happens to a lecture that still needs attention.
//!
//! Clicking a lecture title opens the player in a second browser window; the
//! whole flow runs there and hands control back to the main window when done.

use std::time::Instant;

use thirtyfour::WebElement;
use tracing::{info, warn};

use crate::driver::Session;
use crate::error::{Error, Result};
use crate::notify::TelegramBot;
use crate::{Lecture, player, quiz};

/// Behavior injected into subject extraction for every ready, not-done
/// lecture. Swappable so a pass can complete lectures, merely observe them, or
/// record them in tests.
#[allow(async_fn_in_trait)] // always driven on the caller's task
pub trait WatchHandler {
	/// Called mid-extraction with the freshly classified lecture and the
	/// clickable element that opens its player window.
	async fn on_lecture_ready(&self, lecture: &Lecture, open_button: &WebElement) -> Result<()>;
}

/// The production handler: opens the lecture window, finishes playback,
/// answers the quiz, and closes the window again.
pub struct Watcher<'a> {
	session: &'a Session,
	/// Page the lecture rows live on; opening a window is only valid from here.
	lecture_url: &'a str,
	notifier: Option<&'a TelegramBot>,
}

impl<'a> Watcher<'a> {
	pub fn new(session: &'a Session, lecture_url: &'a str, notifier: Option<&'a TelegramBot>) -> Self {
		Watcher { session, lecture_url, notifier }
	}
}

impl WatchHandler for Watcher<'_> {
	async fn on_lecture_ready(&self, lecture: &Lecture, open_button: &WebElement) -> Result<()> {
		info!(title = %lecture.title, has_played = lecture.has_played, needs_quiz = lecture.needs_quiz(), "watching lecture");
		self.session.ensure_url(self.lecture_url).await?;

		open_button.click().await.map_err(|e| Error::driver(format!("open lecture window for {:?}", lecture.title), e))?;

		// The player opens as a popup; wait for its handle to show up.
		let started = Instant::now();
		let handles = loop {
			let handles = self.session.driver.windows().await.map_err(|e| Error::driver("list window handles", e))?;
			if handles.len() >= 2 {
				break handles;
			}
			if started.elapsed() > self.session.waits.ambient_timeout {
				return Err(Error::timeout(format!("lecture window to open for {:?}", lecture.title), started.elapsed()));
			}
			tokio::time::sleep(self.session.waits.ambient_interval).await;
		};
		let (main_window, lecture_window) = (handles[0].clone(), handles[1].clone());

		self.session.driver.switch_to_window(lecture_window).await.map_err(|e| Error::driver("switch to lecture window", e))?;

		// On failure the popup is deliberately left open: the pass teardown quits
		// the whole session, and the window is where the failure screenshot
		// comes from.
		if !lecture.has_played {
			player::complete_playback(self.session).await?;
		}
		if lecture.needs_quiz() {
			quiz::solve(self.session).await?;
		}

		self.session.driver.close_window().await.map_err(|e| Error::driver("close lecture window", e))?;
		self.session.driver.switch_to_window(main_window).await.map_err(|e| Error::driver("switch back to main window", e))?;

		if let Some(bot) = self.notifier {
			if let Err(e) = bot.send_message(&format!("Done: {}", lecture.title)).await {
				warn!(error = %e, "could not send per-lecture notice");
			}
		}

		Ok(())
	}
}
