//! Drives the embedded video player from idle to completed playback.
//!
//! The player lives in an iframe inside the lecture window. The sequence is
//! fixed: enter the frame, start playback, select the fastest speed, then
//! poll the clock until the video runs out, and hand control back to the
//! outer frame.

use std::time::{Duration, Instant};

use thirtyfour::By;
use tracing::{debug, info};

use crate::driver::Session;
use crate::error::{Error, Result};
use crate::parse::{format_clock, parse_clock};

const PLAYER_ID: &str = "player0";
const SPEED_MENU_ID: &str = "currentSpeedTitle";
/// Menu entries are `opSpeed_<tenths>`; 2.0x is the fastest the player offers.
const FASTEST_SPEED_ID: &str = "opSpeed_20";

const PLAY_BUTTON_XPATH: &str = r#"//*[@id="player0"]/div[6]/div[1]/div"#;
const CURRENT_TIME_XPATH: &str = r#"//*[@id="wp-controls-outer-controlbar"]/div[2]/div[2]/div/div/div[1]/span"#;
const TOTAL_TIME_XPATH: &str = r#"//*[@id="wp-controls-outer-controlbar"]/div[2]/div[2]/div/div/div[3]/span"#;
const RESUME_SEEK_XPATH: &str = r#"//*[@id="wp_elearning_seek"]"#;
const RESUME_PLAY_XPATH: &str = r#"//*[@id="wp_elearning_play"]"#;

const STATE_IDLE_MARKER: &str = "jw-state-idle";
const STATE_PAUSED_MARKER: &str = "jw-state-paused";
const STATE_PLAYING_MARKER: &str = "jw-state-playing";

/// Player widget state, read off its class list.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayerStatus {
	Unknown,
	Idle,
	Paused,
	Playing,
}

impl PlayerStatus {
	/// Anything without a recognized state marker is `Unknown`, never an error:
	/// the widget briefly carries no marker while loading.
	pub fn from_class(class_attr: &str) -> Self {
		if class_attr.contains(STATE_IDLE_MARKER) {
			return PlayerStatus::Idle;
		}
		if class_attr.contains(STATE_PAUSED_MARKER) {
			return PlayerStatus::Paused;
		}
		if class_attr.contains(STATE_PLAYING_MARKER) {
			return PlayerStatus::Playing;
		}
		PlayerStatus::Unknown
	}
}

/// The platform credits a lecture with up to a minute left on the clock.
const COMPLETION_SLACK: Duration = Duration::from_secs(60);

/// Runs the whole playback sequence inside the lecture window. Assumes the
/// caller has already switched the driver to that window.
pub async fn complete_playback(session: &Session) -> Result<()> {
	let iframe = session.wait_find_css("iframe", "player iframe").await?;
	iframe.enter_frame().await.map_err(|e| Error::driver("enter player iframe", e))?;

	start_player(session).await?;
	set_fastest_speed(session).await?;

	// Read the total once; only the current position moves.
	match read_clock(session, TOTAL_TIME_XPATH, "player total time display").await? {
		None => info!("player reports no total duration, video already finished"),
		Some(total) => {
			info!(total = %format_clock(total), "waiting for playback to finish");
			let started = Instant::now();
			loop {
				let current = read_clock(session, CURRENT_TIME_XPATH, "player current time display").await?;
				if is_playback_complete(total, current) {
					break;
				}
				if started.elapsed() > session.waits.completion_timeout {
					return Err(Error::timeout("video playback to finish", started.elapsed()));
				}
				tokio::time::sleep(session.waits.completion_interval).await;
			}
		}
	}

	info!("playback finished");
	session.driver.enter_default_frame().await.map_err(|e| Error::driver("return to lecture window frame", e))
}

/// Clicks the start control and polls until the widget actually reports
/// `Playing`, re-clicking any resume prompt along the way.
async fn start_player(session: &Session) -> Result<()> {
	let play_button = session.wait_find_xpath(PLAY_BUTTON_XPATH, "player start button").await?;
	play_button.click().await.map_err(|e| Error::driver("click player start button", e))?;

	let started = Instant::now();
	loop {
		click_resume_affordance(session).await?;

		let status = player_status(session).await?;
		if status == PlayerStatus::Playing {
			return Ok(());
		}
		debug!(?status, "player not started yet");

		if started.elapsed() > session.waits.play_start_timeout {
			return Err(Error::timeout("player to start playing", started.elapsed()));
		}
		tokio::time::sleep(session.waits.play_start_interval).await;
	}
}

/// Clicks whichever of the seek-to-resume / play prompts is present, if any.
/// Both are transient; absence means no prompt is up, which is fine. Clicking
/// an already-acknowledged prompt again is a harmless no-op.
async fn click_resume_affordance(session: &Session) -> Result<()> {
	for xpath in [RESUME_SEEK_XPATH, RESUME_PLAY_XPATH] {
		let controls = session.driver.find_all(By::XPath(xpath)).await.map_err(|e| Error::driver("look for resume prompt", e))?;
		if let Some(control) = controls.first() {
			control.click().await.map_err(|e| Error::driver("click resume prompt", e))?;
			return Ok(());
		}
	}
	Ok(())
}

async fn player_status(session: &Session) -> Result<PlayerStatus> {
	let player = session.driver.find(By::Id(PLAYER_ID)).await.map_err(|e| Error::not_found("player widget", e))?;
	let class = player.attr("class").await.map_err(|e| Error::driver("read player state classes", e))?;
	Ok(PlayerStatus::from_class(&class.unwrap_or_default()))
}

/// Opens the speed menu and picks the fastest option. The controls only render
/// while the pointer is over the player, hence the hover first.
async fn set_fastest_speed(session: &Session) -> Result<()> {
	let player = session.driver.find(By::Id(PLAYER_ID)).await.map_err(|e| Error::not_found("player widget", e))?;
	session.driver.action_chain().move_to_element_center(&player).perform().await.map_err(|e| Error::driver("hover over player", e))?;

	let speed_menu = session.driver.find(By::Id(SPEED_MENU_ID)).await.map_err(|e| Error::not_found("speed menu", e))?;
	speed_menu.click().await.map_err(|e| Error::driver("open speed menu", e))?;

	let fastest = session.driver.find(By::Id(FASTEST_SPEED_ID)).await.map_err(|e| Error::not_found("fastest speed option", e))?;
	let started = Instant::now();
	while !fastest.is_displayed().await.map_err(|e| Error::driver("check speed option visibility", e))? {
		if started.elapsed() > session.waits.ambient_timeout {
			return Err(Error::timeout("speed menu to become visible", started.elapsed()));
		}
		tokio::time::sleep(session.waits.ambient_interval).await;
	}
	fastest.click().await.map_err(|e| Error::driver("select fastest speed", e))
}

/// Reads one of the player clock displays. `None` means the display is blank,
/// which the player does once the video has finished.
async fn read_clock(session: &Session, xpath: &str, what: &str) -> Result<Option<Duration>> {
	let display = session.driver.find(By::XPath(xpath)).await.map_err(|e| Error::not_found(what, e))?;
	let text = display.text().await.map_err(|e| Error::driver("read player clock", e))?;
	parse_clock(&text)
}

fn is_playback_complete(total: Duration, current: Option<Duration>) -> bool {
	match current {
		None => true,
		Some(current) => total.saturating_sub(current) <= COMPLETION_SLACK,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_from_class_markers() {
		assert_eq!(PlayerStatus::from_class("jwplayer jw-state-idle jw-flag-user-inactive"), PlayerStatus::Idle);
		assert_eq!(PlayerStatus::from_class("jwplayer jw-state-paused"), PlayerStatus::Paused);
		assert_eq!(PlayerStatus::from_class("jwplayer jw-state-playing"), PlayerStatus::Playing);
	}

	#[test]
	fn test_status_defaults_to_unknown() {
		assert_eq!(PlayerStatus::from_class(""), PlayerStatus::Unknown);
		assert_eq!(PlayerStatus::from_class("jwplayer jw-state-buffering"), PlayerStatus::Unknown);
	}

	#[test]
	fn test_blank_clock_means_complete() {
		let total = parse_clock("10:00").unwrap().unwrap();
		assert!(is_playback_complete(total, parse_clock("").unwrap()));
	}

	#[test]
	fn test_completion_within_final_minute() {
		let total = parse_clock("10:00").unwrap().unwrap();
		assert!(is_playback_complete(total, parse_clock("09:10").unwrap()));
		assert!(is_playback_complete(total, parse_clock("09:00").unwrap()));
		assert!(is_playback_complete(total, parse_clock("10:00").unwrap()));
	}

	#[test]
	fn test_not_complete_with_minutes_left() {
		let total = parse_clock("10:00").unwrap().unwrap();
		assert!(!is_playback_complete(total, parse_clock("08:00").unwrap()));
		assert!(!is_playback_complete(total, parse_clock("00:00").unwrap()));
	}

	#[test]
	fn test_position_past_total_counts_as_complete() {
		let total = parse_clock("10:00").unwrap().unwrap();
		assert!(is_playback_complete(total, parse_clock("10:30").unwrap()));
	}
}
