use std::time::Duration;

/// Everything one automation pass needs to know. Assembled once in `main` from
/// CLI flags / environment and passed by reference through the pipeline.
#[derive(Clone, Debug)]
pub struct AppConfig {
	/// Portal account id.
	pub univ_id: String,
	/// Portal account password.
	pub univ_pw: String,
	pub urls: PortalUrls,
	pub driver: DriverConfig,
	pub waits: WaitConfig,
}

/// Where the browser comes from.
#[derive(Clone, Debug)]
pub struct DriverConfig {
	/// WebDriver endpoint, e.g. `http://localhost:4444`.
	pub webdriver_url: String,
	/// Spawn this chromedriver binary locally instead of expecting one to be
	/// running already. It listens on the fixed service port, so
	/// `webdriver_url` should point there.
	pub chromedriver: Option<String>,
	pub headless: bool,
}

/// Portal entry points. The lecture page doubles as the page the watch flow is
/// anchored to: launching a lecture window is only valid from there.
#[derive(Clone, Debug)]
pub struct PortalUrls {
	/// Login form page.
	pub main: String,
	/// Where a successful login lands; login is verified against this.
	pub my_profile: String,
	/// Lecture-progress page listing every subject.
	pub lecture: String,
}

/// Explicit (timeout, interval) pairs for every bounded wait in the pipeline.
///
/// The ambient pair backs each wait that has no tuned timing of its own:
/// iframe lookup, speed-menu visibility, quiz confirm appearance, the second
/// window opening, and the post-login redirect.
#[derive(Clone, Copy, Debug)]
pub struct WaitConfig {
	pub ambient_timeout: Duration,
	pub ambient_interval: Duration,
	/// Pair for "playback actually started".
	pub play_start_timeout: Duration,
	pub play_start_interval: Duration,
	/// Pair for "playback ran to completion". The timeout is a safety ceiling;
	/// real playback time is the expected cost.
	pub completion_timeout: Duration,
	pub completion_interval: Duration,
}

impl Default for WaitConfig {
	fn default() -> Self {
		WaitConfig {
			ambient_timeout: Duration::from_secs(60),
			ambient_interval: Duration::from_millis(500),
			play_start_timeout: Duration::from_secs(60),
			play_start_interval: Duration::from_secs(2),
			completion_timeout: Duration::from_secs(24 * 60 * 60),
			completion_interval: Duration::from_secs(60),
		}
	}
}
