//! Browser session plumbing: capabilities, the optional locally spawned
//! chromedriver, and the ambient element waits everything else leans on.

use std::process::Stdio;
use std::time::Instant;

use thirtyfour::{By, ChromeCapabilities, ChromiumLikeCapabilities, DesiredCapabilities, WebDriver, WebElement};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::config::WaitConfig;
use crate::error::{Error, Result};

/// Port a locally spawned chromedriver listens on.
pub const SERVICE_PORT: u16 = 4444;

const CHROME_ARGS: [&str; 5] = [
	"window-size=1920x1080",
	"--no-sandbox",
	"--disable-dev-shm-usage",
	"disable-gpu",
	"user-agent=Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_3) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/80.0.3987.87 Safari/537.36",
];

/// Exclusive handle to one browser automation pass.
///
/// Acquired once per pass and must be quit on every exit path; the next pass
/// gets a fresh one.
pub struct Session {
	pub driver: WebDriver,
	pub waits: WaitConfig,
}

impl Session {
	/// Opens a WebDriver session with the capabilities the portal needs.
	pub async fn connect(webdriver_url: &str, headless: bool, waits: WaitConfig) -> Result<Self> {
		let caps = chrome_capabilities(headless)?;
		let driver = WebDriver::new(webdriver_url, caps).await.map_err(|e| Error::driver(format!("connect to webdriver at {webdriver_url}"), e))?;
		info!(url = webdriver_url, headless, "browser session opened");
		Ok(Session { driver, waits })
	}

	/// Navigates to `url` unless the current URL already contains it. The
	/// contains check deliberately ignores query strings the portal appends.
	pub async fn ensure_url(&self, url: &str) -> Result<()> {
		let current = self.driver.current_url().await.map_err(|e| Error::driver("read current url", e))?;
		if !current.as_str().contains(url) {
			self.driver.goto(url).await.map_err(|e| Error::driver(format!("navigate to {url}"), e))?;
		}
		Ok(())
	}

	/// Polls with the ambient pair until a CSS match appears, then returns it.
	/// Lookup failures only end the wait through the timeout.
	pub async fn wait_find_css(&self, css: &str, what: &str) -> Result<WebElement> {
		let started = Instant::now();
		loop {
			if let Ok(element) = self.driver.find(By::Css(css)).await {
				return Ok(element);
			}
			if started.elapsed() > self.waits.ambient_timeout {
				return Err(Error::timeout(what, started.elapsed()));
			}
			tokio::time::sleep(self.waits.ambient_interval).await;
		}
	}

	/// [`Self::wait_find_css`] for the few spots only an XPath can address.
	pub async fn wait_find_xpath(&self, xpath: &str, what: &str) -> Result<WebElement> {
		let started = Instant::now();
		loop {
			if let Ok(element) = self.driver.find(By::XPath(xpath)).await {
				return Ok(element);
			}
			if started.elapsed() > self.waits.ambient_timeout {
				return Err(Error::timeout(what, started.elapsed()));
			}
			tokio::time::sleep(self.waits.ambient_interval).await;
		}
	}

	/// Full-page screenshot, PNG bytes.
	pub async fn screenshot_png(&self) -> Result<Vec<u8>> {
		self.driver.screenshot_as_png().await.map_err(|e| Error::driver("take screenshot", e))
	}

	/// Ends the session. The pass is over either way, so callers only log a
	/// failure here.
	pub async fn quit(self) -> Result<()> {
		self.driver.quit().await.map_err(|e| Error::driver("quit webdriver session", e))
	}
}

fn chrome_capabilities(headless: bool) -> Result<ChromeCapabilities> {
	let mut caps = DesiredCapabilities::chrome();
	for arg in CHROME_ARGS {
		caps.add_arg(arg).map_err(|e| Error::driver("build chrome capabilities", e))?;
	}
	if headless {
		caps.add_arg("--headless").map_err(|e| Error::driver("build chrome capabilities", e))?;
	}
	Ok(caps)
}

/// A chromedriver spawned next to us, for setups without a remote grid.
///
/// The child is killed on drop as a safety net, but callers stop it explicitly
/// so shutdown failures surface.
pub struct DriverService {
	child: Child,
	pub url: String,
}

impl DriverService {
	/// Starts `binary` on [`SERVICE_PORT`] and waits until it accepts
	/// connections.
	pub async fn spawn(binary: &str, waits: &WaitConfig) -> Result<Self> {
		let child = Command::new(binary)
			.arg(format!("--port={SERVICE_PORT}"))
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| Error::Service(format!("spawn {binary}: {e}")))?;
		debug!(binary, port = SERVICE_PORT, "chromedriver spawned");

		let started = Instant::now();
		loop {
			if TcpStream::connect(("127.0.0.1", SERVICE_PORT)).await.is_ok() {
				break;
			}
			if started.elapsed() > waits.ambient_timeout {
				return Err(Error::Service(format!("chromedriver did not accept connections within {:?}", waits.ambient_timeout)));
			}
			tokio::time::sleep(waits.ambient_interval).await;
		}

		Ok(DriverService {
			child,
			url: format!("http://localhost:{SERVICE_PORT}"),
		})
	}

	pub async fn stop(mut self) -> Result<()> {
		self.child.kill().await.map_err(|e| Error::Service(format!("stop chromedriver: {e}")))?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_chrome_capabilities_accept_every_arg() {
		assert!(chrome_capabilities(false).is_ok());
		assert!(chrome_capabilities(true).is_ok());
	}
}
