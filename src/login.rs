//! Credential submission against the portal's login form.

use std::time::Instant;

use thirtyfour::{By, Key};
use tracing::info;

use crate::config::AppConfig;
use crate::driver::Session;
use crate::error::{Error, Result};

/// Logs in through the main page form and waits for the post-login redirect
/// to land on the profile page.
pub async fn login(session: &Session, config: &AppConfig) -> Result<()> {
	info!(url = %config.urls.main, "logging in");
	session.driver.goto(config.urls.main.as_str()).await.map_err(|e| Error::driver(format!("navigate to {}", config.urls.main), e))?;

	let id_field = session.driver.find(By::Id("username")).await.map_err(|e| Error::not_found("login username field", e))?;
	id_field.send_keys(config.univ_id.as_str()).await.map_err(|e| Error::driver("type username", e))?;

	let pw_field = session.driver.find(By::Id("password")).await.map_err(|e| Error::not_found("login password field", e))?;
	pw_field.send_keys(config.univ_pw.as_str()).await.map_err(|e| Error::driver("type password", e))?;
	pw_field.send_keys(Key::Enter + "").await.map_err(|e| Error::driver("submit login form", e))?;

	// The portal redirects to the profile page on success. Staying on the login
	// form (or bouncing anywhere else) past the ambient timeout means the
	// credentials were rejected.
	let started = Instant::now();
	loop {
		let current = session.driver.current_url().await.map_err(|e| Error::driver("read current url", e))?;
		if current.as_str().contains(config.urls.my_profile.as_str()) {
			info!("login landed on profile page");
			return Ok(());
		}
		if started.elapsed() > session.waits.ambient_timeout {
			return Err(Error::Login(format!("expected to land on {}, still at {}", config.urls.my_profile, current)));
		}
		tokio::time::sleep(session.waits.ambient_interval).await;
	}
}
