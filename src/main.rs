use std::time::Duration;

use clap::Parser;
use color_eyre::{Result, eyre::eyre};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uni_autostudy::config::{AppConfig, DriverConfig, PortalUrls, WaitConfig};
use uni_autostudy::driver::{DriverService, Session};
use uni_autostudy::notify::{Command, TelegramBot};
use uni_autostudy::watch::Watcher;
use uni_autostudy::{login, report, subjects};

#[derive(Debug, Parser)]
#[command(name = "uni_autostudy")]
#[command(about = "Automated e-learning lecture completion", long_about = None)]
struct Args {
	/// Portal account id
	#[arg(long, env = "UNIV_ID")]
	univ_id: String,

	/// Portal account password
	#[arg(long, env = "UNIV_PW")]
	univ_pw: String,

	/// Login page URL
	#[arg(long, env = "URL_MAIN")]
	url_main: String,

	/// Page a successful login redirects to
	#[arg(long, env = "URL_MY_PROFILE")]
	url_my_profile: String,

	/// Lecture-progress page URL
	#[arg(long, env = "URL_LECTURE_PAGE")]
	url_lecture_page: String,

	/// WebDriver endpoint to connect to
	#[arg(long, env = "WEB_DRIVER_URL", default_value = "http://localhost:4444")]
	webdriver_url: String,

	/// Spawn this chromedriver binary locally instead of expecting a running endpoint
	#[arg(long, env = "CHROMEDRIVER_PATH")]
	chromedriver: Option<String>,

	/// Run the browser headless
	#[arg(long, env = "RUN_HEADLESS")]
	headless: bool,

	/// Telegram bot API token
	#[arg(long, env = "TELEGRAM_API_TOKEN")]
	telegram_token: String,

	/// Telegram chat id reports are sent to
	#[arg(long, env = "TELEGRAM_CHAT_ID")]
	telegram_chat_id: i64,

	/// Hours between scheduled automation passes
	#[arg(long, env = "RUN_INTERVAL_HOURS", default_value_t = 24, value_parser = clap::value_parser!(u64).range(1..))]
	interval_hours: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

	let args = Args::parse();
	let config = AppConfig {
		univ_id: args.univ_id,
		univ_pw: args.univ_pw,
		urls: PortalUrls {
			main: args.url_main,
			my_profile: args.url_my_profile,
			lecture: args.url_lecture_page,
		},
		driver: DriverConfig {
			webdriver_url: args.webdriver_url,
			chromedriver: args.chromedriver,
			headless: args.headless,
		},
		waits: WaitConfig::default(),
	};
	let bot = TelegramBot::new(&args.telegram_token, args.telegram_chat_id).map_err(|e| eyre!("telegram bot init: {}", e))?;

	// First scheduled pass fires one full interval from now; the operator can
	// always trigger one earlier with /run.
	let period = Duration::from_secs(args.interval_hours * 60 * 60);
	let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
	info!(interval_hours = args.interval_hours, "scheduler started");

	loop {
		let command = tokio::select! {
			_ = ticker.tick() => Command::Run,
			command = bot.next_command() => match command {
				Ok(command) => command,
				Err(e) => {
					error!(error = %e, "operator channel failed, retrying");
					tokio::time::sleep(Duration::from_secs(5)).await;
					continue;
				}
			},
		};

		// Passes are strictly serialized: the browser session is a single
		// stateful resource, so a command arriving mid-pass waits its turn.
		run_pass(&config, &bot, command).await;
	}
}

/// One full automation pass: acquire a fresh browser, do the work, report any
/// failure to the operator, and tear the browser down again no matter what.
async fn run_pass(config: &AppConfig, bot: &TelegramBot, command: Command) {
	info!(?command, "starting pass");

	let service = match &config.driver.chromedriver {
		Some(binary) => match DriverService::spawn(binary, &config.waits).await {
			Ok(service) => Some(service),
			Err(e) => {
				report_failure(None, bot, &e).await;
				return;
			}
		},
		None => None,
	};

	let session = match Session::connect(&config.driver.webdriver_url, config.driver.headless, config.waits).await {
		Ok(session) => session,
		Err(e) => {
			report_failure(None, bot, &e).await;
			stop_service(service).await;
			return;
		}
	};

	let outcome = match command {
		Command::Run => complete_lectures(&session, config, bot).await,
		Command::Report => send_progress_report(&session, config, bot).await,
	};
	match &outcome {
		Ok(()) => info!(?command, "pass finished"),
		Err(e) => report_failure(Some(&session), bot, e).await,
	}

	if let Err(e) = session.quit().await {
		warn!(error = %e, "browser session quit failed");
	}
	stop_service(service).await;
}

async fn complete_lectures(session: &Session, config: &AppConfig, bot: &TelegramBot) -> uni_autostudy::Result<()> {
	login::login(session, config).await?;

	let watcher = Watcher::new(session, &config.urls.lecture, Some(bot));
	subjects::collect_subjects(session, &config.urls.lecture, true, Some(&watcher)).await?;

	bot.send_message("Done").await
}

async fn send_progress_report(session: &Session, config: &AppConfig, bot: &TelegramBot) -> uni_autostudy::Result<()> {
	login::login(session, config).await?;

	let subjects = subjects::collect_subjects(session, &config.urls.lecture, true, None::<&Watcher>).await?;
	bot.send_message(&report::not_completed_report(&subjects)).await
}

/// Tells the operator what went wrong, with a screenshot of the browser when
/// one is still available. Delivery problems only get logged; the pass is
/// already failing.
async fn report_failure(session: Option<&Session>, bot: &TelegramBot, failure: &uni_autostudy::Error) {
	error!(error = %failure, "pass failed");

	if let Err(e) = bot.send_message("에러가 발생했습니다.").await {
		warn!(error = %e, "could not deliver failure notice");
	}
	if let Err(e) = bot.send_message(&failure.to_string()).await {
		warn!(error = %e, "could not deliver failure detail");
	}

	let Some(session) = session else { return };
	match session.screenshot_png().await {
		Ok(png) => {
			if let Err(e) = bot.send_photo(&png).await {
				warn!(error = %e, "could not deliver failure screenshot");
			}
		}
		Err(e) => warn!(error = %e, "could not capture failure screenshot"),
	}
}

async fn stop_service(service: Option<DriverService>) {
	if let Some(service) = service {
		if let Err(e) = service.stop().await {
			warn!(error = %e, "chromedriver stop failed");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn required_args() -> Vec<&'static str> {
		vec![
			"uni_autostudy",
			"--univ-id",
			"student",
			"--univ-pw",
			"secret",
			"--url-main",
			"https://portal.example/login",
			"--url-my-profile",
			"https://portal.example/me",
			"--url-lecture-page",
			"https://portal.example/lectures",
			"--telegram-token",
			"token",
			"--telegram-chat-id",
			"1",
		]
	}

	#[test]
	fn test_interval_defaults_to_daily() {
		let args = Args::try_parse_from(required_args()).unwrap();
		assert_eq!(args.interval_hours, 24);
	}

	#[test]
	fn test_zero_interval_is_rejected_at_parse_time() {
		let mut argv = required_args();
		argv.extend(["--interval-hours", "0"]);
		assert!(Args::try_parse_from(argv).is_err());
	}
}
