use std::time::Duration;

use thirtyfour::error::WebDriverError;

/// Failure taxonomy for the automation pipeline.
///
/// Every variant records what was being attempted, so a failure logged at the
/// top level still reads without the caller reconstructing context.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Scraped text did not match the expected numeric or clock format.
	#[error("could not parse {what} from {text:?}")]
	Parse { what: &'static str, text: String },

	/// Element cardinality did not match the page layout this code was written against.
	#[error("unexpected page structure: {0}")]
	Structure(String),

	/// A required element was absent. Benign absences (e.g. a lecture without an
	/// exam link) are modeled at the lookup site and never produce this.
	#[error("{what}: element not found")]
	NotFound {
		what: String,
		#[source]
		source: WebDriverError,
	},

	/// A bounded wait elapsed without its predicate holding.
	#[error("timed out after {waited:?} waiting for {what}")]
	Timeout { what: String, waited: Duration },

	/// Any other WebDriver command failure.
	#[error("webdriver error while {op}")]
	Driver {
		op: String,
		#[source]
		source: WebDriverError,
	},

	/// A locally spawned chromedriver could not be started or reached.
	#[error("webdriver service: {0}")]
	Service(String),

	/// Credentials were submitted but the portal did not land where expected.
	#[error("login failed: {0}")]
	Login(String),

	/// Operator-channel delivery failure.
	#[error("telegram {op}: {reason}")]
	Notify { op: &'static str, reason: String },
}

impl Error {
	pub(crate) fn parse(what: &'static str, text: impl Into<String>) -> Self {
		Error::Parse { what, text: text.into() }
	}

	pub(crate) fn structure(msg: impl Into<String>) -> Self {
		Error::Structure(msg.into())
	}

	pub(crate) fn not_found(what: impl Into<String>, source: WebDriverError) -> Self {
		Error::NotFound { what: what.into(), source }
	}

	pub(crate) fn timeout(what: impl Into<String>, waited: Duration) -> Self {
		Error::Timeout { what: what.into(), waited }
	}

	pub(crate) fn driver(op: impl Into<String>, source: WebDriverError) -> Self {
		Error::Driver { op: op.into(), source }
	}

	pub(crate) fn notify(op: &'static str, reason: impl Into<String>) -> Self {
		Error::Notify { op, reason: reason.into() }
	}
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
