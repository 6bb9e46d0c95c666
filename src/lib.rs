//! Automated completion of a university e-learning portal: enumerates subjects
//! and lectures, finishes outstanding video playback through the embedded
//! player, answers lecture quizzes, and reports progress over Telegram.

use std::{fmt, time::Duration};

pub mod config;
pub mod driver;
pub mod error;
pub mod login;
pub mod notify;
pub mod parse;
pub mod player;
pub mod quiz;
pub mod report;
pub mod subjects;
pub mod watch;

pub use error::{Error, Result};

/// One watchable unit inside a subject, snapshotted from its lecture row.
///
/// Instances are immutable: every pass re-scrapes the page and builds fresh
/// values, so there is no cross-pass identity to maintain.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Lecture {
	pub title: String,
	/// False while the platform still lists the lecture as pending. All other
	/// fields stay at their defaults in that case.
	pub is_ready: bool,
	pub has_played: bool,
	pub has_exam: bool,
	pub has_exam_completed: bool,
	/// Whole minutes, as the lecture row displays them.
	pub playback_position: Duration,
	pub playback_duration: Duration,
}

impl Lecture {
	/// A still-locked lecture: only the title is known.
	pub fn pending(title: impl Into<String>) -> Self {
		Lecture { title: title.into(), ..Lecture::default() }
	}

	/// Playback is required when the lecture was never played, or when a pending
	/// exam forces the lecture window open again: the quiz UI is only reachable
	/// from a fresh playback launch, so an already-watched lecture with an
	/// unfinished exam still goes through the player.
	pub fn needs_playback(&self) -> bool {
		self.is_ready && (!self.has_played || (self.has_exam && !self.has_exam_completed))
	}

	pub fn needs_quiz(&self) -> bool {
		self.has_exam && !self.has_exam_completed
	}

	pub fn is_done(&self) -> bool {
		self.is_ready && !self.needs_playback() && !self.needs_quiz()
	}
}

impl fmt::Display for Lecture {
	/// Renders the operator-report status line for this lecture.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if !self.is_ready {
			return write!(f, "{} 준비중", self.title);
		}

		write!(f, "{} playback: {}", self.title, checkbox(self.has_played))?;
		if self.has_exam {
			write!(f, " quiz: {}", checkbox(self.has_exam_completed))?;
		}
		Ok(())
	}
}

fn checkbox(v: bool) -> &'static str {
	if v { "[v]" } else { "[-]" }
}

/// A top-level course unit: a titled group of lectures plus the completion
/// percentage the portal itself displays.
#[derive(Clone, Debug, Default)]
pub struct Subject {
	pub title: String,
	/// Portal-reported completion, 0-100.
	pub progress: f32,
	/// Lectures in on-page order; empty when row expansion was skipped.
	pub lectures: Vec<Lecture>,
}

impl Subject {
	/// True iff every contained lecture is done. Vacuously true for an
	/// unexpanded subject.
	pub fn is_completed(&self) -> bool {
		self.lectures.iter().all(Lecture::is_done)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ready(has_played: bool, has_exam: bool, has_exam_completed: bool) -> Lecture {
		Lecture {
			title: "역사의 이해".to_owned(),
			is_ready: true,
			has_played,
			has_exam,
			has_exam_completed,
			playback_position: Duration::from_secs(10 * 60),
			playback_duration: Duration::from_secs(30 * 60),
		}
	}

	#[test]
	fn test_pending_lecture_has_no_obligations() {
		let l = Lecture::pending("아직 안 열림");
		assert!(!l.needs_playback());
		assert!(!l.needs_quiz());
		assert!(!l.is_done());
	}

	#[test]
	fn test_unplayed_lecture_needs_playback() {
		let l = ready(false, false, false);
		assert!(l.needs_playback());
		assert!(!l.needs_quiz());
		assert!(!l.is_done());
	}

	#[test]
	fn test_played_lecture_without_exam_is_done() {
		assert!(ready(true, false, false).is_done());
	}

	#[test]
	fn test_pending_exam_retriggers_playback() {
		// Played to the end, but the exam is still open: the lecture window has
		// to be launched again to reach the quiz.
		let l = ready(true, true, false);
		assert!(l.needs_playback());
		assert!(l.needs_quiz());
		assert!(!l.is_done());
	}

	#[test]
	fn test_completed_exam_closes_the_lecture() {
		assert!(ready(true, true, true).is_done());
	}

	#[test]
	fn test_classifier_laws_hold_for_every_flag_combination() {
		for bits in 0..16u8 {
			let l = Lecture {
				is_ready: bits & 1 != 0,
				has_played: bits & 2 != 0,
				has_exam: bits & 4 != 0,
				has_exam_completed: bits & 8 != 0,
				..Lecture::default()
			};

			if !l.is_ready {
				assert!(!l.needs_playback() && !l.is_done(), "unready lecture must stay inert: {l:?}");
			} else {
				assert_eq!(l.is_done(), !l.needs_playback() && !l.needs_quiz(), "{l:?}");
			}
			assert_eq!(l.needs_quiz(), l.has_exam && !l.has_exam_completed, "{l:?}");
		}
	}

	#[test]
	fn test_subject_completion() {
		let mut subject = Subject {
			title: "교양필수".to_owned(),
			progress: 50.0,
			lectures: vec![ready(true, false, false), ready(false, false, false)],
		};
		assert!(!subject.is_completed());

		subject.lectures = vec![ready(true, false, false), ready(true, true, true)];
		assert!(subject.is_completed());
	}

	#[test]
	fn test_empty_subject_counts_as_completed() {
		assert!(Subject::default().is_completed());
	}

	#[test]
	fn test_status_line_rendering() {
		assert_eq!(Lecture::pending("1주차").to_string(), "1주차 준비중");
		assert_eq!(ready(false, false, false).to_string(), "역사의 이해 playback: [-]");
		assert_eq!(ready(true, true, false).to_string(), "역사의 이해 playback: [v] quiz: [-]");
	}
}
