//! Extraction of the lecture-progress page into [`Subject`]/[`Lecture`] values.

use std::time::Duration;

use thirtyfour::{By, WebElement};
use tracing::debug;

use crate::driver::Session;
use crate::error::{Error, Result};
use crate::parse::{is_checked, parse_minutes, parse_percent};
use crate::watch::WatchHandler;
use crate::{Lecture, Subject};

// Class names the portal renders the progress board with.
const CLS_PROGRESS_BOARD: &str = "lecture-progress";
const CLS_SUBJECT_ROW: &str = "lecture-progress-item";
const CLS_SUBJECT_INFO: &str = "lecture-info";
const CLS_SUBJECT_PROGRESS: &str = "lecture-per";
const CLS_PROGRESS_VALUE: &str = "value";
const CLS_EXPAND_TOGGLE: &str = "btn-toggle";
const CLS_SUBJECT_BODY: &str = "lecture-progress-item-body";
const CLS_LECTURE_LIST: &str = "lecture-list";
const CLS_LECTURE_ROW: &str = "clearfix";
const CLS_LECTURE_TITLE: &str = "lecture-title";
const CLS_WAITING_MARKER: &str = "con-waiting";
const CLS_LECTURE_STATUS: &str = "lecture-list-in";

/// Walks the lecture-progress page and returns every subject in page order.
///
/// With `with_lectures` set, each subject row is expanded and its lectures are
/// extracted and classified; for every ready lecture that is not yet done, the
/// watch handler (when supplied) runs to completion before extraction moves
/// on. A handler failure aborts the whole pass for that page.
pub async fn collect_subjects<W: WatchHandler>(session: &Session, lecture_url: &str, with_lectures: bool, watcher: Option<&W>) -> Result<Vec<Subject>> {
	session.ensure_url(lecture_url).await?;

	let board = session.wait_find_css(&format!(".{CLS_PROGRESS_BOARD}"), "lecture progress board").await?;
	let rows = board.find_all(By::ClassName(CLS_SUBJECT_ROW)).await.map_err(|e| Error::driver("list subject rows", e))?;
	debug!(subjects = rows.len(), "progress board loaded");

	let mut subjects = Vec::with_capacity(rows.len());
	for row in &rows {
		subjects.push(parse_subject(row, with_lectures, watcher).await?);
	}
	Ok(subjects)
}

async fn parse_subject<W: WatchHandler>(row: &WebElement, with_lectures: bool, watcher: Option<&W>) -> Result<Subject> {
	let info = row.find(By::ClassName(CLS_SUBJECT_INFO)).await.map_err(|e| Error::not_found("subject info block", e))?;
	let progress = extract_progress(&info).await?;

	let toggle = info.find(By::ClassName(CLS_EXPAND_TOGGLE)).await.map_err(|e| Error::not_found("subject expand toggle", e))?;
	let title = toggle.text().await.map_err(|e| Error::driver("read subject title", e))?;

	let mut lectures = Vec::new();
	if with_lectures {
		// The lecture list only exists in the DOM once the row is expanded.
		toggle.click().await.map_err(|e| Error::driver(format!("expand subject {title:?}"), e))?;

		for element in lecture_rows(row).await? {
			lectures.push(parse_lecture(&element, watcher).await?);
		}
	}

	Ok(Subject { title, progress, lectures })
}

async fn lecture_rows(row: &WebElement) -> Result<Vec<WebElement>> {
	let body = row.find(By::ClassName(CLS_SUBJECT_BODY)).await.map_err(|e| Error::not_found("subject body", e))?;
	let list = body.find(By::ClassName(CLS_LECTURE_LIST)).await.map_err(|e| Error::not_found("lecture list", e))?;
	list.find_all(By::ClassName(CLS_LECTURE_ROW)).await.map_err(|e| Error::driver("list lecture rows", e))
}

async fn extract_progress(info: &WebElement) -> Result<f32> {
	let per = info.find(By::ClassName(CLS_SUBJECT_PROGRESS)).await.map_err(|e| Error::not_found("subject progress block", e))?;
	let value = per.find(By::ClassName(CLS_PROGRESS_VALUE)).await.map_err(|e| Error::not_found("subject progress value", e))?;
	let text = value.text().await.map_err(|e| Error::driver("read subject progress", e))?;
	parse_percent(&text)
}

/// Builds one [`Lecture`] from its row and, for a ready lecture with work left,
/// runs the watch handler before returning.
async fn parse_lecture<W: WatchHandler>(element: &WebElement, watcher: Option<&W>) -> Result<Lecture> {
	let title_element = element.find(By::ClassName(CLS_LECTURE_TITLE)).await.map_err(|e| Error::not_found("lecture title", e))?;
	let title = title_element.text().await.map_err(|e| Error::driver("read lecture title", e))?;

	// A waiting marker means the platform has not unlocked this lecture yet;
	// the status triplet is not rendered at all in that case.
	let waiting = element.find_all(By::ClassName(CLS_WAITING_MARKER)).await.map_err(|e| Error::driver("check lecture waiting marker", e))?;
	if !waiting.is_empty() {
		debug!(title = %title, "lecture not unlocked yet");
		return Ok(Lecture::pending(title));
	}

	let status_element = element.find(By::ClassName(CLS_LECTURE_STATUS)).await.map_err(|e| Error::not_found("lecture status block", e))?;
	let status = extract_status(&status_element).await?;

	let lecture = Lecture {
		title,
		is_ready: true,
		has_played: status.has_played,
		has_exam: status.has_exam,
		has_exam_completed: status.has_exam_completed,
		playback_position: status.position,
		playback_duration: status.duration,
	};

	if let Some(watcher) = watcher {
		if !lecture.is_done() {
			watcher.on_lecture_ready(&lecture, &title_element).await?;
		}
	}

	Ok(lecture)
}

struct LectureStatus {
	has_played: bool,
	has_exam: bool,
	has_exam_completed: bool,
	position: Duration,
	duration: Duration,
}

/// Reads the playback / exam / duration triplet of a ready lecture row.
async fn extract_status(status_element: &WebElement) -> Result<LectureStatus> {
	let items = status_element.find_all(By::Tag("li")).await.map_err(|e| Error::driver("list lecture status entries", e))?;
	if items.len() != 3 {
		return Err(Error::structure(format!("lecture status row has {} entries, expected playback/exam/duration", items.len())));
	}
	let (playback, exam, times) = (&items[0], &items[1], &items[2]);

	let check = playback.find(By::Tag("a")).await.map_err(|e| Error::not_found("playback check icon", e))?;
	let has_played = is_checked(&class_of(&check).await?);

	// No anchor in the exam slot simply means this lecture has no exam.
	let (has_exam, has_exam_completed) = match exam.find_all(By::Tag("a")).await.map_err(|e| Error::driver("check exam slot", e))?.first() {
		Some(exam_check) => (true, is_checked(&class_of(exam_check).await?)),
		None => (false, false),
	};

	let spans = times.find_all(By::Tag("span")).await.map_err(|e| Error::driver("list playback time spans", e))?;
	let [position_span, duration_span, ..] = spans.as_slice() else {
		return Err(Error::structure(format!("playback time cell has {} spans, expected position and duration", spans.len())));
	};
	let position = parse_minutes(&position_span.text().await.map_err(|e| Error::driver("read playback position", e))?)?;
	let duration = parse_minutes(&duration_span.text().await.map_err(|e| Error::driver("read playback duration", e))?)?;

	Ok(LectureStatus {
		has_played,
		has_exam,
		has_exam_completed,
		position,
		duration,
	})
}

async fn class_of(element: &WebElement) -> Result<String> {
	let class = element.attr("class").await.map_err(|e| Error::driver("read class attribute", e))?;
	Ok(class.unwrap_or_default())
}
