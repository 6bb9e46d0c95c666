//! Renders the operator-facing "what is still outstanding" report.

use crate::Subject;

const REPORT_HEADER: &str = "미완료 과목 목록";

/// One line per incomplete subject with its portal progress, then one indented
/// line per lecture that still needs something (or is not unlocked yet).
/// Completed subjects are omitted entirely.
pub fn not_completed_report(subjects: &[Subject]) -> String {
	let mut out = String::from(REPORT_HEADER);
	out.push('\n');

	for subject in subjects.iter().filter(|s| !s.is_completed()) {
		out.push_str(&format!("- {}: {:.2}%\n", subject.title, subject.progress));

		for lecture in &subject.lectures {
			if lecture.is_ready && lecture.is_done() {
				continue;
			}
			out.push_str(&format!("-- {lecture}\n"));
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;
	use crate::Lecture;

	fn lecture(title: &str, has_played: bool, has_exam: bool, has_exam_completed: bool) -> Lecture {
		Lecture {
			title: title.to_owned(),
			is_ready: true,
			has_played,
			has_exam,
			has_exam_completed,
			playback_position: Duration::ZERO,
			playback_duration: Duration::from_secs(25 * 60),
		}
	}

	#[test]
	fn test_report_lists_outstanding_lectures_only() {
		let subjects = vec![
			Subject {
				title: "현대사회와 심리학".to_owned(),
				progress: 66.67,
				lectures: vec![lecture("1주차 강의", true, false, false), lecture("2주차 강의", false, false, false), lecture("3주차 강의", true, true, false)],
			},
			Subject {
				title: "완료된 과목".to_owned(),
				progress: 100.0,
				lectures: vec![lecture("1주차 강의", true, false, false)],
			},
		];

		let report = not_completed_report(&subjects);
		assert_eq!(
			report,
			"미완료 과목 목록\n\
			 - 현대사회와 심리학: 66.67%\n\
			 -- 2주차 강의 playback: [-]\n\
			 -- 3주차 강의 playback: [v] quiz: [-]\n"
		);
	}

	#[test]
	fn test_report_shows_locked_lectures_as_pending() {
		let subjects = vec![Subject {
			title: "교양 선택".to_owned(),
			progress: 0.0,
			lectures: vec![Lecture::pending("4주차 강의")],
		}];

		assert_eq!(not_completed_report(&subjects), "미완료 과목 목록\n- 교양 선택: 0.00%\n-- 4주차 강의 준비중\n");
	}

	#[test]
	fn test_everything_done_leaves_just_the_header() {
		let subjects = vec![Subject {
			title: "다 끝난 과목".to_owned(),
			progress: 100.0,
			lectures: vec![lecture("1주차 강의", true, true, true)],
		}];

		assert_eq!(not_completed_report(&subjects), "미완료 과목 목록\n");
	}

	#[test]
	fn test_unexpanded_subject_is_treated_as_complete() {
		// No lectures extracted means nothing is known to be outstanding.
		let subjects = vec![Subject {
			title: "접지 않은 과목".to_owned(),
			progress: 10.0,
			lectures: Vec::new(),
		}];

		assert_eq!(not_completed_report(&subjects), "미완료 과목 목록\n");
	}
}
