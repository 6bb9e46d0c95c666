//! Answers a lecture's exam by random choice until the platform accepts.

use std::time::Instant;

use rand::Rng;
use thirtyfour::{By, WebElement};
use tracing::{debug, info};

use crate::driver::Session;
use crate::error::{Error, Result};

const CLS_EXAM_PANEL: &str = "exam";
const CLS_QUESTION_TABS: &str = "exam-number";
const CLS_ANSWER_BLOCK: &str = "exam-answer";
const CLS_ANSWER_ITEM: &str = "lists";
const CLS_CONFIRM_BUTTON: &str = "confirmAnswer";

/// Works through every question of the exam visible in the current window.
///
/// Questions pair up with their answer forms by page order; a count mismatch
/// means the page changed shape and nothing is safe to click.
pub async fn solve(session: &Session) -> Result<()> {
	let exam = session.wait_find_css(&format!(".{CLS_EXAM_PANEL}"), "exam panel").await?;

	let tabs = exam.find(By::ClassName(CLS_QUESTION_TABS)).await.map_err(|e| Error::not_found("exam question tabs", e))?;
	let questions = tabs.find_all(By::Tag("li")).await.map_err(|e| Error::driver("list exam questions", e))?;
	let forms = exam.find_all(By::Tag("form")).await.map_err(|e| Error::driver("list exam answer forms", e))?;

	info!(questions = questions.len(), "solving quiz");
	for (idx, (question, form)) in pair_questions(questions, forms)?.into_iter().enumerate() {
		question.click().await.map_err(|e| Error::driver(format!("select exam question {}", idx + 1), e))?;

		let answers = candidate_answers(&form).await?;
		if is_free_response(&answers) {
			debug!(question = idx + 1, "free-response question, leaving unanswered");
			continue;
		}

		// Accepting an answer takes a pick plus a confirm, and the confirm
		// button can show up late; running the full cycle twice covers that. A
		// second pass over an already accepted answer is a no-op.
		for _ in 0..2 {
			let pick = &answers[rand::thread_rng().gen_range(0..answers.len())];
			pick.click().await.map_err(|e| Error::driver("click answer candidate", e))?;

			wait_for_confirm(session, &form).await;

			let confirm = form.find(By::ClassName(CLS_CONFIRM_BUTTON)).await.map_err(|e| Error::not_found("answer confirm button", e))?;
			if confirm.is_displayed().await.map_err(|e| Error::driver("check confirm button visibility", e))? {
				confirm.click().await.map_err(|e| Error::driver("confirm answer", e))?;
			}

			// Confirming pops a native alert; none appearing is also fine.
			let _ = session.driver.accept_alert().await;
		}
	}

	Ok(())
}

/// Pairs question tabs with their answer forms positionally.
fn pair_questions<Q, F>(questions: Vec<Q>, forms: Vec<F>) -> Result<Vec<(Q, F)>> {
	if questions.len() != forms.len() {
		return Err(Error::structure(format!("{} exam questions but {} answer forms", questions.len(), forms.len())));
	}
	Ok(questions.into_iter().zip(forms).collect())
}

/// The clickable answer candidates of one question's form. Free-response
/// questions render none.
async fn candidate_answers(form: &WebElement) -> Result<Vec<WebElement>> {
	let block = form.find(By::ClassName(CLS_ANSWER_BLOCK)).await.map_err(|e| Error::not_found("answer block", e))?;
	block.find_all(By::ClassName(CLS_ANSWER_ITEM)).await.map_err(|e| Error::driver("list answer candidates", e))
}

fn is_free_response<T>(answers: &[T]) -> bool {
	answers.is_empty()
}

/// Best-effort wait for the confirm control to materialize inside the form;
/// the hard failure, if any, happens at the required lookup that follows.
async fn wait_for_confirm(session: &Session, form: &WebElement) {
	let started = Instant::now();
	loop {
		if let Ok(found) = form.find_all(By::ClassName(CLS_CONFIRM_BUTTON)).await {
			if !found.is_empty() {
				return;
			}
		}
		if started.elapsed() > session.waits.ambient_timeout {
			return;
		}
		tokio::time::sleep(session.waits.ambient_interval).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_pairing_preserves_page_order() {
		let paired = pair_questions(vec![1, 2, 3], vec!["a", "b", "c"]).unwrap();
		assert_eq!(paired, vec![(1, "a"), (2, "b"), (3, "c")]);
	}

	#[test]
	fn test_count_mismatch_is_a_structure_error() {
		let err = pair_questions(vec![1, 2, 3], vec!["a"]).unwrap_err();
		assert!(matches!(err, Error::Structure(_)));
	}

	#[test]
	fn test_free_response_has_no_candidates() {
		assert!(is_free_response::<i32>(&[]));
		assert!(!is_free_response(&["오답", "정답"]));
	}
}
