use std::future::Future;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _};

use crate::board::Discussion;
use crate::notify::{Notice, Notifier};

pub const DELETE_POST_TITLE: &str = "Are you sure?";
pub const DELETE_POST_SUCCESS: &str = "You successfully deleted Post.";
pub const FIRST_POST_UNDELETABLE: &str = "The first post of a discussion cannot be deleted.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub message: String,
}

#[allow(async_fn_in_trait)]
pub trait ConfirmDialog {
    /// Asks the user; `Ok(true)` is an affirmative answer.
    async fn confirm(&self, prompt: &ConfirmPrompt) -> anyhow::Result<bool>;
}

/// Remote owner of the discussion's post sequence.
#[allow(async_fn_in_trait)]
pub trait DiscussionStore {
    async fn delete_post(&self, discussion_id: &str, post_id: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct MutationMessages {
    pub success: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Refused before prompting; nothing was asked or mutated.
    NotPermitted,
    Declined,
    Completed,
    Failed,
}

/// Confirm, then mutate, then notify.
///
/// A declined (or unanswerable) prompt runs nothing and notifies nothing. A failed
/// mutation is reported as an error notice instead of escaping to the caller.
pub async fn confirmed_mutation<D, N, F, Fut>(
    dialog: &D,
    notifier: &N,
    prompt: &ConfirmPrompt,
    messages: &MutationMessages,
    mutation: F,
) -> MutationOutcome
where
    D: ConfirmDialog + ?Sized,
    N: Notifier + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let answer = match dialog.confirm(prompt).await {
        Ok(answer) => answer,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), title = %prompt.title, "confirmation not answered");
            false
        }
    };
    if !answer {
        tracing::debug!(title = %prompt.title, "confirmation declined");
        return MutationOutcome::Declined;
    }

    match mutation().await {
        Ok(()) => {
            notifier.notify(Notice::message(messages.success.clone()));
            MutationOutcome::Completed
        }
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "mutation failed");
            notifier.notify(Notice::error(&err));
            MutationOutcome::Failed
        }
    }
}

/// Deletes `post_id` after confirmation; the local sequence changes only on success.
///
/// The first post of a discussion (or a post not in it) is refused before the prompt.
pub async fn delete_post<S, D, N>(
    store: &S,
    dialog: &D,
    notifier: &N,
    discussion: &mut Discussion,
    post_id: &str,
) -> MutationOutcome
where
    S: DiscussionStore + ?Sized,
    D: ConfirmDialog + ?Sized,
    N: Notifier + ?Sized,
{
    match discussion.position(post_id) {
        Some(0) => {
            tracing::warn!(discussion_id = %discussion.id, post_id, "refusing to delete first post");
            notifier.notify(Notice::Error(FIRST_POST_UNDELETABLE.to_string()));
            return MutationOutcome::NotPermitted;
        }
        None => {
            tracing::warn!(discussion_id = %discussion.id, post_id, "post not in discussion");
            notifier.notify(Notice::Error(format!(
                "Post {post_id} is not part of this discussion."
            )));
            return MutationOutcome::NotPermitted;
        }
        Some(_) => {}
    }

    let prompt = ConfirmPrompt {
        title: DELETE_POST_TITLE.to_string(),
        message: String::new(),
    };
    let messages = MutationMessages {
        success: DELETE_POST_SUCCESS.to_string(),
    };
    let discussion_id = discussion.id.clone();

    let outcome = confirmed_mutation(dialog, notifier, &prompt, &messages, || {
        store.delete_post(&discussion_id, post_id)
    })
    .await;

    if outcome == MutationOutcome::Completed {
        discussion.remove_post(post_id);
        tracing::info!(discussion_id = %discussion.id, post_id, "post deleted");
    }
    outcome
}

/// Asks on the terminal; only `y` or `yes` counts as affirmative.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl ConfirmDialog for StdinConfirm {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> anyhow::Result<bool> {
        let mut stderr = tokio::io::stderr();
        let mut question = prompt.title.clone();
        if !prompt.message.is_empty() {
            question.push(' ');
            question.push_str(&prompt.message);
        }
        question.push_str(" [y/N] ");
        stderr
            .write_all(question.as_bytes())
            .await
            .context("write prompt")?;
        stderr.flush().await.context("flush prompt")?;

        let mut line = String::new();
        let read = tokio::io::BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .context("read answer")?;
        if read == 0 {
            anyhow::bail!("stdin closed before an answer was given");
        }
        Ok(is_affirmative(&line))
    }
}

/// Answers every prompt with the same value, for `--yes` and scripted use.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl ConfirmDialog for FixedAnswer {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> anyhow::Result<bool> {
        tracing::debug!(title = %prompt.title, answer = self.0, "auto-answered confirmation");
        Ok(self.0)
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::board::fixtures::{discussion, post};
    use crate::notify::testing::RecordingNotifier;

    #[derive(Default)]
    struct FakeStore {
        fail_with: Option<&'static str>,
        calls: RefCell<Vec<(String, String)>>,
    }

    impl DiscussionStore for FakeStore {
        async fn delete_post(&self, discussion_id: &str, post_id: &str) -> anyhow::Result<()> {
            self.calls
                .borrow_mut()
                .push((discussion_id.to_string(), post_id.to_string()));
            match self.fail_with {
                Some(msg) => Err(anyhow::anyhow!(msg)),
                None => Ok(()),
            }
        }
    }

    struct BrokenDialog;

    impl ConfirmDialog for BrokenDialog {
        async fn confirm(&self, _prompt: &ConfirmPrompt) -> anyhow::Result<bool> {
            anyhow::bail!("no terminal")
        }
    }

    #[tokio::test]
    async fn declined_delete_changes_nothing() {
        let store = FakeStore::default();
        let notifier = RecordingNotifier::default();
        let mut d = discussion(vec![post("p1", "a"), post("p2", "a")]);

        let outcome = delete_post(&store, &FixedAnswer(false), &notifier, &mut d, "p2").await;

        assert_eq!(outcome, MutationOutcome::Declined);
        assert_eq!(d.posts.len(), 2);
        assert!(store.calls.borrow().is_empty());
        assert!(notifier.take().is_empty());
    }

    #[tokio::test]
    async fn confirmed_delete_removes_post_and_notifies_once() {
        let store = FakeStore::default();
        let notifier = RecordingNotifier::default();
        let mut d = discussion(vec![post("p1", "a"), post("p2", "a")]);

        let outcome = delete_post(&store, &FixedAnswer(true), &notifier, &mut d, "p2").await;

        assert_eq!(outcome, MutationOutcome::Completed);
        assert!(d.post("p2").is_none());
        assert_eq!(
            *store.calls.borrow(),
            vec![("d1".to_string(), "p2".to_string())]
        );
        assert_eq!(notifier.take(), vec![Notice::message(DELETE_POST_SUCCESS)]);
    }

    #[tokio::test]
    async fn failed_delete_is_reported_and_post_kept() {
        let store = FakeStore {
            fail_with: Some("forbidden"),
            ..Default::default()
        };
        let notifier = RecordingNotifier::default();
        let mut d = discussion(vec![post("p1", "a"), post("p2", "a")]);

        let outcome = delete_post(&store, &FixedAnswer(true), &notifier, &mut d, "p2").await;

        assert_eq!(outcome, MutationOutcome::Failed);
        assert_eq!(d.position("p2"), Some(1));
        assert_eq!(notifier.take(), vec![Notice::Error("forbidden".into())]);
    }

    struct PanickingDialog;

    impl ConfirmDialog for PanickingDialog {
        async fn confirm(&self, prompt: &ConfirmPrompt) -> anyhow::Result<bool> {
            panic!("unexpected prompt: {}", prompt.title)
        }
    }

    #[tokio::test]
    async fn first_post_is_refused_before_prompting() {
        let store = FakeStore::default();
        let notifier = RecordingNotifier::default();
        let mut d = discussion(vec![post("p1", "a"), post("p2", "a")]);

        let outcome = delete_post(&store, &PanickingDialog, &notifier, &mut d, "p1").await;

        assert_eq!(outcome, MutationOutcome::NotPermitted);
        assert!(store.calls.borrow().is_empty());
        let ids: Vec<_> = d.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert_eq!(
            notifier.take(),
            vec![Notice::Error(FIRST_POST_UNDELETABLE.into())]
        );
    }

    #[tokio::test]
    async fn unknown_post_is_refused() {
        let store = FakeStore::default();
        let notifier = RecordingNotifier::default();
        let mut d = discussion(vec![post("p1", "a")]);

        let outcome = delete_post(&store, &PanickingDialog, &notifier, &mut d, "p9").await;

        assert_eq!(outcome, MutationOutcome::NotPermitted);
        assert!(store.calls.borrow().is_empty());
        assert!(!notifier.take().contains(&Notice::message(DELETE_POST_SUCCESS)));
    }

    #[tokio::test]
    async fn unanswerable_prompt_counts_as_declined() {
        let notifier = RecordingNotifier::default();
        let ran = Cell::new(false);
        let prompt = ConfirmPrompt {
            title: "Archive?".into(),
            message: String::new(),
        };
        let messages = MutationMessages {
            success: "Archived.".into(),
        };

        let outcome = confirmed_mutation(&BrokenDialog, &notifier, &prompt, &messages, || async {
            ran.set(true);
            Ok(())
        })
        .await;

        assert_eq!(outcome, MutationOutcome::Declined);
        assert!(!ran.get());
        assert!(notifier.take().is_empty());
    }

    #[test]
    fn affirmative_answers() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("yep"));
    }
}
