use std::fmt;

/// A transient user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Message(String),
    Error(String),
}

impl Notice {
    pub fn message(text: impl Into<String>) -> Self {
        Notice::Message(text.into())
    }

    /// Wraps a failure; the full `anyhow` context chain becomes the text.
    pub fn error(err: &anyhow::Error) -> Self {
        Notice::Error(format!("{err:#}"))
    }

    pub fn text(&self) -> &str {
        match self {
            Notice::Message(s) | Notice::Error(s) => s,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Prints notices to stderr and records them in the trace log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        match &notice {
            Notice::Message(text) => {
                tracing::info!(notice = %text, "notify");
                eprintln!("{text}");
            }
            Notice::Error(text) => {
                tracing::warn!(notice = %text, "notify error");
                eprintln!("error: {text}");
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;

    #[test]
    fn error_notice_keeps_context_chain() {
        let err = Err::<(), _>(anyhow::anyhow!("boom"))
            .context("delete post")
            .unwrap_err();
        assert_eq!(Notice::error(&err), Notice::Error("delete post: boom".into()));
    }
}
