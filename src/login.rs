use serde::Serialize;
use url::Url;

use crate::api::endpoint;
use crate::notify::{Notice, Notifier};

pub const EMAIL_REQUIRED: &str = "Email is required";
pub const LOGIN_LINK_SENT: &str = "SaaS boilerplate emailed you a login link.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginLinkRequest {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation_token: Option<String>,
}

#[allow(async_fn_in_trait)]
pub trait LoginApi {
    async fn email_login_link(&self, request: &LoginLinkRequest) -> anyhow::Result<()>;
}

/// What to do when the form is submitted with an empty email.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyEmailPolicy {
    /// Notify and stop.
    #[default]
    Block,
    /// Notify, then call the API anyway.
    Permissive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Rejected,
    Sent,
    Failed,
}

#[derive(Debug)]
pub struct LoginForm {
    email: String,
    empty_email: EmptyEmailPolicy,
}

impl LoginForm {
    pub fn new(empty_email: EmptyEmailPolicy) -> Self {
        Self {
            email: String::new(),
            empty_email,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
    }

    /// One attempt at requesting a login link.
    ///
    /// The form is idle before and after every call; the request is in flight only
    /// while the returned future is pending, and the `&mut self` borrow keeps a second
    /// submission from overlapping it. The field is cleared only when the link was sent.
    pub async fn submit<A, N>(
        &mut self,
        api: &A,
        notifier: &N,
        invitation_token: Option<&str>,
    ) -> SubmitOutcome
    where
        A: LoginApi + ?Sized,
        N: Notifier + ?Sized,
    {
        if self.email.is_empty() {
            notifier.notify(Notice::message(EMAIL_REQUIRED));
            if self.empty_email == EmptyEmailPolicy::Block {
                return SubmitOutcome::Rejected;
            }
        }

        let request = LoginLinkRequest {
            email: self.email.clone(),
            invitation_token: invitation_token.map(str::to_string),
        };

        match api.email_login_link(&request).await {
            Ok(()) => {
                tracing::info!(email = %request.email, "login link requested");
                self.email.clear();
                notifier.notify(Notice::message(LOGIN_LINK_SENT));
                SubmitOutcome::Sent
            }
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "login link request failed");
                notifier.notify(Notice::error(&err));
                SubmitOutcome::Failed
            }
        }
    }
}

/// Google sign-in entry point on the API server.
pub fn oauth_login_url(api_base: &Url, invitation_token: Option<&str>) -> anyhow::Result<Url> {
    let mut url = endpoint(api_base, "auth/google")?;
    if let Some(token) = invitation_token.filter(|t| !t.is_empty()) {
        url.query_pairs_mut().append_pair("invitationToken", token);
    }
    Ok(url)
}
