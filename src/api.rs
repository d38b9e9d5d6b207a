use anyhow::{Context as _, anyhow};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::confirm::DiscussionStore;
use crate::login::{LoginApi, LoginLinkRequest};

pub const EMAIL_LOGIN_LINK_PATH: &str = "api/v1/public/email-login-link";
pub const DELETE_POST_PATH: &str = "api/v1/team-member/posts/delete";

/// Resolves `path` below `base`, keeping any path prefix `base` already has.
pub fn endpoint(base: &Url, path: &str) -> anyhow::Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim_start_matches('/'))
        .with_context(|| format!("resolve {} against {}", path, base))
}

/// JSON client for the board's API server. One attempt per call, no retries.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: Url, user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build reqwest client")?;
        Ok(Self { client, base_url })
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> anyhow::Result<Value> {
        let url = endpoint(&self.base_url, path)?;
        tracing::debug!(%url, "POST");

        let resp = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;

        let status = resp.status();
        let text = resp.text().await.context("read response body")?;
        let data: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(_) if !status.is_success() => Value::Null,
                Err(err) => return Err(err).with_context(|| format!("parse response from {}", url)),
            }
        };

        // The server reports failures as `{ "error": "..." }`, sometimes with a 2xx status.
        if let Some(message) = data.get("error").and_then(Value::as_str) {
            return Err(anyhow!("{}", message));
        }
        if !status.is_success() {
            return Err(anyhow!("POST {} failed with status {}", url, status));
        }
        Ok(data)
    }
}

impl LoginApi for ApiClient {
    async fn email_login_link(&self, request: &LoginLinkRequest) -> anyhow::Result<()> {
        self.post_json(EMAIL_LOGIN_LINK_PATH, request).await?;
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeletePostBody<'a> {
    id: &'a str,
    discussion_id: &'a str,
}

impl DiscussionStore for ApiClient {
    async fn delete_post(&self, discussion_id: &str, post_id: &str) -> anyhow::Result<()> {
        let body = DeletePostBody {
            id: post_id,
            discussion_id,
        };
        self.post_json(DELETE_POST_PATH, &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_prefix() {
        let root = Url::parse("https://api.example.com").unwrap();
        assert_eq!(
            endpoint(&root, "/api/v1/public/email-login-link")
                .unwrap()
                .as_str(),
            "https://api.example.com/api/v1/public/email-login-link"
        );

        let nested = Url::parse("https://example.com/board").unwrap();
        assert_eq!(
            endpoint(&nested, DELETE_POST_PATH).unwrap().as_str(),
            "https://example.com/board/api/v1/team-member/posts/delete"
        );
    }

    #[test]
    fn delete_body_uses_wire_names() {
        let body = serde_json::to_value(DeletePostBody {
            id: "p2",
            discussion_id: "d1",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "id": "p2", "discussionId": "d1" }));
    }
}
