use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use url::Url;

use crate::menu::MenuAction;

pub const DEFAULT_USER_AGENT: &str = "post-board/0.1";

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a discussion page as the snapshot's current user sees it.
    Render(RenderArgs),
    /// Render the login page.
    LoginPage(LoginPageArgs),
    /// Ask the API server to email a login link.
    Login(LoginArgs),
    /// Run one post menu action as the snapshot's current user.
    Action(ActionArgs),
}

#[derive(Debug, ClapArgs)]
pub struct RenderArgs {
    /// Board snapshot JSON: `{ "currentUser": ..., "discussion": ... }`.
    #[arg(long)]
    pub input: PathBuf,

    /// Output HTML file. Defaults to `discussion-<id>.html`.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Use the narrow layout (no gutter beside the avatar).
    #[arg(long)]
    pub mobile: bool,

    /// Reference time for "Last edited" labels (RFC 3339). Defaults to the current time.
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, ClapArgs)]
pub struct LoginPageArgs {
    /// Origin of the API server, e.g. `https://api.example.com`.
    #[arg(long, env = "POST_BOARD_API_URL")]
    pub api_url: Url,

    /// Team invitation token forwarded to both login paths.
    #[arg(long)]
    pub invitation_token: Option<String>,

    /// Output HTML file. Defaults to `login.html`.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, ClapArgs)]
pub struct LoginArgs {
    /// Origin of the API server, e.g. `https://api.example.com`.
    #[arg(long, env = "POST_BOARD_API_URL")]
    pub api_url: Url,

    #[arg(long, default_value = "")]
    pub email: String,

    /// Team invitation token forwarded with the request.
    #[arg(long)]
    pub invitation_token: Option<String>,

    /// Send the request even when the email is empty (after warning about it).
    #[arg(long)]
    pub permissive_empty_email: bool,

    /// HTTP User-Agent.
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

#[derive(Debug, ClapArgs)]
pub struct ActionArgs {
    /// Board snapshot JSON: `{ "currentUser": ..., "discussion": ... }`.
    #[arg(long)]
    pub input: PathBuf,

    /// Id of the post to act on.
    #[arg(long)]
    pub post: String,

    #[arg(long, value_enum)]
    pub action: MenuAction,

    /// Origin of the API server. Required for `delete`.
    #[arg(long, env = "POST_BOARD_API_URL")]
    pub api_url: Option<Url>,

    /// Answer the confirmation prompt with yes.
    #[arg(long)]
    pub yes: bool,

    /// For `edit`: where to write the markdown buffer. For `delete`: where to write the
    /// updated snapshot (defaults to overwriting `--input`).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// HTTP User-Agent.
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}
