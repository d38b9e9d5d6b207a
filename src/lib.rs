mod api;
mod board;
mod builtin;
mod cli;
mod confirm;
mod html;
mod login;
mod menu;
mod notify;

use std::path::{Path, PathBuf};

use anyhow::Context as _;

pub use api::{ApiClient, DELETE_POST_PATH, EMAIL_LOGIN_LINK_PATH, endpoint};
pub use board::{BoardSnapshot, Discussion, Post, User};
pub use cli::{ActionArgs, Args as CliArgs, Command, LoginArgs, LoginPageArgs, RenderArgs};
pub use confirm::{
    ConfirmDialog, ConfirmPrompt, DELETE_POST_SUCCESS, DELETE_POST_TITLE, DiscussionStore,
    FIRST_POST_UNDELETABLE, FixedAnswer, MutationMessages, MutationOutcome, StdinConfirm,
    confirmed_mutation, delete_post,
};
pub use html::{
    build_discussion_html, build_login_html, format_created_date, relative_from_now,
    render_posts, sanitize_post_html,
};
pub use login::{
    EMAIL_REQUIRED, EmptyEmailPolicy, LOGIN_LINK_SENT, LoginApi, LoginForm, LoginLinkRequest,
    SubmitOutcome, oauth_login_url,
};
pub use menu::{MenuAction, MenuItem, Ownership, Position, PostMenu, actions_for, build_menu};
pub use notify::{Notice, Notifier, TerminalNotifier};

pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    match args.command {
        Command::Render(args) => render(&args),
        Command::LoginPage(args) => login_page(&args),
        Command::Login(args) => login(&args).await,
        Command::Action(args) => action(&args).await,
    }
}

fn render(args: &RenderArgs) -> anyhow::Result<()> {
    let snapshot = read_snapshot(&args.input)?;
    let now = args.now.unwrap_or_else(chrono::Utc::now);

    let posts = html::render_posts(&snapshot, now)?;
    let page = html::build_discussion_html(&snapshot, &posts, args.mobile);

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("discussion-{}.html", snapshot.discussion.id)));
    write_file(&out, page.as_bytes())?;
    tracing::info!(
        discussion_id = %snapshot.discussion.id,
        posts = posts.len(),
        out = %out.display(),
        "rendered discussion"
    );
    Ok(())
}

fn login_page(args: &LoginPageArgs) -> anyhow::Result<()> {
    let page = html::build_login_html(&args.api_url, args.invitation_token.as_deref())?;
    let out = args.out.clone().unwrap_or_else(|| PathBuf::from("login.html"));
    write_file(&out, page.as_bytes())?;
    tracing::info!(out = %out.display(), "rendered login page");
    Ok(())
}

async fn login(args: &LoginArgs) -> anyhow::Result<()> {
    let client = ApiClient::new(args.api_url.clone(), &args.user_agent)?;
    let policy = if args.permissive_empty_email {
        EmptyEmailPolicy::Permissive
    } else {
        EmptyEmailPolicy::Block
    };

    let mut form = LoginForm::new(policy);
    form.set_email(args.email.clone());
    let outcome = form
        .submit(&client, &TerminalNotifier, args.invitation_token.as_deref())
        .await;
    if outcome != SubmitOutcome::Sent {
        anyhow::bail!("login link was not sent");
    }
    Ok(())
}

async fn action(args: &ActionArgs) -> anyhow::Result<()> {
    let mut snapshot = read_snapshot(&args.input)?;
    let discussion = &snapshot.discussion;
    let post = discussion
        .post(&args.post)
        .with_context(|| format!("post {} not found in discussion {}", args.post, discussion.id))?;

    let Some(menu) = menu::build_menu(discussion, post, snapshot.current_user.as_ref()) else {
        anyhow::bail!("no actions available on post {}: not signed in or post has no author", post.id);
    };
    if !menu.permits(args.action) {
        anyhow::bail!("{} is not permitted on post {}", args.action.label(), post.id);
    }

    match args.action {
        MenuAction::ShowMarkdown => {
            println!("{}", post.content);
        }
        MenuAction::Edit => match &args.out {
            Some(out) => {
                write_file(out, post.content.as_bytes())?;
                tracing::info!(post_id = %post.id, out = %out.display(), "wrote edit buffer");
            }
            None => println!("{}", post.content),
        },
        MenuAction::Delete => {
            let api_url = args
                .api_url
                .clone()
                .context("--api-url (or POST_BOARD_API_URL) is required to delete a post")?;
            let client = ApiClient::new(api_url, &args.user_agent)?;
            let notifier = TerminalNotifier;
            let discussion = &mut snapshot.discussion;

            let outcome = if args.yes {
                confirm::delete_post(&client, &FixedAnswer(true), &notifier, discussion, &args.post)
                    .await
            } else {
                confirm::delete_post(&client, &StdinConfirm, &notifier, discussion, &args.post).await
            };

            match outcome {
                MutationOutcome::Completed => {
                    let out = args.out.as_deref().unwrap_or(&args.input);
                    let json = serde_json::to_vec_pretty(&snapshot).context("serialize snapshot")?;
                    write_file(out, &json)?;
                }
                MutationOutcome::Declined => {}
                MutationOutcome::Failed | MutationOutcome::NotPermitted => {
                    anyhow::bail!("post {} was not deleted", args.post)
                }
            }
        }
    }
    Ok(())
}

fn read_snapshot(path: &Path) -> anyhow::Result<BoardSnapshot> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

fn write_file(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }
    std::fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}
