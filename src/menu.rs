use clap::ValueEnum;

use crate::board::{Discussion, Post, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MenuAction {
    ShowMarkdown,
    Edit,
    Delete,
}

impl MenuAction {
    pub fn label(self) -> &'static str {
        match self {
            MenuAction::ShowMarkdown => "Show Markdown",
            MenuAction::Edit => "Edit",
            MenuAction::Delete => "Delete",
        }
    }

    /// Stable identifier used in markup and on the command line.
    pub fn slug(self) -> &'static str {
        match self {
            MenuAction::ShowMarkdown => "show-markdown",
            MenuAction::Edit => "edit",
            MenuAction::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Own,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    First,
    Later,
}

/// Actions a viewer gets for a post, in menu order.
///
/// The first post of a discussion can be edited by its owner but never deleted.
pub fn actions_for(ownership: Ownership, position: Position) -> &'static [MenuAction] {
    match (ownership, position) {
        (Ownership::Other, _) => &[MenuAction::ShowMarkdown],
        (Ownership::Own, Position::First) => &[MenuAction::Edit],
        (Ownership::Own, Position::Later) => &[MenuAction::Edit, MenuAction::Delete],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub text: &'static str,
    pub data_id: String,
    pub action: MenuAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMenu {
    pub id: String,
    pub data_id: String,
    pub items: Vec<MenuItem>,
}

impl PostMenu {
    pub fn permits(&self, action: MenuAction) -> bool {
        self.items.iter().any(|i| i.action == action)
    }

    pub fn actions(&self) -> impl Iterator<Item = MenuAction> + '_ {
        self.items.iter().map(|i| i.action)
    }
}

/// Builds the action menu `current_user` sees on `post`.
///
/// Returns `None` when nobody is signed in or the post has no author attached;
/// the renderer then shows no menu at all.
pub fn build_menu(
    discussion: &Discussion,
    post: &Post,
    current_user: Option<&User>,
) -> Option<PostMenu> {
    let viewer = current_user?;
    post.user.as_ref()?;

    let ownership = if post.created_user_id == viewer.id {
        Ownership::Own
    } else {
        Ownership::Other
    };
    let position = if discussion.is_first_post(&post.id) {
        Position::First
    } else {
        Position::Later
    };

    let items = actions_for(ownership, position)
        .iter()
        .map(|&action| MenuItem {
            text: action.label(),
            data_id: post.id.clone(),
            action,
        })
        .collect();

    Some(PostMenu {
        id: format!("post-menu-{}", post.id),
        data_id: post.id.clone(),
        items,
    })
}
