use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::group::GroupId;
use super::user::UserId;

pub type PostId = i64;

/// Number of characters of the text used as a post's display label.
pub const POST_LABEL_LEN: usize = 15;

/// Post entity - a text entry, optionally filed under a group and
/// illustrated with an image.
///
/// `author_id` and `created_at` are fixed at creation; only the fields in
/// [`PostChanges`] can be edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_id: UserId,
    pub group_id: Option<GroupId>,
    pub image: Option<String>,
}

impl Post {
    /// Short label: the first [`POST_LABEL_LEN`] characters of the text.
    pub fn label(&self) -> String {
        self.text.chars().take(POST_LABEL_LEN).collect()
    }

    /// Apply an edit, leaving author and creation time untouched.
    pub fn apply(&mut self, changes: PostChanges) {
        self.text = changes.text;
        self.group_id = changes.group_id;
        self.image = changes.image.resolve(self.image.take());
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A post that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub author_id: UserId,
    pub group_id: Option<GroupId>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What an edit does to the attached image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageChange {
    /// Leave whatever is stored.
    #[default]
    Keep,
    Clear,
    Set(String),
}

impl ImageChange {
    /// The image after the change, given the one stored now.
    pub fn resolve(self, current: Option<String>) -> Option<String> {
        match self {
            ImageChange::Keep => current,
            ImageChange::Clear => None,
            ImageChange::Set(image) => Some(image),
        }
    }
}

/// The editable part of a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<GroupId>,
    pub image: ImageChange,
}
