//! Submission forms and their field-level validation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{GroupId, ImageChange, PostChanges};

pub const REQUIRED: &str = "This field is required.";

const GROUP_TITLE_MAX_LEN: usize = 200;
const SLUG_MAX_LEN: usize = 50;
const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

/// Per-field validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

fn require(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
    }
}

/// Tells an absent field (`None`) apart from an explicit `null` (`Some(None)`).
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Post creation/edit form. `group` is optional; `image` is an opaque
/// reference to an already stored attachment. An absent `image` keeps the
/// stored one; `null` or a blank value clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostForm {
    pub text: String,
    #[serde(default)]
    pub group: Option<GroupId>,
    #[serde(default, deserialize_with = "present")]
    pub image: Option<Option<String>>,
}

impl PostForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "text", &self.text);
        errors.into_result()
    }

    /// The editable fields, with a blank image reference treated as a clear.
    pub fn into_changes(self) -> PostChanges {
        let image = match self.image {
            None => ImageChange::Keep,
            Some(Some(image)) if !image.trim().is_empty() => ImageChange::Set(image),
            Some(_) => ImageChange::Clear,
        };
        PostChanges {
            text: self.text,
            group_id: self.group,
            image,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "text", &self.text);
        errors.into_result()
    }
}

/// Administrative group form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupForm {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl GroupForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "title", &self.title);
        require(&mut errors, "slug", &self.slug);
        require(&mut errors, "description", &self.description);

        if self.title.chars().count() > GROUP_TITLE_MAX_LEN {
            errors.add(
                "title",
                format!("Ensure this value has at most {GROUP_TITLE_MAX_LEN} characters."),
            );
        }
        if !self.slug.is_empty() {
            if self.slug.chars().count() > SLUG_MAX_LEN {
                errors.add(
                    "slug",
                    format!("Ensure this value has at most {SLUG_MAX_LEN} characters."),
                );
            }
            if !is_slug(&self.slug) {
                errors.add(
                    "slug",
                    "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
                );
            }
        }
        errors.into_result()
    }
}

/// Account creation form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "username", &self.username);
        require(&mut errors, "password", &self.password);

        if self.username.chars().count() > USERNAME_MAX_LEN {
            errors.add(
                "username",
                format!("Ensure this value has at most {USERNAME_MAX_LEN} characters."),
            );
        }
        if !self.username.is_empty() && !is_username(&self.username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        if !self.password.is_empty() && self.password.chars().count() < PASSWORD_MIN_LEN {
            errors.add(
                "password",
                format!("This password is too short. It must contain at least {PASSWORD_MIN_LEN} characters."),
            );
        }
        errors.into_result()
    }
}

pub fn is_username(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

pub fn is_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_form_requires_text() {
        let form = PostForm {
            text: "   ".to_string(),
            group: Some(1),
            image: None,
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("text"), [REQUIRED.to_string()]);
        assert!(errors.get("group").is_empty());
    }

    #[test]
    fn test_post_form_blank_image_clears() {
        let form = PostForm {
            text: "Hello".to_string(),
            group: None,
            image: Some(Some(" ".to_string())),
        };
        assert!(form.validate().is_ok());
        assert_eq!(form.into_changes().image, ImageChange::Clear);
    }

    #[test]
    fn test_post_form_image_field_states() {
        let absent: PostForm = serde_json::from_str(r#"{"text": "a"}"#).unwrap();
        assert_eq!(absent.into_changes().image, ImageChange::Keep);

        let null: PostForm = serde_json::from_str(r#"{"text": "a", "image": null}"#).unwrap();
        assert_eq!(null.into_changes().image, ImageChange::Clear);

        let set: PostForm =
            serde_json::from_str(r#"{"text": "a", "image": "posts/cat.png"}"#).unwrap();
        assert_eq!(
            set.into_changes().image,
            ImageChange::Set("posts/cat.png".to_string())
        );
    }

    #[test]
    fn test_comment_form_requires_text() {
        assert!(CommentForm { text: String::new() }.validate().is_err());
        assert!(CommentForm { text: "Nice".to_string() }.validate().is_ok());
    }

    #[test]
    fn test_group_form_rejects_bad_slug() {
        let form = GroupForm {
            title: "News".to_string(),
            slug: "news and more".to_string(),
            description: "Daily news".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("slug").len(), 1);
        assert!(errors.get("title").is_empty());
    }

    #[test]
    fn test_signup_form_rules() {
        let ok = SignupForm {
            username: "leo.tolstoy+1@x".to_string(),
            password: "war-and-peace".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = SignupForm {
            username: "leo tolstoy".to_string(),
            password: "short".to_string(),
        };
        let errors = bad.validate().unwrap_err();
        assert_eq!(errors.get("username").len(), 1);
        assert_eq!(errors.get("password").len(), 1);

        let empty = SignupForm::default().validate().unwrap_err();
        assert_eq!(empty.get("username"), [REQUIRED.to_string()]);
    }

    #[test]
    fn test_field_errors_display() {
        let mut errors = FieldErrors::new();
        errors.add("text", REQUIRED);
        errors.add("group", "Select a valid choice.");
        assert_eq!(
            errors.to_string(),
            "group: Select a valid choice.; text: This field is required."
        );
    }
}
