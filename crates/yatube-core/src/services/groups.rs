use std::sync::Arc;

use crate::domain::{Group, NewGroup, Principal};
use crate::error::DomainError;
use crate::ports::GroupRepository;
use crate::validation::{FieldErrors, GroupForm};

use super::authorization::authorize_admin;
use super::Redirect;

/// Administrative group management. Staff only.
pub struct GroupService {
    groups: Arc<dyn GroupRepository>,
}

impl GroupService {
    pub fn new(groups: Arc<dyn GroupRepository>) -> Self {
        Self { groups }
    }

    pub async fn create_group(
        &self,
        principal: &Principal,
        form: GroupForm,
    ) -> Result<Group, DomainError> {
        authorize_admin(principal)?;
        form.validate().map_err(DomainError::Validation)?;

        if self.groups.find_by_slug(&form.slug).await?.is_some() {
            return Err(DomainError::Validation(FieldErrors::single(
                "slug",
                "Group with this slug already exists.",
            )));
        }

        let group = self
            .groups
            .create_group(NewGroup {
                title: form.title,
                slug: form.slug,
                description: form.description,
            })
            .await?;

        tracing::info!(group_id = group.id, slug = %group.slug, "Group created");
        Ok(group)
    }

    /// Delete a group; its posts stay, without a group.
    pub async fn delete_group(&self, principal: &Principal, slug: &str) -> Result<Redirect, DomainError> {
        authorize_admin(principal)?;
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("Group", slug))?;

        self.groups.delete_group(group.id).await?;
        tracing::info!(group_id = group.id, slug = %group.slug, "Group deleted");

        Ok(Redirect::Groups)
    }
}
