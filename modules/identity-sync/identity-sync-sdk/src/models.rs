//! Resource graph model: resource types, resources, entitlements and grants.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::annotations::{Annotation, Annotations};

/// Schema-less profile attached to user and group traits.
pub type Profile = BTreeMap<String, serde_json::Value>;

/// Role tag on a resource type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TraitKind {
    User,
    Group,
    Secret,
}

/// Static descriptor of a resource kind.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ResourceType {
    pub id: &'static str,
    pub display_name: &'static str,
    pub traits: &'static [TraitKind],
    /// Entitlements and grants are never requested for this type.
    pub skip_entitlements_and_grants: bool,
}

impl ResourceType {
    #[must_use]
    pub fn has_trait(&self, kind: TraitKind) -> bool {
        self.traits.contains(&kind)
    }

    pub fn resource_id(&self, resource: impl Into<String>) -> ResourceId {
        ResourceId {
            resource_type: self.id.to_owned(),
            resource: resource.into(),
        }
    }
}

/// `(resource_type_id, opaque_id)` pair identifying a resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    pub resource_type: String,
    pub resource: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource: resource.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.resource)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserTrait {
    #[serde(default)]
    pub profile: Profile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GroupTrait {
    #[serde(default)]
    pub profile: Profile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretTrait {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Trait payload carried by a resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceTrait {
    User(UserTrait),
    Group(GroupTrait),
    Secret(SecretTrait),
}

/// A projected node of the identity graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_resource_id: Option<ResourceId>,
    #[serde(rename = "trait", default, skip_serializing_if = "Option::is_none")]
    pub resource_trait: Option<ResourceTrait>,
    #[serde(default, skip_serializing_if = "Annotations::is_empty")]
    pub annotations: Annotations,
}

impl Resource {
    /// A resource carrying nothing but its ID, as used for grant principals.
    #[must_use]
    pub fn reference(id: ResourceId) -> Self {
        Self {
            id,
            display_name: String::new(),
            parent_resource_id: None,
            resource_trait: None,
            annotations: Annotations::new(),
        }
    }

    pub fn user(
        display_name: impl Into<String>,
        resource_type: &ResourceType,
        id: impl Into<String>,
        profile: Profile,
    ) -> Self {
        Self::with_trait(
            display_name,
            resource_type,
            id,
            ResourceTrait::User(UserTrait { profile }),
        )
    }

    pub fn group(
        display_name: impl Into<String>,
        resource_type: &ResourceType,
        id: impl Into<String>,
        profile: Profile,
    ) -> Self {
        Self::with_trait(
            display_name,
            resource_type,
            id,
            ResourceTrait::Group(GroupTrait { profile }),
        )
    }

    pub fn secret(
        display_name: impl Into<String>,
        resource_type: &ResourceType,
        id: impl Into<String>,
        secret: SecretTrait,
    ) -> Self {
        Self::with_trait(
            display_name,
            resource_type,
            id,
            ResourceTrait::Secret(secret),
        )
    }

    fn with_trait(
        display_name: impl Into<String>,
        resource_type: &ResourceType,
        id: impl Into<String>,
        resource_trait: ResourceTrait,
    ) -> Self {
        Self {
            id: resource_type.resource_id(id),
            display_name: display_name.into(),
            parent_resource_id: None,
            resource_trait: Some(resource_trait),
            annotations: Annotations::new(),
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: &ResourceId) -> Self {
        self.parent_resource_id = Some(parent.clone());
        self
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    #[must_use]
    pub fn user_trait(&self) -> Option<&UserTrait> {
        match &self.resource_trait {
            Some(ResourceTrait::User(t)) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        match &self.resource_trait {
            Some(ResourceTrait::User(t)) => Some(&t.profile),
            Some(ResourceTrait::Group(t)) => Some(&t.profile),
            Some(ResourceTrait::Secret(_)) | None => None,
        }
    }
}

/// Canonical entitlement ID: `resource_type_id:opaque_id:entitlement_name`.
///
/// Hosts derive the same string for real resources, so expandable grant
/// annotations may name entitlements of resources that are not listed yet.
#[must_use]
pub fn entitlement_id(resource_id: &ResourceId, slug: &str) -> String {
    format!("{}:{}:{slug}", resource_id.resource_type, resource_id.resource)
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementPurpose {
    #[default]
    Assignment,
    Permission,
}

/// A named assignable permission on a resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entitlement {
    pub id: String,
    pub resource: Resource,
    pub slug: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub purpose: EntitlementPurpose,
    #[serde(default)]
    pub grantable_to: Vec<String>,
}

impl Entitlement {
    #[must_use]
    pub fn assignment(resource: &Resource, slug: &str) -> Self {
        Self {
            id: entitlement_id(&resource.id, slug),
            resource: resource.clone(),
            slug: slug.to_owned(),
            display_name: String::new(),
            description: String::new(),
            purpose: EntitlementPurpose::Assignment,
            grantable_to: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_grantable_to(mut self, resource_type: &ResourceType) -> Self {
        self.grantable_to.push(resource_type.id.to_owned());
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A materialized `(resource, entitlement, principal)` triple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Grant {
    pub id: String,
    pub entitlement: Entitlement,
    pub principal: Resource,
    #[serde(default, skip_serializing_if = "Annotations::is_empty")]
    pub annotations: Annotations,
}

impl Grant {
    #[must_use]
    pub fn new(resource: &Resource, slug: &str, principal: ResourceId) -> Self {
        let entitlement = Entitlement::assignment(resource, slug);
        Self {
            id: format!("{}:{principal}", entitlement.id),
            entitlement,
            principal: Resource::reference(principal),
            annotations: Annotations::new(),
        }
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Entitlement IDs this grant expands through, if it is expandable.
    #[must_use]
    pub fn expandable_entitlement_ids(&self) -> Option<&[String]> {
        self.annotations.expandable()
    }
}
