//! Side-channel annotations attached to resources, grants and mutation results.

use serde::{Deserialize, Serialize};

/// A single annotation understood by the sync host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    /// The annotated resource is the parent of resources of this type; the
    /// host lists the child type with this resource as parent.
    ChildResourceType { resource_type_id: String },

    /// The grant's effective principals are computed by the host: every
    /// principal holding one of `entitlement_ids` also holds the grant.
    GrantExpandable {
        entitlement_ids: Vec<String>,
        #[serde(default)]
        shallow: bool,
    },

    /// A revoke found nothing to remove. Success, not an error.
    GrantAlreadyRevoked,
}

impl Annotation {
    pub fn child_resource_type(resource_type_id: impl Into<String>) -> Self {
        Self::ChildResourceType {
            resource_type_id: resource_type_id.into(),
        }
    }

    #[must_use]
    pub fn grant_expandable(entitlement_ids: Vec<String>) -> Self {
        Self::GrantExpandable {
            entitlement_ids,
            shallow: false,
        }
    }
}

/// Ordered list of annotations with typed lookups.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Annotations(Vec<Annotation>);

impl Annotations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, annotation: Annotation) {
        self.0.push(annotation);
    }

    #[must_use]
    pub fn with(mut self, annotation: Annotation) -> Self {
        self.push(annotation);
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.0.iter()
    }

    /// Resource type IDs named by `ChildResourceType` annotations, in order.
    pub fn child_resource_types(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|a| match a {
            Annotation::ChildResourceType { resource_type_id } => Some(resource_type_id.as_str()),
            _ => None,
        })
    }

    /// Entitlement IDs of the first `GrantExpandable` annotation, if any.
    #[must_use]
    pub fn expandable(&self) -> Option<&[String]> {
        self.0.iter().find_map(|a| match a {
            Annotation::GrantExpandable {
                entitlement_ids, ..
            } => Some(entitlement_ids.as_slice()),
            _ => None,
        })
    }

    #[must_use]
    pub fn grant_already_revoked(&self) -> bool {
        self.0
            .iter()
            .any(|a| matches!(a, Annotation::GrantAlreadyRevoked))
    }
}

impl From<Annotation> for Annotations {
    fn from(annotation: Annotation) -> Self {
        Self(vec![annotation])
    }
}

impl FromIterator<Annotation> for Annotations {
    fn from_iter<I: IntoIterator<Item = Annotation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Annotations {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn typed_lookups_find_their_variants() {
        let annotations: Annotations = [
            Annotation::child_resource_type("user"),
            Annotation::child_resource_type("team"),
            Annotation::grant_expandable(vec!["team:t1:member".to_owned()]),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            annotations.child_resource_types().collect::<Vec<_>>(),
            vec!["user", "team"]
        );
        assert_eq!(
            annotations.expandable(),
            Some(["team:t1:member".to_owned()].as_slice())
        );
        assert!(!annotations.grant_already_revoked());
        assert!(Annotations::from(Annotation::GrantAlreadyRevoked).grant_already_revoked());
    }

    #[test]
    fn serializes_as_tagged_list() {
        let annotations = Annotations::new()
            .with(Annotation::child_resource_type("team"))
            .with(Annotation::GrantAlreadyRevoked);
        let json = serde_json::to_value(&annotations).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "type": "child_resource_type", "resource_type_id": "team" },
                { "type": "grant_already_revoked" }
            ])
        );
    }
}
