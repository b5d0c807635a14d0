//! Account provisioning and connector metadata models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::annotations::Annotations;
use crate::models::{Profile, Resource};

/// Profile submitted by the host when it asks a connector to create an account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AccountInfo {
    #[serde(default)]
    pub profile: Profile,
}

impl AccountInfo {
    #[must_use]
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    /// String value of `field`, or `None` if absent or not a string.
    #[must_use]
    pub fn string(&self, field: &str) -> Option<&str> {
        self.profile.get(field).and_then(serde_json::Value::as_str)
    }

    /// List value of `field`, or `None` unless it is a list made only of strings.
    #[must_use]
    pub fn string_list(&self, field: &str) -> Option<Vec<String>> {
        self.profile
            .get(field)?
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_owned))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CredentialOption {
    /// The account gets no credential from the connector; the upstream
    /// handles onboarding (for example with an invitation email).
    NoPassword,
    RandomPassword,
    Sso,
}

/// Credential mode requested by the host for one account creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialOptions {
    pub option: CredentialOption,
}

impl Default for CredentialOptions {
    fn default() -> Self {
        Self {
            option: CredentialOption::NoPassword,
        }
    }
}

/// Credential modes a connector supports for account creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialDetails {
    pub supported: Vec<CredentialOption>,
    pub preferred: CredentialOption,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CreateAccountResponse {
    Success {
        resource: Resource,
    },
    /// The account exists upstream but needs an out-of-band step to become usable.
    ActionRequired {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resource: Option<Resource>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateAccountOutcome {
    pub response: CreateAccountResponse,
    #[serde(default, skip_serializing_if = "Annotations::is_empty")]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    StringList,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountCreationField {
    pub display_name: String,
    pub description: String,
    pub placeholder: String,
    pub required: bool,
    pub order: u32,
    pub kind: FieldKind,
}

/// Fields the host collects before calling `create_account`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountCreationSchema {
    pub fields: BTreeMap<String, AccountCreationField>,
}

impl AccountCreationSchema {
    /// Names of required fields that `account` leaves absent or blank, in field order.
    #[must_use]
    pub fn missing_required<'a>(&'a self, account: &AccountInfo) -> Vec<&'a str> {
        let mut missing: Vec<(&AccountCreationField, &str)> = self
            .fields
            .iter()
            .filter(|(name, field)| {
                field.required
                    && match field.kind {
                        FieldKind::String => account.string(name).is_none_or(str::is_empty),
                        FieldKind::StringList => account.string_list(name).is_none(),
                    }
            })
            .map(|(name, field)| (field, name.as_str()))
            .collect();
        missing.sort_by_key(|(field, _)| field.order);
        missing.into_iter().map(|(_, name)| name).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectorMetadata {
    pub display_name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_creation_schema: Option<AccountCreationSchema>,
}
