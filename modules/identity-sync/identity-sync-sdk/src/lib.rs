#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Identity-sync SDK
//!
//! Contract between an identity-governance host and the connectors that
//! project an upstream system into it:
//!
//! - [`ResourceType`], [`Resource`], [`Entitlement`], [`Grant`] - the resource graph
//! - [`Annotation`] - side-channel hints (child types, expandable grants, ...)
//! - [`PageToken`] / [`Page`] - host-driven pagination
//! - [`ResourceSyncer`] - builder core, with the [`ResourceProvisioner`] and
//!   [`AccountManager`] mixins
//! - [`Connector`] - metadata plus the set of builders
//! - [`Syncer`] - drives a connector through one in-memory sync pass
//!
//! ## Usage
//!
//! ```ignore
//! use identity_sync_sdk::Syncer;
//!
//! let snapshot = Syncer::new(connector).run(&cancel).await?;
//! for grant in snapshot.expand_grants() {
//!     println!("{} -> {}", grant.entitlement_id, grant.principal);
//! }
//! ```

pub mod account;
pub mod annotations;
pub mod api;
pub mod error;
pub mod models;
pub mod pagination;
pub mod sync;

// Re-export main types at crate root
pub use account::{
    AccountCreationField, AccountCreationSchema, AccountInfo, ConnectorMetadata,
    CreateAccountOutcome, CreateAccountResponse, CredentialDetails, CredentialOption,
    CredentialOptions, FieldKind,
};
pub use annotations::{Annotation, Annotations};
pub use api::{AccountManager, Connector, ResourceProvisioner, ResourceSyncer};
pub use error::{BoxError, ConnectorError};
pub use models::{
    Entitlement, EntitlementPurpose, GroupTrait, Grant, Profile, Resource, ResourceId,
    ResourceTrait, ResourceType, SecretTrait, TraitKind, UserTrait, entitlement_id,
};
pub use pagination::{FIRST_PAGE, Page, PageToken};
pub use sync::{EffectiveGrant, SyncOptions, SyncSnapshot, Syncer};
