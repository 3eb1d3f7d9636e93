//! Clerk Provider
//!
//! A declarative-infrastructure provider for Clerk organizations. The host
//! runtime plans changes and stores state; this crate supplies the
//! `clerk_organization` resource: its schema, its planner and the lifecycle
//! callbacks that turn planned state into Clerk Backend API calls.
//!
//! # Overview
//!
//! - **Remote client** ([`client`]): create, get, update and delete over HTTP,
//!   every failure wrapped as `failed to <op> organization: ...`
//! - **State reconciler** ([`reconciler`]): maps state to requests and fetched
//!   records back to state so that a refresh right after apply is stable
//! - **Provider** ([`provider`]): the [`ProviderService`] implementation the
//!   host drives
//! - **Testing** ([`testing`]): an in-memory API and a lifecycle harness
//!
//! # Quick Start
//!
//! ```ignore
//! use clerk_provider::{init_logging, ClerkProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = ClerkProvider::new();
//!     // api_key falls back to CLERK_API_KEY
//!     provider.configure(json!({})).await?;
//!
//!     let plan = provider
//!         .plan("clerk_organization", None, json!({}), json!({"name": "Acme"}))
//!         .await?;
//!     let state = provider
//!         .create("clerk_organization", plan.planned_state)
//!         .await?;
//!     println!("{}", state["id"]);
//!     Ok(())
//! }
//! ```
//!
//! # Unknown values
//!
//! States cross the host boundary as JSON objects. A value the host does not
//! know yet is carried as the string [`UNKNOWN_VALUE`]; see [`value`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod organization;
pub mod plan;
pub mod provider;
pub mod reconciler;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;
pub mod value;

// Re-export main types at crate root
pub use client::{ClerkClient, Organization, OrganizationApi};
pub use config::{ClientConfig, ProviderConfig};
pub use error::{ClientError, Operation, ProviderError, RemoteError};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use organization::OrganizationState;
pub use provider::ClerkProvider;
pub use reconciler::OrganizationReconciler;
pub use schema::{ProviderSchema, ORGANIZATION_RESOURCE};
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanAction, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};
pub use value::{AttrValue, UNKNOWN_VALUE};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
