//! # Registry-Client - HTTP access to the CallSync call registry
//!
//! Implements [`callsync_call_core::CallRegistry`] over the registry's JSON
//! API and manages the bearer credential the registry issued to this user.
//!
//! ```ignore
//! use callsync_registry_client::{HttpCallRegistry, RegistryConfig};
//!
//! let registry = HttpCallRegistry::new(RegistryConfig::from_env()?)?;
//! let me = registry.local_user().await?;
//! let handle = CallActor::spawn(Arc::new(registry), MachineConfig::default())?;
//! ```

pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod wire;

pub use client::HttpCallRegistry;
pub use config::RegistryConfig;
pub use credential::{Credential, CredentialClaims};
pub use error::{ClientError, Result};
