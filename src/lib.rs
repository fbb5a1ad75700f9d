//! Route Control Client
//!
//! Typed gRPC client for a control plane's route-management service, used by
//! a cloud controller to keep routes, route mappings, and process
//! associations in sync over a mutually authenticated channel.
//!
//! ## Core pieces
//!
//! 1. **[`ClientConfig`]** - endpoint, per-call timeout, and three PEM
//!    credential artifacts (CA bundle, client key, client certificate chain),
//!    each supplied as bytes or as a path read once at construction
//! 2. **[`RouteControlClient`]** - one typed method per remote operation;
//!    lazily connects a single shared channel on first use
//! 3. **[`ClientError`]** - structured failures: configuration,
//!    remote-call (with gRPC status classification and metadata), and
//!    startup-timeout
//!
//! ## Usage
//!
//! ```ignore
//! use route_control_client::{ClientConfig, Credential, RouteControlClient};
//!
//! let config = ClientConfig::new(
//!     "copilot.service.internal",
//!     9000,
//!     Credential::file("/etc/certs/server-ca.crt"),
//!     Credential::file("/etc/certs/client.key"),
//!     Credential::file("/etc/certs/client.crt"),
//! );
//! let client = RouteControlClient::new(config)?;
//!
//! client.upsert_route("route-guid", "app.example.com", None).await?;
//! client.map_route("capi-process-guid", "route-guid").await?;
//! ```
//!
//! The client performs no implicit retries and never swallows a failure;
//! every error is returned to the caller for inspection. See
//! [`RouteControlClient::wait_until_healthy`] for the optional bring-up
//! health gate.

pub mod client;
pub mod config;
pub mod error;

/// Generated protocol types for the `routecontrol` schema.
///
/// The server trait is generated too; the integration tests implement it for
/// an in-process fake control plane.
pub mod pb {
    tonic::include_proto!("routecontrol");
}

pub use client::{RouteControlClient, HEALTH_POLL_INTERVAL, HEALTH_POLL_RETRIES};
pub use config::{ClientConfig, Credential, DEFAULT_CALL_TIMEOUT};
pub use error::{ClientError, RemoteCallError};
pub use pb::{ProcessAssociation, Route, RouteMapping};

// Status classification carried by `RemoteCallError`.
pub use tonic::Code;
