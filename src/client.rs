//! Control-plane client façade
//!
//! [`RouteControlClient`] wraps the generated gRPC stub behind typed
//! operations. Construction resolves credentials and builds the TLS endpoint
//! but performs no I/O; the channel is established lazily on the first call
//! and shared (HTTP/2 multiplexed) by all subsequent and concurrent calls.

use std::future::Future;
use std::time::Duration;

use tokio::sync::OnceCell;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};
use tonic::{Response, Status};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, RemoteCallError};
use crate::pb::control_plane_client::ControlPlaneClient;
use crate::pb::{
    BulkSyncRequest, BulkSyncResponse, DeleteProcessAssociationRequest,
    DeleteProcessAssociationResponse, DeleteRouteRequest, DeleteRouteResponse, HealthRequest,
    MapRouteRequest, MapRouteResponse, ProcessAssociation, Route, RouteMapping,
    UnmapRouteRequest, UnmapRouteResponse, UpsertProcessAssociationRequest,
    UpsertProcessAssociationResponse, UpsertRouteRequest, UpsertRouteResponse,
};

/// Interval between bring-up health checks.
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Retries after the initial bring-up health check (so at most
/// `HEALTH_POLL_RETRIES + 1` checks in total).
pub const HEALTH_POLL_RETRIES: u32 = 5;

/// Typed client for the control plane's route-management service.
///
/// Cheap to share behind a reference; all operations take `&self` and may be
/// issued concurrently over the one underlying channel.
pub struct RouteControlClient {
    endpoint: Endpoint,
    authority: String,
    timeout: Duration,
    channel: OnceCell<Channel>,
}

impl RouteControlClient {
    /// Builds a client from `config`.
    ///
    /// Reads and validates credential artifacts (once, here) and constructs
    /// the TLS endpoint. Does not open a connection.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let material = config.resolve_credentials()?;

        let server_name = config
            .tls_server_name
            .clone()
            .unwrap_or_else(|| config.host.clone());
        let tls = ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(material.ca_cert))
            .identity(Identity::from_pem(
                material.client_cert_chain,
                material.client_key,
            ))
            .domain_name(server_name);

        let authority = format!("{}:{}", config.host, config.port);
        let endpoint = Channel::from_shared(format!("https://{}", authority))
            .map_err(|e| {
                ClientError::Configuration(format!("invalid endpoint authority {}: {}", authority, e))
            })?
            .tls_config(tls)
            .map_err(|e| ClientError::Configuration(format!("building TLS settings: {}", e)))?;

        Ok(Self {
            endpoint,
            authority,
            timeout: config.timeout,
            channel: OnceCell::new(),
        })
    }

    /// Health status as reported by the remote service.
    pub async fn check_health(&self) -> Result<bool, ClientError> {
        let response = self
            .invoke("health", |mut stub| async move {
                stub.health(HealthRequest {}).await
            })
            .await?;
        Ok(response.healthy)
    }

    /// Creates or updates a route.
    pub async fn upsert_route(
        &self,
        guid: impl Into<String>,
        host: impl Into<String>,
        path: Option<String>,
    ) -> Result<UpsertRouteResponse, ClientError> {
        let route = Route {
            guid: guid.into(),
            host: host.into(),
            path: path.unwrap_or_default(),
        };
        self.invoke("upsert_route", |mut stub| async move {
            stub.upsert_route(UpsertRouteRequest { route: Some(route) }).await
        })
        .await
    }

    /// Deletes a route by guid.
    pub async fn delete_route(
        &self,
        guid: impl Into<String>,
    ) -> Result<DeleteRouteResponse, ClientError> {
        let request = DeleteRouteRequest { guid: guid.into() };
        self.invoke("delete_route", |mut stub| async move {
            stub.delete_route(request).await
        })
        .await
    }

    /// Associates a backend process with a route.
    pub async fn map_route(
        &self,
        capi_process_guid: impl Into<String>,
        route_guid: impl Into<String>,
    ) -> Result<MapRouteResponse, ClientError> {
        let request = MapRouteRequest {
            route_mapping: Some(RouteMapping {
                capi_process_guid: capi_process_guid.into(),
                route_guid: route_guid.into(),
            }),
        };
        self.invoke("map_route", |mut stub| async move {
            stub.map_route(request).await
        })
        .await
    }

    /// Removes the association between a backend process and a route.
    pub async fn unmap_route(
        &self,
        capi_process_guid: impl Into<String>,
        route_guid: impl Into<String>,
    ) -> Result<UnmapRouteResponse, ClientError> {
        let request = UnmapRouteRequest {
            route_mapping: Some(RouteMapping {
                capi_process_guid: capi_process_guid.into(),
                route_guid: route_guid.into(),
            }),
        };
        self.invoke("unmap_route", |mut stub| async move {
            stub.unmap_route(request).await
        })
        .await
    }

    /// Creates or updates the association between a front-end process and its
    /// backend processes.
    pub async fn upsert_process_association(
        &self,
        capi_process_guid: impl Into<String>,
        diego_process_guids: Vec<String>,
    ) -> Result<UpsertProcessAssociationResponse, ClientError> {
        let request = UpsertProcessAssociationRequest {
            process_association: Some(ProcessAssociation {
                capi_process_guid: capi_process_guid.into(),
                diego_process_guids,
            }),
        };
        self.invoke("upsert_process_association", |mut stub| async move {
            stub.upsert_process_association(request).await
        })
        .await
    }

    /// Deletes a process association by its front-end process guid.
    pub async fn delete_process_association(
        &self,
        capi_process_guid: impl Into<String>,
    ) -> Result<DeleteProcessAssociationResponse, ClientError> {
        let request = DeleteProcessAssociationRequest {
            capi_process_guid: capi_process_guid.into(),
        };
        self.invoke("delete_process_association", |mut stub| async move {
            stub.delete_process_association(request).await
        })
        .await
    }

    /// Pushes the full route and mapping state in one request.
    ///
    /// Experimental: the remote contract for this operation is unstable and
    /// callers must tolerate it changing.
    pub async fn bulk_sync(
        &self,
        routes: Vec<Route>,
        route_mappings: Vec<RouteMapping>,
    ) -> Result<BulkSyncResponse, ClientError> {
        let request = BulkSyncRequest {
            routes,
            route_mappings,
        };
        self.invoke("bulk_sync", |mut stub| async move {
            stub.bulk_sync(request).await
        })
        .await
    }

    /// Blocks until the service reports healthy, polling at
    /// [`HEALTH_POLL_INTERVAL`] with a retry budget of
    /// [`HEALTH_POLL_RETRIES`].
    ///
    /// A bring-up convenience for harnesses that start the service and the
    /// client together; not a steady-state behavior of the client.
    pub async fn wait_until_healthy(&self) -> Result<(), ClientError> {
        self.wait_until_healthy_with(HEALTH_POLL_INTERVAL, HEALTH_POLL_RETRIES)
            .await
    }

    /// [`wait_until_healthy`](Self::wait_until_healthy) with an explicit poll
    /// interval and retry budget.
    ///
    /// An unhealthy report and a failed health call both consume a retry;
    /// configuration errors propagate immediately.
    pub async fn wait_until_healthy_with(
        &self,
        interval: Duration,
        retries: u32,
    ) -> Result<(), ClientError> {
        let mut checks = 0u32;
        loop {
            match self.check_health().await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(ClientError::RemoteCall(_)) => {}
                Err(other) => return Err(other),
            }
            checks += 1;
            if checks > retries {
                return Err(ClientError::StartupTimeout { checks });
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Returns the shared channel, establishing it on first use.
    ///
    /// The `OnceCell` is the one-time initialization guard: concurrent first
    /// callers race to a single connect, and a failed connect leaves the cell
    /// empty so the next call retries.
    async fn channel(&self) -> Result<Channel, ClientError> {
        let channel = self
            .channel
            .get_or_try_init(|| async {
                debug!(authority = %self.authority, "establishing control-plane channel");
                self.endpoint.connect().await
            })
            .await
            .map_err(|e| RemoteCallError::unavailable("connect", e.to_string()))?;
        Ok(channel.clone())
    }

    /// Issues one call against the shared channel with the configured
    /// per-call timeout. Channel establishment happens inside the timeout
    /// scope, so a hanging connect or TLS handshake is bounded by the same
    /// deadline as the call itself. No lock is held across the call.
    async fn invoke<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T, ClientError>
    where
        F: FnOnce(ControlPlaneClient<Channel>) -> Fut,
        Fut: Future<Output = Result<Response<T>, Status>>,
    {
        let attempt = async {
            let channel = self.channel().await?;
            let stub = ControlPlaneClient::new(channel);
            debug!(operation, "issuing control-plane call");
            call(stub)
                .await
                .map(Response::into_inner)
                .map_err(|status| RemoteCallError::from_status(operation, status).into())
        };
        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(result) => result,
            Err(_elapsed) => Err(RemoteCallError::deadline_exceeded(operation, self.timeout).into()),
        }
    }
}
