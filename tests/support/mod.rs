//! Shared integration-test fixtures: a throwaway certificate authority and an
//! in-process fake control-plane server that records every request it
//! receives.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Certificate, Identity, Server, ServerTlsConfig};
use tonic::{Request, Response, Status};

use route_control_client::pb::control_plane_server::{ControlPlane, ControlPlaneServer};
use route_control_client::pb::{
    BulkSyncRequest, BulkSyncResponse, DeleteProcessAssociationRequest,
    DeleteProcessAssociationResponse, DeleteRouteRequest, DeleteRouteResponse, HealthRequest,
    HealthResponse, MapRouteRequest, MapRouteResponse, UnmapRouteRequest, UnmapRouteResponse,
    UpsertProcessAssociationRequest, UpsertProcessAssociationResponse, UpsertRouteRequest,
    UpsertRouteResponse,
};

// =============================================================================
// Certificate material
// =============================================================================

/// PEM material for one CA, a server certificate (SAN "localhost"), and a
/// client certificate signed by the same CA.
pub struct TlsFixture {
    pub ca_pem: String,
    pub server_cert_pem: String,
    pub server_key_pem: String,
    pub client_cert_pem: String,
    pub client_key_pem: String,
}

pub fn generate_tls_fixture() -> TlsFixture {
    use rcgen::{
        BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
        KeyUsagePurpose,
    };

    let ca_key = KeyPair::generate().unwrap();
    let mut ca_params = CertificateParams::new(Vec::new()).unwrap();
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params
        .distinguished_name
        .push(DnType::CommonName, "route-control test CA");
    ca_params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
    let ca_cert = ca_params.self_signed(&ca_key).unwrap();

    let server_key = KeyPair::generate().unwrap();
    let mut server_params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    server_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    let server_cert = server_params.signed_by(&server_key, &ca_cert, &ca_key).unwrap();

    let client_key = KeyPair::generate().unwrap();
    let mut client_params = CertificateParams::new(Vec::new()).unwrap();
    client_params
        .distinguished_name
        .push(DnType::CommonName, "cloud-controller client");
    client_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
    let client_cert = client_params.signed_by(&client_key, &ca_cert, &ca_key).unwrap();

    TlsFixture {
        ca_pem: ca_cert.pem(),
        server_cert_pem: server_cert.pem(),
        server_key_pem: server_key.serialize_pem(),
        client_cert_pem: client_cert.pem(),
        client_key_pem: client_key.serialize_pem(),
    }
}

// =============================================================================
// Fake control-plane service
// =============================================================================

/// Requests received by the fake service, for verbatim-field assertions.
#[derive(Debug, Default)]
pub struct Recorded {
    pub upsert_route: Option<UpsertRouteRequest>,
    pub delete_route: Option<DeleteRouteRequest>,
    pub map_route: Option<MapRouteRequest>,
    pub unmap_route: Option<UnmapRouteRequest>,
    pub upsert_process_association: Option<UpsertProcessAssociationRequest>,
    pub delete_process_association: Option<DeleteProcessAssociationRequest>,
    pub bulk_sync: Option<BulkSyncRequest>,
}

pub struct FakeControlPlane {
    recorded: Arc<Mutex<Recorded>>,
    health_calls: AtomicU32,
    unhealthy_checks: u32,
    delete_delay: Duration,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self {
            recorded: Arc::new(Mutex::new(Recorded::default())),
            health_calls: AtomicU32::new(0),
            unhealthy_checks: 0,
            delete_delay: Duration::ZERO,
        }
    }

    /// Reports unhealthy for the first `checks` health calls.
    pub fn unhealthy_for(mut self, checks: u32) -> Self {
        self.unhealthy_checks = checks;
        self
    }

    /// Stalls delete_route handlers, for deadline tests.
    pub fn delay_deletes_by(mut self, delay: Duration) -> Self {
        self.delete_delay = delay;
        self
    }

    pub fn recorded(&self) -> Arc<Mutex<Recorded>> {
        self.recorded.clone()
    }
}

#[tonic::async_trait]
impl ControlPlane for FakeControlPlane {
    async fn health(
        &self,
        _request: Request<HealthRequest>,
    ) -> Result<Response<HealthResponse>, Status> {
        let call = self.health_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Response::new(HealthResponse {
            healthy: call > self.unhealthy_checks,
        }))
    }

    async fn upsert_route(
        &self,
        request: Request<UpsertRouteRequest>,
    ) -> Result<Response<UpsertRouteResponse>, Status> {
        self.recorded.lock().unwrap().upsert_route = Some(request.into_inner());
        Ok(Response::new(UpsertRouteResponse {}))
    }

    async fn delete_route(
        &self,
        request: Request<DeleteRouteRequest>,
    ) -> Result<Response<DeleteRouteResponse>, Status> {
        if !self.delete_delay.is_zero() {
            tokio::time::sleep(self.delete_delay).await;
        }
        self.recorded.lock().unwrap().delete_route = Some(request.into_inner());
        Ok(Response::new(DeleteRouteResponse {}))
    }

    async fn map_route(
        &self,
        request: Request<MapRouteRequest>,
    ) -> Result<Response<MapRouteResponse>, Status> {
        self.recorded.lock().unwrap().map_route = Some(request.into_inner());
        Ok(Response::new(MapRouteResponse {}))
    }

    async fn unmap_route(
        &self,
        request: Request<UnmapRouteRequest>,
    ) -> Result<Response<UnmapRouteResponse>, Status> {
        self.recorded.lock().unwrap().unmap_route = Some(request.into_inner());
        Ok(Response::new(UnmapRouteResponse {}))
    }

    async fn upsert_process_association(
        &self,
        request: Request<UpsertProcessAssociationRequest>,
    ) -> Result<Response<UpsertProcessAssociationResponse>, Status> {
        self.recorded.lock().unwrap().upsert_process_association = Some(request.into_inner());
        Ok(Response::new(UpsertProcessAssociationResponse {}))
    }

    async fn delete_process_association(
        &self,
        request: Request<DeleteProcessAssociationRequest>,
    ) -> Result<Response<DeleteProcessAssociationResponse>, Status> {
        self.recorded.lock().unwrap().delete_process_association = Some(request.into_inner());
        Ok(Response::new(DeleteProcessAssociationResponse {}))
    }

    async fn bulk_sync(
        &self,
        request: Request<BulkSyncRequest>,
    ) -> Result<Response<BulkSyncResponse>, Status> {
        self.recorded.lock().unwrap().bulk_sync = Some(request.into_inner());
        Ok(Response::new(BulkSyncResponse {}))
    }
}

// =============================================================================
// In-process server harness
// =============================================================================

pub struct FakeServer {
    pub addr: SocketAddr,
    pub recorded: Arc<Mutex<Recorded>>,
    handle: JoinHandle<()>,
}

impl FakeServer {
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Serves `service` over mutual TLS on an OS-assigned loopback port.
pub async fn start_fake_server(fixture: &TlsFixture, service: FakeControlPlane) -> FakeServer {
    let tls = ServerTlsConfig::new()
        .identity(Identity::from_pem(
            &fixture.server_cert_pem,
            &fixture.server_key_pem,
        ))
        .client_ca_root(Certificate::from_pem(&fixture.ca_pem));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded = service.recorded();

    let handle = tokio::spawn(async move {
        Server::builder()
            .tls_config(tls)
            .unwrap()
            .add_service(ControlPlaneServer::new(service))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    FakeServer {
        addr,
        recorded,
        handle,
    }
}
