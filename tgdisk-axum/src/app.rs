use std::convert::Infallible;

use axum::extract::Request;
use axum::response::IntoResponse;
use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::Service;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::routes;
use crate::TgDiskState;

/// The HTTP application: tgdisk routes plus whatever the binary mounts next to them
#[derive(Clone)]
pub struct TgDiskApp {
    pub state: TgDiskState,
    pub router: Router<()>,
}

impl TgDiskApp {
    pub fn new(state: TgDiskState) -> Self {
        Self {
            router: routes::router(state.clone()),
            state,
        }
    }

    /// Serve `service` for any path no route matched (e.g. a static UI)
    pub fn fallback_service<S>(mut self, service: S) -> Self
    where
        S: Service<Request, Error = Infallible> + Clone + Send + Sync + 'static,
        S::Response: IntoResponse,
        S::Future: Send + 'static,
    {
        self.router = self.router.fallback_service(service);
        self
    }

    /// Finished router with tracing and `x-request-id` handling
    pub fn into_router(self) -> Router<()> {
        self.router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.into_router()).await?;
        Ok(())
    }
}

pub fn axum(state: TgDiskState) -> TgDiskApp {
    TgDiskApp::new(state)
}
