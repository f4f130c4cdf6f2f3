//! Serve a grid endpoint over HTTP.
//!
//! Each request is decoded into a [GridQuery] and handed to a
//! [GridEndpoint], which builds a fresh [ResultSerializer]. Nothing is
//! shared between requests besides the endpoint itself.

use std::net::SocketAddr;
use std::sync::Arc;

use evolugrid_common::query::GridQuery;
use hyper::header::{self, HeaderValue};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use tokio::sync::broadcast;

use crate::serializer::{GridResponse, ResultSerializer, SerializerError};

/// Options for the grid server
#[derive(Debug, Clone)]
pub struct GridServerOptions {
    pub host: SocketAddr,
    /// Only answer on this path. Any path is accepted when unset.
    pub path: Option<String>,
}

impl Default for GridServerOptions {
    fn default() -> Self {
        Self {
            host: SocketAddr::from(([127, 0, 0, 1], 8080)),
            path: None,
        }
    }
}

/// Builds the serializer answering one request.
pub trait GridEndpoint: Send + Sync + 'static {
    fn serializer(
        &self,
        query: &GridQuery,
    ) -> Result<ResultSerializer, SerializerError>;
}

impl<F> GridEndpoint for F
where
    F: Fn(&GridQuery) -> Result<ResultSerializer, SerializerError>
        + Send
        + Sync
        + 'static,
{
    fn serializer(
        &self,
        query: &GridQuery,
    ) -> Result<ResultSerializer, SerializerError> {
        (self)(query)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("HTTP server error: {0}")]
    Hyper(#[from] hyper::Error),
}

/// A running grid server.
pub struct GridServerHandle {
    local_addr: SocketAddr,
    stop_tx: broadcast::Sender<u8>,
}

impl GridServerHandle {
    /// The bound address; useful when binding to port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Ask the server to stop accepting requests.
    pub fn shutdown(&self) {
        if self.stop_tx.send(1).is_err() {
            log::debug!("Grid server already stopped");
        }
    }
}

fn plain_response(status: StatusCode, message: String) -> Response<Body> {
    let mut res = Response::new(Body::from(message));
    *res.status_mut() = status;
    res
}

/// Add CORS header
fn update_headers<T>(res: &mut Response<T>) {
    res.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
}

fn error_response(err: SerializerError) -> Response<Body> {
    match err {
        SerializerError::UnsupportedFormat(_) => {
            log::debug!("Rejecting request: {err}");
            plain_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        err => {
            log::error!("Unable to build grid response: {err}");
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn to_http(response: GridResponse) -> Result<Response<Body>, SerializerError> {
    let res = match response {
        GridResponse::Json(envelope) => {
            let body = serde_json::to_vec(&envelope)?;
            let mut res = Response::new(Body::from(body));
            let h = res.headers_mut();
            h.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
            h.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            res
        }
        GridResponse::Csv(doc) => {
            let content_type =
                format!("text/csv; charset={}", doc.charset.label());
            let disposition = format!("attachment; filename={}", doc.filename);

            let mut res = Response::new(Body::from(doc.bytes));
            let h = res.headers_mut();
            if let Ok(v) = HeaderValue::from_str(&content_type) {
                h.insert(header::CONTENT_TYPE, v);
            }
            match HeaderValue::from_str(&disposition) {
                Ok(v) => {
                    h.insert(header::CONTENT_DISPOSITION, v);
                }
                Err(_) => {
                    h.insert(
                        header::CONTENT_DISPOSITION,
                        HeaderValue::from_static("attachment; filename=data.csv"),
                    );
                }
            }
            h.insert(header::CACHE_CONTROL, HeaderValue::from_static("public"));
            res
        }
    };

    Ok(res)
}

/// Answer one request
fn handle_request(
    req: &Request<Body>,
    endpoint: &dyn GridEndpoint,
    path: Option<&str>,
) -> Response<Body> {
    if req.method() != Method::GET {
        return plain_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed".to_string(),
        );
    }

    if let Some(p) = path {
        if req.uri().path() != p {
            return plain_response(StatusCode::NOT_FOUND, "Not Found".to_string());
        }
    }

    let query = match GridQuery::from_query_str(req.uri().query().unwrap_or("")) {
        Ok(q) => q,
        Err(e) => {
            log::debug!("Bad grid request {}: {e}", req.uri());
            return plain_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    log::debug!("Grid request: {query:?}");

    let result = endpoint
        .serializer(&query)
        .map(|s| s.apply_query(&query))
        .and_then(ResultSerializer::response)
        .and_then(to_http);

    let mut res = match result {
        Ok(res) => res,
        Err(e) => error_response(e),
    };
    update_headers(&mut res);
    res
}

/// Bind and launch the grid server on the current tokio runtime.
///
/// Returns once the socket is bound; requests are then served on a spawned
/// task until [GridServerHandle::shutdown] is called.
pub fn serve_grid(
    options: GridServerOptions,
    endpoint: impl GridEndpoint,
) -> Result<GridServerHandle, ServerError> {
    let endpoint: Arc<dyn GridEndpoint> = Arc::new(endpoint);
    let path: Option<Arc<str>> = options.path.as_deref().map(Arc::from);

    let make_service = make_service_fn(move |_| {
        let endpoint = endpoint.clone();
        let path = path.clone();

        async move {
            Ok::<_, hyper::Error>(service_fn(move |req| {
                let res =
                    handle_request(&req, endpoint.as_ref(), path.as_deref());
                async move { Ok::<_, hyper::Error>(res) }
            }))
        }
    });

    let server = Server::try_bind(&options.host)?.serve(make_service);
    let local_addr = server.local_addr();

    let (stop_tx, mut stop_rx) = broadcast::channel(2);

    log::info!("Serving grid on http://{local_addr}");

    tokio::spawn(async move {
        let graceful = server.with_graceful_shutdown(async move {
            let _ = stop_rx.recv().await;
        });

        if let Err(e) = graceful.await {
            log::error!("HTTP server error: {e}");
        }

        log::debug!("Grid server shut down.");
    });

    Ok(GridServerHandle {
        local_addr,
        stop_tx,
    })
}

#[cfg(test)]
mod tests {
    use hyper::body::to_bytes;
    use hyper::Client;
    use serde_json::json;

    use super::*;
    use crate::column::KeyColumn;
    use crate::source::VecSource;
    use evolugrid_common::envelope::ResponseEnvelope;

    fn people(query: &GridQuery) -> Result<ResultSerializer, SerializerError> {
        let rows = VecSource::new(vec![
            json!({"id": 1, "name": "Ann"}),
            json!({"id": 2, "name": "Bob"}),
            json!({"id": 3, "name": "Cid"}),
        ])
        .with_filters(query.filters.clone());

        Ok(ResultSerializer::new(rows)
            .column(KeyColumn::new("Id", "id"))
            .column(KeyColumn::new("Name", "name"))
            .csv_filename("people.csv"))
    }

    async fn get(addr: SocketAddr, query: &str) -> Response<Body> {
        let uri: hyper::Uri =
            format!("http://{addr}/grid?{query}").parse().unwrap();
        Client::new().get(uri).await.unwrap()
    }

    async fn server_main() {
        let handle = serve_grid(
            GridServerOptions {
                host: SocketAddr::from(([127, 0, 0, 1], 0)),
                path: Some("/grid".to_string()),
            },
            people,
        )
        .unwrap();
        let addr = handle.local_addr();

        let res = get(addr, "offset=0&limit=2&name=b").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body = to_bytes(res.into_body()).await.unwrap();
        let env: ResponseEnvelope = serde_json::from_slice(&body).unwrap();
        assert_eq!(env.count, Some(1));
        assert_eq!(env.data[0]["col1"], json!("Bob"));

        let res = get(addr, "output=csv").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=people.csv"
        );
        let body = to_bytes(res.into_body()).await.unwrap();
        assert_eq!(&body[..], b"Id;Name\n1;Ann\n2;Bob\n3;Cid\n");

        let res = get(addr, "output=pdf").await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = get(addr, "limit=many").await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        handle.shutdown();
    }

    #[test]
    fn serve_json_and_csv() {
        let _ = env_logger::builder().is_test(true).try_init();

        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(server_main())
    }
}
