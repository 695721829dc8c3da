use std::convert::Infallible;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gantry::error::GatewayError;
use gantry::{Gateway, GatewayConfig, GraphQLRequest, HttpBackingStore, SCHEMA_SDL, SchemaRegistry};

#[derive(Parser, Debug)]
#[command(name = "gantry", about = "GraphQL gateway over the launch-data REST service")]
struct Cli {
    /// Path to the gateway config file.
    #[arg(long, default_value = "gantry.yaml")]
    config: PathBuf,

    /// Override the configured listen port.
    #[arg(long)]
    port: Option<u16>,
}

const GRAPHIQL_HTML: &str = r#"
<!DOCTYPE html>
<html>
<head>
  <title>GraphiQL - Gantry</title>
  <link href="https://unpkg.com/graphiql@1.5.0/graphiql.min.css" rel="stylesheet" />
  <style>
    body { margin: 0; padding: 0; height: 100vh; }
    #graphiql { height: 100vh; }
  </style>
</head>
<body>
  <div id="graphiql"></div>

  <script src="https://unpkg.com/react@17.0.2/umd/react.production.min.js"></script>
  <script src="https://unpkg.com/react-dom@17.0.2/umd/react-dom.production.min.js"></script>
  <script src="https://unpkg.com/graphiql@1.5.0/graphiql.min.js"></script>
  <script>
    function graphQLFetcher(graphQLParams) {
      return fetch('/graphql', {
        method: 'post',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify(graphQLParams),
      }).then(response => response.json());
    }

    ReactDOM.render(
      React.createElement(GraphiQL, { fetcher: graphQLFetcher }),
      document.getElementById('graphiql')
    );
  </script>
</body>
</html>
"#;

// Create a response body from a string
fn full<T: Into<Bytes>>(value: T) -> BoxBody<Bytes, hyper::Error> {
    Full::new(value.into())
        .map_err(|never| match never {})
        .boxed()
}

fn internal_server_error() -> Response<BoxBody<Bytes, hyper::Error>> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .body(full("Internal Server Error"))
        .unwrap()
}

async fn handle_request(
    req: Request<Incoming>,
    gateway: Arc<Gateway>,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, Infallible> {
    let result = match (req.method(), req.uri().path()) {
        (&Method::POST, "/graphql") => {
            let body_bytes = match req.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(_) => {
                    return Ok(Response::builder()
                        .status(StatusCode::BAD_REQUEST)
                        .body(full("Failed to read request body"))
                        .unwrap_or_else(|_| internal_server_error()));
                }
            };

            match serde_json::from_slice::<GraphQLRequest>(&body_bytes) {
                Ok(graphql_req) => {
                    // Request-level failures still come back as a GraphQL
                    // errors payload, not a transport error.
                    let payload = match gateway.process_request(graphql_req).await {
                        Ok(response) => serde_json::to_string(&response).unwrap_or_default(),
                        Err(err) => serde_json::to_string(&json!({
                            "errors": [{ "message": err.to_string() }]
                        }))
                        .unwrap_or_default(),
                    };

                    Response::builder()
                        .header("Content-Type", "application/json")
                        .header("Access-Control-Allow-Origin", "*")
                        .body(full(payload))
                        .unwrap_or_else(|_| internal_server_error())
                }
                Err(err) => Response::builder()
                    .status(StatusCode::BAD_REQUEST)
                    .header("Access-Control-Allow-Origin", "*")
                    .body(full(format!("Invalid JSON request: {err}")))
                    .unwrap_or_else(|_| internal_server_error()),
            }
        }

        (&Method::GET, "/graphiql") => Response::builder()
            .header("Content-Type", "text/html")
            .header("Access-Control-Allow-Origin", "*")
            .body(full(GRAPHIQL_HTML))
            .unwrap_or_else(|_| internal_server_error()),

        (&Method::GET, "/") => Response::builder()
            .status(StatusCode::FOUND)
            .header("Location", "/graphiql")
            .header("Access-Control-Allow-Origin", "*")
            .body(full(""))
            .unwrap_or_else(|_| internal_server_error()),

        (&Method::OPTIONS, _) => Response::builder()
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type")
            .body(full(""))
            .unwrap_or_else(|_| internal_server_error()),

        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header("Access-Control-Allow-Origin", "*")
            .body(full("Not Found"))
            .unwrap_or_else(|_| internal_server_error()),
    };

    Ok(result)
}

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gantry=info,warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = GatewayConfig::load(&cli.config)?;
    if let Some(port) = cli.port {
        config.listen.port = port;
    }

    let registry = SchemaRegistry::from_sdl(SCHEMA_SDL)?;
    let store = Arc::new(HttpBackingStore::new(config.backing_store.base_url.clone()));
    let gateway = Arc::new(Gateway::new(registry, store));

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.listen.port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, backing_store = %config.backing_store.base_url, "gantry listening");
    info!("GraphiQL UI available at http://{addr}/graphiql");

    loop {
        let (stream, _remote) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let gateway = Arc::clone(&gateway);

        tokio::task::spawn(async move {
            let service = service_fn(move |req| handle_request(req, Arc::clone(&gateway)));

            if let Err(err) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                error!(error = %err, "error serving connection");
            }
        });
    }
}
