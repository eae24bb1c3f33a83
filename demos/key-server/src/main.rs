//! A small key-value store exposed over JSON-RPC.
//!
//! Methods: `set(key, value)`, `get(key)`, `keys()`. The `clear`
//! notification wipes the store. All connected clients share one store;
//! each connection gets its own delegate instance from the factory.
//!
//! Run with `cargo run -p key-server`, then point `key-client` at it.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use parking_lot::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tandem_json_rpc::{ErrorCode, JsonValue, Notification, Request, Response};
use tandem_rpc::{
    DelegateError, RpcAddress, Server, Session, SessionDelegate, TerminationSchedule,
};

#[derive(Parser)]
#[command(about = "Key-value store speaking JSON-RPC over TCP")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:7878")]
    listen: SocketAddr,
}

#[derive(Default)]
struct Store {
    entries: Mutex<BTreeMap<String, JsonValue>>,
}

struct StoreDelegate {
    store: Arc<Store>,
}

#[async_trait]
impl SessionDelegate for StoreDelegate {
    async fn session_did_start(&self, session: &Session) {
        info!("client {} connected", session.peer_address());
    }

    async fn session_did_terminate(&self, session: &Session) {
        info!("client {} disconnected", session.peer_address());
    }

    async fn respond(
        &self,
        _session: &Session,
        request: Request,
    ) -> Result<Option<Response>, DelegateError> {
        match request.method.as_str() {
            "set" => {
                let (Some(key), Some(value)) = (
                    request.get_param_index(0).and_then(JsonValue::as_str),
                    request.get_param_index(1),
                ) else {
                    return Ok(Some(Response::error_for(&request, ErrorCode::InvalidParams)));
                };
                self.store
                    .entries
                    .lock()
                    .insert(key.to_string(), value.clone());
                Ok(Some(Response::success_for(&request, JsonValue::Bool(true))))
            }
            "get" => {
                let Some(key) = request.get_param_index(0).and_then(JsonValue::as_str) else {
                    return Ok(Some(Response::error_for(&request, ErrorCode::InvalidParams)));
                };
                let value = self
                    .store
                    .entries
                    .lock()
                    .get(key)
                    .cloned()
                    .unwrap_or(JsonValue::Null);
                Ok(Some(Response::success_for(&request, value)))
            }
            "keys" => {
                let keys: Vec<JsonValue> = self
                    .store
                    .entries
                    .lock()
                    .keys()
                    .map(|key| JsonValue::from(key.clone()))
                    .collect();
                Ok(Some(Response::success_for(&request, JsonValue::Array(keys))))
            }
            _ => Ok(None),
        }
    }

    async fn handle_notification(&self, _session: &Session, notification: Notification) {
        if notification.method == "clear" {
            self.store.entries.lock().clear();
            info!("store cleared");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let store = Arc::new(Store::default());
    let server = Server::bind(RpcAddress::Tcp(args.listen), move || {
        Arc::new(StoreDelegate {
            store: Arc::clone(&store),
        }) as Arc<dyn SessionDelegate>
    })
    .await?;
    server.start()?;
    info!("key server ready on {}", server.local_addr());

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    server.terminate(TerminationSchedule::Immediately).await;
    Ok(())
}
