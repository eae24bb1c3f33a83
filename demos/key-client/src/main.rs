//! Exercises the key-server demo: single calls, a batch, a notification.
//!
//! Start `key-server` first, then `cargo run -p key-client`.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tandem_json_rpc::JsonValue;
use tandem_rpc::{NullDelegate, RpcAddress, Session};

#[derive(Parser)]
#[command(about = "Exercises the key-server demo")]
struct Args {
    /// Server address to connect to
    #[arg(long, default_value = "127.0.0.1:7878")]
    connect: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let session = Session::connect(&RpcAddress::Tcp(args.connect), Arc::new(NullDelegate)).await?;

    let set = session
        .call(
            "set",
            Some(vec![JsonValue::from("greeting"), JsonValue::from("hello")].into()),
        )
        .await;
    info!("set greeting -> {:?}", set.result);

    // Two writes and a read in one frame; completions fire as the batched
    // responses come back.
    let mut batch = session.batch();
    batch.request(
        "set",
        Some(vec![JsonValue::from("a"), JsonValue::Int(1)].into()),
        |response| info!("set a -> {:?}", response.result),
    );
    batch.request(
        "set",
        Some(vec![JsonValue::from("b"), JsonValue::Int(2)].into()),
        |response| info!("set b -> {:?}", response.result),
    );
    batch.request("keys", None, |response| {
        info!("keys -> {:?}", response.result)
    });
    batch.send().await?;

    let greeting = session
        .call("get", Some(vec![JsonValue::from("greeting")].into()))
        .await;
    info!("get greeting -> {:?}", greeting.result);

    // Fire-and-forget: wipe the store on the way out.
    session.notify("clear", None).await;

    session.terminate();
    session.terminated().await;
    Ok(())
}
