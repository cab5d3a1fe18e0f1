use clickhouse_http_stream::{ClickHouseClient, ClientConfig, Compression};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
struct User {
    id: u32,
    name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let host = std::env::var("CLICKHOUSE_HOST").unwrap_or_else(|_| "localhost".to_owned());
    let password = std::env::var("CLICKHOUSE_PASSWORD").unwrap_or_default();

    let db = ClickHouseClient::new(
        ClientConfig::new(host, 8123)
            .with_credentials("default", password)
            .with_compression(Compression::Brotli),
    );

    let mut ack = db.execute(
        "CREATE TABLE IF NOT EXISTS users (id UInt32, name String) ENGINE = MergeTree ORDER BY id",
    );
    while let Some(chunk) = ack.next().await {
        chunk?;
    }

    let users = [
        User {
            id: 1,
            name: "Kit".to_owned(),
        },
        User {
            id: 2,
            name: "Ada".to_owned(),
        },
    ];
    let mut ack = db.insert("users", &users);
    while let Some(chunk) = ack.next().await {
        chunk?;
    }

    let mut rows = db.query::<User>("SELECT id, name FROM users ORDER BY id");
    while let Some(row) = rows.next().await {
        println!("{:?}", row?);
    }

    Ok(())
}
