//! Minimal client: one framed request, one framed reply per connection.

use serde_json::{json, Value};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::codec::{read_json, within, write_json, FramingError};
use crate::config::ConnectionOptions;

pub async fn exchange<A>(
    addr: A,
    request: &Value,
    options: ConnectionOptions,
) -> Result<Value, FramingError>
where
    A: ToSocketAddrs,
{
    let mut stream = within(options.io_timeout, async {
        TcpStream::connect(addr).await.map_err(FramingError::from)
    })
    .await?;
    within(options.io_timeout, write_json(&mut stream, request)).await?;
    within(
        options.io_timeout,
        read_json(&mut stream, options.max_frame_bytes),
    )
    .await
}

pub async fn ask<A>(addr: A, query: &str) -> Result<Value, FramingError>
where
    A: ToSocketAddrs,
{
    exchange(addr, &json!({ "query": query }), ConnectionOptions::default()).await
}

pub async fn request_quiz<A>(addr: A, title: &str, notes: Option<&str>) -> Result<Value, FramingError>
where
    A: ToSocketAddrs,
{
    let mut request = json!({ "title": title });
    if let (Some(notes), Some(fields)) = (notes, request.as_object_mut()) {
        fields.insert("notes".to_string(), Value::String(notes.to_string()));
    }
    exchange(addr, &request, ConnectionOptions::default()).await
}
