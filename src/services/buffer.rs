//! Drain a byte stream into a single in-memory buffer.

use crate::services::object_store::ByteStream;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::io;

/// Collect every chunk of `stream` into one contiguous buffer.
///
/// The first chunk error aborts collection and is returned as-is.
pub async fn collect_stream(mut stream: ByteStream) -> io::Result<Bytes> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer.freeze())
}
