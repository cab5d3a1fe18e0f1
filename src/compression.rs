use std::{io, pin::Pin};

use async_compression::tokio::bufread::BrotliDecoder;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::header::{self, HeaderMap, HeaderValue};
use tokio_util::io::{ReaderStream, StreamReader};

use crate::{ClickHouseError, Compression, Result};

pub(crate) type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Extra request headers needed to negotiate `compression`.
pub fn headers_for(compression: Compression) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(token) = compression.encoding_token() {
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static(token));
    }
    headers
}

/// Hook applied to a raw response body before it is decoded.
///
/// The transport decodes gzip and deflate itself, so only brotli needs a
/// client-side decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseTransform {
    PassThrough,
    Brotli,
}

impl ResponseTransform {
    pub fn for_compression(compression: Compression) -> Self {
        match compression {
            Compression::Brotli => Self::Brotli,
            Compression::None | Compression::Gzip | Compression::Deflate => Self::PassThrough,
        }
    }

    pub(crate) fn apply(self, response: reqwest::Response) -> ByteStream {
        let brotli_encoded = self == Self::Brotli
            && response
                .headers()
                .get(header::CONTENT_ENCODING)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.trim().eq_ignore_ascii_case("br"));

        decode_body(response.bytes_stream(), brotli_encoded)
    }
}

fn decode_body<S>(body: S, brotli_encoded: bool) -> ByteStream
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    if !brotli_encoded {
        return Box::pin(body.map_err(ClickHouseError::Transport));
    }

    let reader = StreamReader::new(body.map_err(io::Error::other));
    Box::pin(ReaderStream::new(BrotliDecoder::new(reader)).map_err(classify_io_error))
}

// Transport failures reach us wrapped in io::Error by the StreamReader.
fn classify_io_error(err: io::Error) -> ClickHouseError {
    if !err
        .get_ref()
        .is_some_and(|inner| inner.is::<reqwest::Error>())
    {
        return ClickHouseError::Decompress(err);
    }

    let kind = err.kind();
    match err.into_inner().map(|inner| inner.downcast::<reqwest::Error>()) {
        Some(Ok(inner)) => ClickHouseError::Transport(*inner),
        Some(Err(other)) => ClickHouseError::Decompress(io::Error::new(kind, other)),
        None => ClickHouseError::Decompress(io::Error::from(kind)),
    }
}
