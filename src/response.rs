use bytes::Bytes;
use reqwest::Response;
use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue;
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// One page of a JSON-format response.
///
/// The API wraps the requested rows in this envelope. Pagination links are
/// exposed as returned but are never followed by the client.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub max_page_limit: u64,
    /// The payload, byte-for-byte as the server sent it. `None` when the
    /// envelope has no `data` member; an explicit `null` is kept as is.
    #[serde(default, deserialize_with = "present")]
    pub data: Option<Box<RawValue>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pagination: Pagination,
}

impl Page {
    /// The raw payload bytes; empty when the envelope carried no `data`.
    pub fn payload(&self) -> &[u8] {
        match &self.data {
            Some(raw) => raw.get().as_bytes(),
            None => &[],
        }
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Box<RawValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    Box::<RawValue>::deserialize(deserializer).map(Some)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub first: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub last: Option<String>,
}

/// Response data returned by [`Client::get_data`](crate::Client::get_data).
///
/// `Buffered` holds a JSON payload in memory; the connection has already been
/// released. `Streaming` is the live CSV response body: the connection stays
/// open until the stream is dropped, so keep its scope tight.
#[derive(Debug)]
pub enum DataStream {
    Buffered(Cursor<Vec<u8>>),
    Streaming(BodyReader),
}

/// Blocking reader over a response body still arriving from the server.
///
/// Must not be read from inside an async runtime.
#[derive(Debug)]
pub struct BodyReader {
    response: Response,
    chunk: Bytes,
    rt: Arc<Runtime>,
}

impl BodyReader {
    pub(crate) fn new(response: Response, rt: Arc<Runtime>) -> Self {
        Self {
            response,
            chunk: Bytes::new(),
            rt,
        }
    }
}

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.chunk.is_empty() {
            match self.rt.block_on(self.response.chunk()).map_err(io::Error::other)? {
                Some(chunk) => self.chunk = chunk,
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.chunk.len());
        buf[..n].copy_from_slice(&self.chunk.split_to(n));
        Ok(n)
    }
}

impl DataStream {
    pub(crate) fn buffered(bytes: Vec<u8>) -> Self {
        DataStream::Buffered(Cursor::new(bytes))
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, DataStream::Streaming(_))
    }
}

impl Read for DataStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            DataStream::Buffered(c) => c.read(buf),
            DataStream::Streaming(r) => r.read(buf),
        }
    }
}
