use anyhow::{Context as _, Result};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client as HttpClient, Response};
use serde::Serialize;
use std::sync::Arc;
use tokio::runtime::{Builder as RuntimeBuilder, Runtime};
use tracing::{debug, trace};

use crate::context::Context;
use crate::error::Error;
use crate::filter::{AreaType, Filter, Filters};
use crate::format::Format;
use crate::response::{BodyReader, DataStream, Page};
use crate::util::urljoin;

/// Base path used to make requests, before the API version is appended.
pub const DEFAULT_BASEPATH: &str = "https://api.coronavirus.data.gov.uk";

/// Version segment appended to [`DEFAULT_BASEPATH`] by every new client.
pub const API_VERSION: &str = "v1";

const ACCEPTS: &str = "application/json; application/xml; text/csv; application/vnd.PHE-COVID19.v1+json; application/vnd.PHE-COVID19.v1+xml";

/// A single configuration step, applied in order on top of the defaults.
#[derive(Debug, Clone)]
pub enum ClientOption {
    /// Replaces the base path used for all requests. No version segment is
    /// appended to it.
    Basepath(String),
    /// Replaces the HTTP transport.
    HttpClient(HttpClient),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base path, e.g. `https://api.coronavirus.data.gov.uk/v1`.
    pub basepath: String,
    /// Transport; `None` builds the default one.
    pub http: Option<HttpClient>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            basepath: urljoin(DEFAULT_BASEPATH, API_VERSION),
            http: None,
        }
    }
}

impl ClientConfig {
    pub fn apply(mut self, option: ClientOption) -> Self {
        match option {
            ClientOption::Basepath(basepath) => self.basepath = basepath,
            ClientOption::HttpClient(http) => self.http = Some(http),
        }
        self
    }
}

/// Client for the coronavirus data API.
///
/// Configuration is fixed once built. Each call builds its own request, so a
/// client can be shared across threads and reused for many requests.
///
/// Calls block the current thread. The client drives its transport on a
/// runtime it owns, so it must not be used from inside another async runtime.
#[derive(Debug, Clone)]
pub struct Client {
    basepath: String,
    http: HttpClient,
    rt: Arc<Runtime>,
}

impl Client {
    /// Creates a v1 client with the default base path and transport.
    pub fn new() -> Result<Self> {
        Self::with_options(std::iter::empty())
    }

    /// Applies `options` in order on top of the defaults. Later options
    /// override earlier ones.
    pub fn with_options(options: impl IntoIterator<Item = ClientOption>) -> Result<Self> {
        let cfg = options
            .into_iter()
            .fold(ClientConfig::default(), ClientConfig::apply);
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: ClientConfig) -> Result<Self> {
        let http = match cfg.http {
            Some(http) => http,
            None => default_http_client()?,
        };
        let rt = RuntimeBuilder::new_multi_thread()
            .worker_threads(1)
            .thread_name("covidapi-io")
            .enable_all()
            .build()
            .context("failed to build async runtime")?;
        Ok(Self {
            basepath: cfg.basepath,
            http,
            rt: Arc::new(rt),
        })
    }

    pub fn with_basepath(mut self, basepath: impl Into<String>) -> Self {
        self.basepath = basepath.into();
        self
    }

    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    pub fn basepath(&self) -> &str {
        &self.basepath
    }

    /// Fetches `GET /data` for `area_type` and any further `filters`.
    ///
    /// - `Format::Json`: the envelope is decoded and only its `data` payload is
    ///   returned, buffered in memory.
    /// - `Format::Csv`: the response body is returned as is, still streaming
    ///   from the server. The connection is held until the stream is dropped.
    /// - any other format fails with [`Error::UnsupportedFormat`] once the
    ///   response arrives.
    ///
    /// Non-2xx responses fail with [`Error::Status`]. The call gives up with
    /// [`Error::Cancelled`] or [`Error::DeadlineExceeded`] when `ctx` fires.
    ///
    /// ```no_run
    /// use covidapi::{AreaType, Client, Context, Filter, Format, Structure};
    /// use std::io::Read;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let client = Client::new()?;
    /// let structure = Structure::new()
    ///     .field("date", "date")
    ///     .field("newCases", "newCasesByPublishDate");
    /// let mut data = client.get_data(
    ///     &Context::background(),
    ///     &structure,
    ///     Format::Csv,
    ///     AreaType::Nation,
    ///     &[Filter::area_name("england")],
    /// )?;
    /// let mut csv = String::new();
    /// data.read_to_string(&mut csv)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_data<S: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        structure: &S,
        format: Format,
        area_type: AreaType,
        filters: &[Filter],
    ) -> Result<DataStream> {
        let req = self.request(structure, format, area_type, filters)?;
        self.rt.block_on(self.fetch_data(ctx, req, format))
    }

    /// Fetches one JSON page of `GET /data`, envelope included.
    ///
    /// Only the page the server returns is read; pagination links are left
    /// for the caller.
    pub fn get_page<S: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        structure: &S,
        area_type: AreaType,
        filters: &[Filter],
    ) -> Result<Page> {
        let req = self.request(structure, Format::Json, area_type, filters)?;
        self.rt.block_on(self.fetch_page(ctx, req))
    }

    async fn fetch_data(
        &self,
        ctx: &Context,
        req: reqwest::Request,
        format: Format,
    ) -> Result<DataStream> {
        let response = send(ctx, &self.http, req).await?;

        match format {
            Format::Json => {
                let page = read_page(ctx, response).await?;
                Ok(DataStream::buffered(page.payload().to_vec()))
            }
            Format::Csv => Ok(DataStream::Streaming(BodyReader::new(
                response,
                self.rt.clone(),
            ))),
            other => {
                drop(response);
                Err(Error::UnsupportedFormat(other).into())
            }
        }
    }

    async fn fetch_page(&self, ctx: &Context, req: reqwest::Request) -> Result<Page> {
        let response = send(ctx, &self.http, req).await?;
        read_page(ctx, response).await
    }

    fn request<S: Serialize + ?Sized>(
        &self,
        structure: &S,
        format: Format,
        area_type: AreaType,
        filters: &[Filter],
    ) -> Result<reqwest::Request> {
        let url = urljoin(&self.basepath, "data");

        let structure =
            serde_json::to_string(structure).context("failed to serialize structure")?;

        // The area type always goes last.
        let mut filters: Filters = filters.iter().cloned().collect();
        filters.push(area_type);
        let filters = filters.as_parameter();

        debug!(%url, %format, %filters, "requesting data");
        self.http
            .get(&url)
            .header("Accepts", ACCEPTS)
            .header(CONTENT_TYPE, "application/json")
            .query(&[
                ("format", format.as_str()),
                ("structure", structure.as_str()),
                ("filters", filters.as_str()),
            ])
            .build()
            .with_context(|| format!("failed to build request for {}", url))
    }
}

async fn send(ctx: &Context, http: &HttpClient, req: reqwest::Request) -> Result<Response> {
    let url = req.url().clone();
    let resp = ctx
        .run(http.execute(req))
        .await?
        .with_context(|| format!("request to {} failed", url))?;

    let status = resp.status();
    debug!(%status, "response received");
    if !status.is_success() {
        let mut url = url;
        url.set_query(None);
        return Err(Error::Status {
            status,
            url: url.to_string(),
        }
        .into());
    }

    Ok(resp)
}

async fn read_page(ctx: &Context, response: Response) -> Result<Page> {
    let body = ctx
        .run(response.bytes())
        .await?
        .context("failed to read response body")?;

    let page: Page =
        serde_json::from_slice(&body).context("failed to parse response envelope")?;
    trace!(
        length = page.length,
        max_page_limit = page.max_page_limit,
        next = ?page.pagination.next,
        "decoded page"
    );
    Ok(page)
}

fn default_http_client() -> Result<HttpClient> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("covidapi-rs/{}", env!("CARGO_PKG_VERSION")))
            .unwrap_or(HeaderValue::from_static("covidapi-rs")),
    );

    // The caller's context is the only deadline.
    HttpClient::builder()
        .default_headers(default_headers)
        .build()
        .context("failed to build HTTP client")
}
