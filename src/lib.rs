//! A small Rust client for the UK government coronavirus data API
//! (`https://api.coronavirus.data.gov.uk`).
//!
//! The client builds a `GET /data` request from a structure descriptor, a
//! response format and a set of filters, then hands the response back:
//! JSON responses are unwrapped from their pagination envelope, CSV responses
//! are streamed through untouched.
//!
//! ## Quick start
//! - Create a [`Client`]; [`ClientOption`]s override the base path or transport.
//! - Call [`Client::get_data`] with an area type and any further filters.
//! - Pass a [`Context`] to cancel the call or give it a deadline.
//!
//! ```no_run
//! use anyhow::Result;
//! use covidapi::{AreaType, Client, Context, Filter, Format, Structure};
//! use std::io::Read;
//!
//! fn main() -> Result<()> {
//!     let client = Client::new()?;
//!     let structure = Structure::new()
//!         .field("date", "date")
//!         .field("areaName", "areaName")
//!         .field("newCases", "newCasesByPublishDate");
//!     let mut data = client.get_data(
//!         &Context::background(),
//!         &structure,
//!         Format::Json,
//!         AreaType::Utla,
//!         &[Filter::area_name("lewisham")],
//!     )?;
//!     let mut json = String::new();
//!     data.read_to_string(&mut json)?;
//!     println!("{}", json);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod client;
mod context;
mod error;
mod filter;
mod format;
mod response;
mod structure;
mod util;

pub use client::{API_VERSION, Client, ClientConfig, ClientOption, DEFAULT_BASEPATH};
pub use context::Context;
pub use error::Error;
pub use filter::{AreaType, Filter, Filters};
pub use format::Format;
pub use response::{BodyReader, DataStream, Page, Pagination};
pub use structure::Structure;
pub use tokio_util::sync::CancellationToken;
