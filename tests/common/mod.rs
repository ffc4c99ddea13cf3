//! Fake coronavirus API for integration tests.
//!
//! `wiremock` runs its server on its own thread, so a blocking client can
//! call it from a plain `#[test]` while this runtime is only used to start
//! the server and mount stubs.

#![allow(dead_code)]

use covidapi::{Client, ClientOption};
use tokio::runtime::Runtime;
use wiremock::{Mock, MockServer};

pub use wiremock::ResponseTemplate;
pub use wiremock::matchers::{header, method, path, query_param};

// Declared first so the server shuts down before the runtime.
pub struct FakeApi {
    server: MockServer,
    rt: Runtime,
}

impl FakeApi {
    pub fn start() -> Self {
        let rt = Runtime::new().expect("tokio runtime");
        let server = rt.block_on(MockServer::start());
        Self { server, rt }
    }

    pub fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.server));
    }

    /// Base path of the fake server, standing in for `.../v1`.
    pub fn basepath(&self) -> String {
        format!("{}/v1", self.server.uri())
    }

    pub fn client(&self) -> Client {
        Client::with_options([ClientOption::Basepath(self.basepath())]).expect("client")
    }

    pub fn received(&self) -> Vec<wiremock::Request> {
        self.rt
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }
}
