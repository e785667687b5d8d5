// Copyright 2024 Wladimir Palant
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Startup Module for the static site edge
//!
//! This crate helps configure and set up the Pingora server. It provides a [`StartupOpt`]
//! structure with command line options and a [`StartupConf`] structure with the configuration
//! file settings. [`StartupConf::into_server`] creates a server serving a Pingora app.
//!
//! [`DefaultApp`] is a Pingora app delegating the `request_filter` phase to a [`RequestFilter`]
//! handler. Requests the handler didn’t respond to are answered with `404 Not Found`. Each
//! request is logged at info level after it is done.
//!
//! ```rust
//! use clap::Parser;
//! use edge_module_utils::{merge_conf, merge_opt, FromYaml};
//! use index_rewrite_module::{IndexRewriteConf, IndexRewriteHandler, IndexRewriteOpt};
//! use startup_module::{DefaultApp, StartupConf, StartupOpt};
//!
//! merge_opt! {
//!     struct Opt {
//!         startup: StartupOpt,
//!         index_rewrite: IndexRewriteOpt,
//!     }
//! }
//!
//! merge_conf! {
//!     struct Conf {
//!         startup: StartupConf,
//!         index_rewrite: IndexRewriteConf,
//!     }
//! }
//!
//! let opt = Opt::parse_from(["edge", "--listen", "127.0.0.1:8080"]);
//! let mut conf = Conf::load_from_files(opt.startup.conf.as_deref().unwrap_or(&[])).unwrap();
//! conf.index_rewrite.merge_with_opt(opt.index_rewrite);
//!
//! let app = DefaultApp::<IndexRewriteHandler>::from_conf(conf.index_rewrite).unwrap();
//! let server = conf.startup.into_server(app, Some(opt.startup));
//!
//! // Do something with the server here, e.g. call server.run_forever()
//! ```

mod configuration;

pub use configuration::{StartupConf, StartupOpt, DEFAULT_LISTEN};

use async_trait::async_trait;
use edge_module_utils::pingora::{Error, ErrorType, HttpPeer, ProxyHttp, Session};
use edge_module_utils::RequestFilter;
use log::info;
use std::fmt::Debug;
use std::ops::{Deref, DerefMut};

struct NoDebug<T> {
    inner: T,
}

impl<T> Debug for NoDebug<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("skipped").finish()
    }
}

impl<T> From<T> for NoDebug<T> {
    fn from(value: T) -> Self {
        Self { inner: value }
    }
}

impl<T> Deref for NoDebug<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> DerefMut for NoDebug<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

/// Result of a test execution of the app
#[derive(Debug)]
pub struct AppResult {
    session: NoDebug<Session>,
    err: Option<Box<Error>>,
}

impl AppResult {
    /// Produces the resulting session state of the request
    pub fn session(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Retrieves the error if any
    pub fn err(&self) -> &Option<Box<Error>> {
        &self.err
    }

    /// Status code of the response written, if any
    pub fn status(&self) -> Option<u16> {
        self.session
            .response_written()
            .map(|header| header.status.as_u16())
    }
}

/// A basic Pingora app implementation, to be passed to [`StartupConf::into_server`]
///
/// This app will only handle the `request_filter`, `upstream_peer` and `logging` phases. The
/// `request_filter` phase is delegated to the handler, there is never an upstream peer.
#[derive(Debug)]
pub struct DefaultApp<H> {
    handler: H,
}

impl<H> DefaultApp<H> {
    /// Creates a new app from a [`RequestFilter`] instance.
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    /// Creates a new app from a [`RequestFilter`] configuration.
    ///
    /// Any errors occurring when converting configuration to handler will be passed on.
    pub fn from_conf<C>(conf: C) -> Result<Self, Box<Error>>
    where
        H: RequestFilter<Conf = C> + TryFrom<C, Error = Box<Error>>,
    {
        Ok(Self::new(conf.try_into()?))
    }

    /// Provides read-only access to the handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Handles all request phases for a request like Pingora would do it.
    ///
    /// This method is meant for testing. Requests that would need an upstream peer result in an
    /// `HTTPStatus(404)` error without a response being written, Pingora would produce the
    /// error page here.
    pub async fn handle_request(&self, mut session: Session) -> AppResult
    where
        H: RequestFilter + Send + Sync,
        H::CTX: Send + Sync,
    {
        let mut ctx = self.new_ctx();

        let result = match self.request_filter(&mut session, &mut ctx).await {
            Ok(false) => self
                .upstream_peer(&mut session, &mut ctx)
                .await
                .map(|_| ()),
            Ok(true) => Ok(()),
            Err(err) => Err(err),
        };

        self.logging(
            &mut session,
            result.as_ref().err().map(|err| err.as_ref()),
            &mut ctx,
        )
        .await;

        AppResult {
            session: session.into(),
            err: result.err(),
        }
    }
}

#[async_trait]
impl<H> ProxyHttp for DefaultApp<H>
where
    H: RequestFilter + Send + Sync,
    H::CTX: Send + Sync,
{
    type CTX = <H as RequestFilter>::CTX;

    fn new_ctx(&self) -> Self::CTX {
        H::new_ctx()
    }

    async fn request_filter(
        &self,
        session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> Result<bool, Box<Error>> {
        self.handler.handle(session, ctx).await
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>, Box<Error>> {
        Err(Error::new(ErrorType::HTTPStatus(404)))
    }

    async fn logging(&self, session: &mut Session, e: Option<&Error>, _ctx: &mut Self::CTX) {
        let status = session
            .response_written()
            .map(|header| header.status.as_u16())
            .or_else(|| match e.map(|e| &e.etype) {
                Some(ErrorType::HTTPStatus(status)) => Some(*status),
                _ => None,
            })
            .unwrap_or(0);
        let client = session
            .client_addr()
            .map_or_else(|| "-".to_owned(), ToString::to_string);
        let request = session.req_header();
        info!(
            "{client} \"{} {} {:?}\" {status}",
            request.method,
            request.uri,
            request.version
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use edge_module_utils::pingora::{create_test_session, RequestHeader, ResponseHeader};
    use edge_module_utils::RequestFilterResult;
    use http::StatusCode;
    use test_log::test;

    #[derive(Debug)]
    struct Handler {
        respond: bool,
    }

    #[async_trait]
    impl RequestFilter for Handler {
        type Conf = ();
        type CTX = ();
        fn new_ctx() -> Self::CTX {}

        async fn request_filter(
            &self,
            session: &mut Session,
            _ctx: &mut Self::CTX,
        ) -> Result<RequestFilterResult, Box<Error>> {
            if !self.respond {
                return Ok(RequestFilterResult::Unhandled);
            }

            let mut header = ResponseHeader::build(StatusCode::NO_CONTENT, None)?;
            header.append_header("X-Handled", "yes")?;
            session.write_response_header(Box::new(header), true).await?;
            Ok(RequestFilterResult::ResponseSent)
        }
    }

    async fn make_session(path: &str) -> Session {
        let header = RequestHeader::build("GET", path.as_bytes(), None).unwrap();
        create_test_session(header).await
    }

    #[test(tokio::test)]
    async fn handler_response() {
        let app = DefaultApp::new(Handler { respond: true });
        let mut result = app.handle_request(make_session("/").await).await;
        assert!(result.err().is_none());
        assert_eq!(result.status(), Some(204));
        assert_eq!(
            result
                .session()
                .response_written()
                .unwrap()
                .headers
                .get("X-Handled")
                .unwrap(),
            "yes"
        );
    }

    #[test(tokio::test)]
    async fn unhandled_is_not_found() {
        let app = DefaultApp::new(Handler { respond: false });
        let result = app.handle_request(make_session("/").await).await;
        assert_eq!(
            result.err().as_ref().map(|err| &err.etype),
            Some(&ErrorType::HTTPStatus(404))
        );
        assert!(result.status().is_none());
    }
}
