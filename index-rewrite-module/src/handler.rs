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

//! Handler for the `request_filter` phase.

use async_trait::async_trait;
use edge_module_utils::pingora::{Error, ErrorType, Session};
use edge_module_utils::{RequestFilter, RequestFilterResult};
use http::uri::{PathAndQuery, Uri};
use log::{debug, trace};
use std::borrow::Cow;

use crate::configuration::IndexRewriteConf;
use crate::normalize::normalize_path;

/// Handler for Pingora’s `request_filter` phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRewriteHandler {
    conf: IndexRewriteConf,
}

impl TryFrom<IndexRewriteConf> for IndexRewriteHandler {
    type Error = Box<Error>;

    fn try_from(conf: IndexRewriteConf) -> Result<Self, Self::Error> {
        let name = &conf.index_document;
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(Error::explain(
                ErrorType::InternalError,
                format!("index document {name:?} is not a valid file name"),
            ));
        }
        if !name.contains('.') {
            return Err(Error::explain(
                ErrorType::InternalError,
                format!("index document {name:?} needs a file extension"),
            ));
        }

        debug!("Initialized index rewrite handler, settings: {conf:#?}");
        Ok(Self { conf })
    }
}

impl IndexRewriteHandler {
    /// Provides read-only access to the handler’s configuration.
    pub fn conf(&self) -> &IndexRewriteConf {
        &self.conf
    }

    /// Determines the origin path for a request path using the configured default document.
    pub fn rewrite<'a>(&self, path: &'a str) -> Cow<'a, str> {
        normalize_path(path, &self.conf.index_document)
    }
}

/// Replaces the path of a URI, keeping scheme, authority and query string.
fn replace_path(uri: &Uri, path: &str) -> Result<Uri, Box<Error>> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_owned(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).map_err(|err| {
        Error::because(ErrorType::InternalError, "rewritten path is invalid", err)
    })?);
    Uri::from_parts(parts).map_err(|err| {
        Error::because(ErrorType::InternalError, "rewritten URI is invalid", err)
    })
}

#[async_trait]
impl RequestFilter for IndexRewriteHandler {
    type Conf = IndexRewriteConf;
    type CTX = ();
    fn new_ctx() -> Self::CTX {}

    async fn request_filter(
        &self,
        session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<RequestFilterResult, Box<Error>> {
        let uri = &session.req_header().uri;
        let path = uri.path();

        let uri = match self.rewrite(path) {
            Cow::Borrowed(_) => {
                trace!("path {path} names a file, not rewriting");
                return Ok(RequestFilterResult::Unhandled);
            }
            Cow::Owned(rewritten) => {
                debug!("rewriting {path} to {rewritten}");
                replace_path(uri, &rewritten)?
            }
        };
        session.req_header_mut().set_uri(uri);

        Ok(RequestFilterResult::Unhandled)
    }
}
