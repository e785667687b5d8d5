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
use bytes::Bytes;
use edge_module_utils::pingora::{Error, ErrorType, RequestHeader, ResponseHeader, Session};
use edge_module_utils::standard_response::error_page;
use edge_module_utils::{RequestFilter, RequestFilterResult};
use http::{header, Method, StatusCode};
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::sync::Arc;

use crate::configuration::OriginConf;
use crate::directory::DirectoryStore;
use crate::key::object_key;
use crate::store::{OriginStore, StoredObject};

/// Response produced for a request, not yet written to the session
#[derive(Debug)]
pub struct OriginResponse {
    /// Response header
    pub header: ResponseHeader,
    /// Response body, empty for `HEAD` requests and bodiless responses
    pub body: Bytes,
}

impl OriginResponse {
    fn error(status: StatusCode, method: &Method) -> Result<Self, Box<Error>> {
        let (header, body) = error_page(status)?;
        let body = if method == Method::HEAD {
            Bytes::new()
        } else {
            body
        };
        Ok(Self { header, body })
    }
}

/// Handler for Pingora’s `request_filter` phase
#[derive(Debug)]
pub struct OriginStoreHandler {
    conf: OriginConf,
    missing_status: StatusCode,
    store: Option<Arc<dyn OriginStore>>,
}

fn missing_status(conf: &OriginConf) -> Result<StatusCode, Box<Error>> {
    match StatusCode::from_u16(conf.missing_object_status) {
        Ok(status) if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN => {
            Ok(status)
        }
        _ => Err(Error::explain(
            ErrorType::InternalError,
            format!(
                "missing object status has to be 403 or 404, got {}",
                conf.missing_object_status
            ),
        )),
    }
}

impl TryFrom<OriginConf> for OriginStoreHandler {
    type Error = Box<Error>;

    fn try_from(conf: OriginConf) -> Result<Self, Self::Error> {
        let missing_status = missing_status(&conf)?;

        let store = if let Some(root) = &conf.origin_root {
            let store = DirectoryStore::new(root).map_err(|err| {
                Error::because(
                    ErrorType::InternalError,
                    format!("Failed accessing origin root {root:?}"),
                    err,
                )
            })?;
            let store: Arc<dyn OriginStore> = Arc::new(store);
            Some(store)
        } else {
            None
        };

        debug!("Initialized origin store handler, settings: {conf:#?}");
        Ok(Self {
            conf,
            missing_status,
            store,
        })
    }
}

impl OriginStoreHandler {
    /// Creates a handler serving objects from the given store. The `origin_root` setting is
    /// ignored.
    pub fn with_store(conf: OriginConf, store: Arc<dyn OriginStore>) -> Result<Self, Box<Error>> {
        let missing_status = missing_status(&conf)?;
        Ok(Self {
            conf,
            missing_status,
            store: Some(store),
        })
    }

    /// Provides read-only access to the handler’s configuration.
    pub fn conf(&self) -> &OriginConf {
        &self.conf
    }

    /// The store objects are served from, if configured
    pub fn store(&self) -> Option<&Arc<dyn OriginStore>> {
        self.store.as_ref()
    }

    fn object_header(
        &self,
        status: StatusCode,
        object: &StoredObject,
    ) -> Result<ResponseHeader, Box<Error>> {
        let mut header = ResponseHeader::build(status, Some(6))?;
        if status == StatusCode::OK {
            header.append_header(header::CONTENT_LENGTH, object.size().to_string())?;
            header.append_header(header::CONTENT_TYPE, &object.content_type)?;
        }
        if let Some(modified) = object.modified() {
            header.append_header(header::LAST_MODIFIED, modified)?;
        }
        header.append_header(header::ETAG, object.etag())?;
        if let Some(cache_control) = object
            .cache_control
            .as_ref()
            .or(self.conf.cache_control.as_ref())
        {
            header.append_header(header::CACHE_CONTROL, cache_control)?;
        }
        Ok(header)
    }

    /// Produces the response for a request, looking up the object named by its path. This will
    /// never produce a redirect.
    ///
    /// An error is only returned if the response header cannot be built.
    pub fn respond(
        &self,
        store: &dyn OriginStore,
        request: &RequestHeader,
    ) -> Result<OriginResponse, Box<Error>> {
        let method = &request.method;
        let path = request.uri.path();

        if method != Method::GET && method != Method::HEAD {
            warn!("Denying method {method}");
            return OriginResponse::error(StatusCode::METHOD_NOT_ALLOWED, method);
        }

        let key = match object_key(path) {
            Ok(key) => key,
            Err(_) => {
                warn!("rejecting invalid path {path}");
                return OriginResponse::error(StatusCode::BAD_REQUEST, method);
            }
        };
        debug!("translated path {path} into object key {key}");

        let object = match store.get(&key) {
            Ok(Some(object)) => object,
            Ok(None) => {
                info!("object {key} not found, responding with {}", self.missing_status);
                return OriginResponse::error(self.missing_status, method);
            }
            Err(err) => {
                let status = match err.kind() {
                    ErrorKind::InvalidInput | ErrorKind::InvalidData => {
                        warn!("object key {key} resolves outside the origin store");
                        StatusCode::BAD_REQUEST
                    }
                    ErrorKind::PermissionDenied => {
                        debug!("looking up object {key} resulted in PermissionDenied error");
                        StatusCode::FORBIDDEN
                    }
                    _ => {
                        warn!("failed looking up object {key}: {err}");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                return OriginResponse::error(status, method);
            }
        };

        if object.is_not_modified(&request.headers) {
            debug!("If-None-Match/If-Modified-Since check resulted in Not Modified");
            return Ok(OriginResponse {
                header: self.object_header(StatusCode::NOT_MODIFIED, &object)?,
                body: Bytes::new(),
            });
        }

        let header = self.object_header(StatusCode::OK, &object)?;
        let body = if method == Method::HEAD {
            Bytes::new()
        } else {
            object.body
        };
        Ok(OriginResponse { header, body })
    }
}

#[async_trait]
impl RequestFilter for OriginStoreHandler {
    type Conf = OriginConf;
    type CTX = ();
    fn new_ctx() -> Self::CTX {}

    async fn request_filter(
        &self,
        session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<RequestFilterResult, Box<Error>> {
        let store = match &self.store {
            Some(store) => store,
            None => return Ok(RequestFilterResult::Unhandled),
        };

        let response = self.respond(store.as_ref(), session.req_header())?;
        let send_body = !response.body.is_empty();
        session
            .write_response_header(Box::new(response.header), !send_body)
            .await?;
        if send_body {
            session
                .write_response_body(Some(response.body), true)
                .await?;
        }

        Ok(RequestFilterResult::ResponseSent)
    }
}
