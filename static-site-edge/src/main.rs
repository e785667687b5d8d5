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

//! # Static Site Edge
//!
//! A web server serving a static site the way a content delivery network with an edge function
//! would. Each request path is rewritten to its default document first (`/about/` and `/about`
//! both become `/about/index.html`), then the resulting object is looked up in the origin
//! directory. Missing objects result in `404 Not Found` or, to mirror a private storage bucket,
//! `403 Forbidden`.
//!
//! Configuration settings can be given in YAML files (`--conf`) or on the command line:
//!
//! ```yaml
//! listen:
//! - 127.0.0.1:8080
//! origin_root: /var/www/site
//! index_document: index.html
//! missing_object_status: 403
//! cache_control: no-cache
//! ```

use clap::Parser;
use edge_module_utils::pingora::{Error, Server};
use edge_module_utils::{chain_handlers, merge_conf, merge_opt, FromYaml, RequestFilter};
use index_rewrite_module::{IndexRewriteHandler, IndexRewriteOpt};
use log::error;
use origin_store_module::{OriginOpt, OriginStoreHandler};
use startup_module::{DefaultApp, StartupConf, StartupOpt};

chain_handlers! {
    struct Handler {
        index_rewrite: IndexRewriteHandler,
        origin: OriginStoreHandler,
    }
}

merge_opt! {
    /// Run the static site edge server
    struct Opt {
        startup: StartupOpt,
        index_rewrite: IndexRewriteOpt,
        origin: OriginOpt,
    }
}

merge_conf! {
    /// The configuration of the static site edge server
    struct Conf {
        startup: StartupConf,
        handler: <Handler as RequestFilter>::Conf,
    }
}

fn setup(opt: Opt) -> Result<Server, Box<Error>> {
    let mut conf = Conf::load_from_files(opt.startup.conf.as_deref().unwrap_or(&[]))?;

    conf.handler.index_rewrite.merge_with_opt(opt.index_rewrite);
    conf.handler.origin.merge_with_opt(opt.origin);

    let app = DefaultApp::<Handler>::from_conf(conf.handler)?;
    Ok(conf.startup.into_server(app, Some(opt.startup)))
}

fn main() {
    env_logger::init();

    match setup(Opt::parse()) {
        Ok(server) => server.run_forever(),
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    }
}
