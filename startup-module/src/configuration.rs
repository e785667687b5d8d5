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

use clap::Parser;
use edge_module_utils::pingora::{http_proxy_service, ProxyHttp, Server, ServerConf, ServerOpt};
use serde::Deserialize;
use std::path::PathBuf;

/// Addresses the server listens on if none are configured
pub const DEFAULT_LISTEN: [&str; 2] = ["127.0.0.1:8080", "[::1]:8080"];

/// Run a web server
#[derive(Debug, Default, Parser)]
pub struct StartupOpt {
    /// Address and port to listen on, e.g. "127.0.0.1:8080". This command line flag can be
    /// specified multiple times.
    #[clap(short, long)]
    pub listen: Option<Vec<String>>,
    /// Use this flag to make the server run in the background.
    #[clap(short, long)]
    pub daemon: bool,
    /// Test the configuration and exit. This is useful to validate the configuration before
    /// restarting the process.
    #[clap(short, long)]
    pub test: bool,
    /// The path to the configuration file. This command line flag can be specified multiple times.
    #[clap(short, long)]
    pub conf: Option<Vec<PathBuf>>,
}

/// Configuration settings of the startup module
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StartupConf {
    /// List of address/port combinations to listen on, e.g. "127.0.0.1:8080".
    pub listen: Vec<String>,
    /// Pingora’s default server configuration options
    #[serde(flatten)]
    pub server: ServerConf,
}

impl StartupConf {
    /// Determines the addresses to listen on. Command line options take precedence over the
    /// configuration file.
    pub fn listen_addrs(&self, opt: &StartupOpt) -> Vec<String> {
        let listen = opt.listen.as_ref().unwrap_or(&self.listen);
        if listen.is_empty() {
            DEFAULT_LISTEN.iter().map(|addr| (*addr).to_owned()).collect()
        } else {
            listen.clone()
        }
    }

    /// Sets up a server with the given configuration and command line options
    pub fn into_server<SV>(self, app: SV, opt: Option<StartupOpt>) -> Server
    where
        SV: ProxyHttp + Send + Sync + 'static,
        <SV as ProxyHttp>::CTX: Send + Sync,
    {
        let opt = opt.unwrap_or_default();
        let listen = self.listen_addrs(&opt);

        let mut server = Server::new_with_opt_and_conf(
            ServerOpt {
                daemon: opt.daemon,
                test: opt.test,
                ..Default::default()
            },
            self.server,
        );
        server.bootstrap();

        let mut proxy = http_proxy_service(&server.configuration, app);
        for addr in &listen {
            proxy.add_tcp(addr);
        }
        server.add_service(proxy);

        server
    }
}
