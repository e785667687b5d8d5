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

//! # Edge module helpers
//!
//! This crate contains the pieces shared by the modules of the static site edge server: the
//! [`RequestFilter`] trait implemented by every handler, macros chaining handlers and merging
//! their configuration and command line options, YAML configuration loading and a few Pingora
//! helpers.

pub mod pingora;
pub mod standard_response;

use async_trait::async_trait;
use log::trace;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::fmt::Debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::pingora::{Error, ErrorType, Session};

#[doc(hidden)]
pub use async_trait as __async_trait;

/// Request filter result indicating how the current request should be processed further
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum RequestFilterResult {
    /// Response has been sent, no further processing should happen. Other Pingora phases should
    /// not be triggered.
    ResponseSent,

    /// Request has been handled and further request filters should not run. Response hasn’t been
    /// sent however, next Pingora phase should deal with that.
    Handled,

    /// Request filter could not handle this request, next request filter should run if it exists.
    #[default]
    Unhandled,
}

/// Trait to be implemented by request filters.
#[async_trait]
pub trait RequestFilter {
    /// Configuration type of this handler.
    type Conf;

    /// Per-request state of this handler, see `ProxyHttp::CTX`
    type CTX;

    /// Creates a new instance of the handler from its configuration.
    fn new(conf: Self::Conf) -> Result<Self, Box<Error>>
    where
        Self: Sized,
        Self::Conf: TryInto<Self, Error = Box<Error>>,
    {
        conf.try_into()
    }

    /// Creates a new state object, see `ProxyHttp::new_ctx`
    fn new_ctx() -> Self::CTX;

    /// Handles the current request.
    ///
    /// This is essentially identical to the `request_filter` method but is supposed to be called
    /// when there is only a single handler. Consequently, its result can be returned directly.
    async fn handle(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool, Box<Error>>
    where
        Self::CTX: Send,
    {
        let result = self.request_filter(session, ctx).await?;
        Ok(result == RequestFilterResult::ResponseSent)
    }

    /// Handler to run during Pingora’s `request_filter` state. This uses a different return type
    /// to account for the existence of multiple request filters.
    async fn request_filter(
        &self,
        session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> Result<RequestFilterResult, Box<Error>>;
}

/// Trait for configuration structures that can be loaded from YAML files. This trait has a blanket
/// implementation for any structure implementing [`serde::Deserialize`].
pub trait FromYaml {
    /// Loads configuration from a YAML string.
    fn from_yaml(yaml: impl AsRef<str>) -> Result<Self, Box<Error>>
    where
        Self: Sized;

    /// Loads configuration from a YAML file.
    fn load_from_yaml<P>(path: P) -> Result<Self, Box<Error>>
    where
        P: AsRef<Path>,
        Self: Sized;

    /// Loads configuration from a list of YAML files. Top-level settings of later files override
    /// the ones found in earlier files. An empty list produces the configuration defaults.
    fn load_from_files<P>(paths: &[P]) -> Result<Self, Box<Error>>
    where
        P: AsRef<Path>,
        Self: Sized;
}

fn read_yaml_value(path: &Path) -> Result<Value, Box<Error>> {
    let file = File::open(path).map_err(|err| {
        Error::because(
            ErrorType::FileOpenError,
            format!("failed opening configuration file {path:?}"),
            err,
        )
    })?;
    let reader = BufReader::new(file);

    serde_yaml::from_reader(reader).map_err(|err| {
        Error::because(
            ErrorType::FileReadError,
            format!("failed reading configuration file {path:?}"),
            err,
        )
    })
}

fn parse_value<D>(value: Value) -> Result<D, Box<Error>>
where
    D: DeserializeOwned + Debug,
{
    let conf = serde_yaml::from_value(value).map_err(|err| {
        Error::because(
            ErrorType::FileReadError,
            "failed parsing configuration",
            err,
        )
    })?;
    trace!("Loaded configuration: {conf:#?}");
    Ok(conf)
}

impl<D> FromYaml for D
where
    D: DeserializeOwned + Debug + ?Sized,
{
    fn from_yaml(yaml: impl AsRef<str>) -> Result<Self, Box<Error>> {
        let yaml = yaml.as_ref();
        let value = if yaml.trim().is_empty() {
            Value::Mapping(Mapping::new())
        } else {
            serde_yaml::from_str(yaml).map_err(|err| {
                Error::because(
                    ErrorType::FileReadError,
                    "failed reading configuration",
                    err,
                )
            })?
        };
        parse_value(value)
    }

    fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<Error>> {
        parse_value(read_yaml_value(path.as_ref())?)
    }

    fn load_from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, Box<Error>> {
        let mut merged = Mapping::new();
        for path in paths {
            match read_yaml_value(path.as_ref())? {
                Value::Mapping(mapping) => {
                    for (key, value) in mapping {
                        merged.insert(key, value);
                    }
                }
                Value::Null => {}
                _ => {
                    return Err(Error::explain(
                        ErrorType::FileReadError,
                        format!(
                            "configuration file {:?} does not contain a mapping",
                            path.as_ref()
                        ),
                    ))
                }
            }
        }
        parse_value(Value::Mapping(merged))
    }
}

/// This macro merges multiple structures implementing `clap::Parser` into a structure containing
/// all of them while making certain that all command line flags can be used.
///
/// ```rust
/// use clap::Parser;
/// use edge_module_utils::merge_opt;
///
/// #[derive(Debug, Default, Parser)]
/// struct ListenOpt {
///     /// IP address and port for the server to listen on
///     #[clap(long)]
///     listen: Option<String>,
/// }
///
/// #[derive(Debug, Default, Parser)]
/// struct RootOpt {
///     /// Directory to serve
///     #[clap(long)]
///     root: Option<String>,
/// }
///
/// merge_opt! {
///     /// Starts my great application.
///     struct Opt {
///         listen: ListenOpt,
///         root: RootOpt,
///     }
/// }
///
/// let opt = Opt::parse_from(["app", "--listen", "127.0.0.1:8080"]);
/// assert_eq!(opt.listen.listen.as_deref(), Some("127.0.0.1:8080"));
/// assert!(opt.root.root.is_none());
/// ```
#[macro_export]
macro_rules! merge_opt {
    (
        $(#[$struct_attr:meta])*
        $struct_vis:vis struct $struct_name:ident
        {
            $(
                $(#[$field_attr:meta])*
                $field_vis:vis $field_name:ident: $field_type:ty,
            )*
        }
    ) => {
        $(#[$struct_attr])*
        #[derive(::std::fmt::Debug, ::clap::Parser)]
        $struct_vis struct $struct_name
        {
            $(
                #[command(flatten)]
                $(#[$field_attr])*
                $field_vis $field_name: $field_type,
            )*
        }
    }
}

/// This macro merges multiple structures implementing [`serde::Deserialize`] and [`Default`] into
/// a structure containing all of them.
///
/// The structure of the expected configuration file is flattened, so that the configuration
/// settings from each component are still expected to be found on the top level.
///
/// ```rust
/// use edge_module_utils::{merge_conf, FromYaml};
/// use serde::Deserialize;
///
/// #[derive(Debug, Default, Deserialize)]
/// #[serde(default)]
/// struct ListenConf {
///     listen: Vec<String>,
/// }
///
/// #[derive(Debug, Default, Deserialize)]
/// #[serde(default)]
/// struct RootConf {
///     root: Option<String>,
/// }
///
/// merge_conf! {
///     struct Conf {
///         listen: ListenConf,
///         root: RootConf,
///     }
/// }
///
/// let conf = Conf::from_yaml("listen: [127.0.0.1:8080]\nroot: /var/www").unwrap();
/// assert_eq!(conf.listen.listen, vec!["127.0.0.1:8080".to_owned()]);
/// assert_eq!(conf.root.root.as_deref(), Some("/var/www"));
/// ```
#[macro_export]
macro_rules! merge_conf {
    (
        $(#[$struct_attr:meta])*
        $struct_vis:vis struct $struct_name:ident
        {
            $(
                $(#[$field_attr:meta])*
                $field_vis:vis $field_name:ident: $field_type:ty,
            )*
        }
    ) => {
        $(#[$struct_attr])*
        #[derive(::std::fmt::Debug, ::std::default::Default, ::serde::Deserialize)]
        #[serde(default)]
        $struct_vis struct $struct_name
        {
            $(
                #[serde(flatten)]
                $(#[$field_attr])*
                $field_vis $field_name: $field_type,
            )*
        }
    }
}

/// This macro chains multiple handlers implementing [`RequestFilter`] and merges their respective
/// configurations.
///
/// The handlers will be called in the order in which they are listed. Each handler can prevent the
/// subsequent handlers from being called by returning [`RequestFilterResult::ResponseSent`] or
/// [`RequestFilterResult::Handled`].
///
/// The merged configuration type is available as `<Handler as RequestFilter>::Conf`. Only one
/// chain can be declared per module.
#[macro_export]
macro_rules! chain_handlers {
    (
        $(#[$struct_attr:meta])*
        $struct_vis:vis struct $struct_name:ident
        {
            $(
                $(#[$field_attr:meta])*
                $field_vis:vis $field_name:ident: $field_type:ty,
            )*
        }
    ) => {
        $(#[$struct_attr])*
        #[derive(::std::fmt::Debug)]
        $struct_vis struct $struct_name
        {
            $(
                $(#[$field_attr])*
                $field_vis $field_name: $field_type,
            )*
        }

        $crate::merge_conf! {
            /// Merged handler configuration
            $struct_vis struct __Conf
            {
                $(
                    $field_vis $field_name: <$field_type as $crate::RequestFilter>::Conf,
                )*
            }
        }

        /// Merged handler context
        #[derive(::std::fmt::Debug)]
        $struct_vis struct __CTX
        {
            $(
                $field_vis $field_name: <$field_type as $crate::RequestFilter>::CTX,
            )*
        }

        impl ::std::convert::TryFrom<__Conf> for $struct_name {
            type Error = ::std::boxed::Box<$crate::pingora::Error>;

            fn try_from(conf: __Conf) -> ::std::result::Result<Self, Self::Error> {
                $(
                    let $field_name = <$field_type>::try_from(conf.$field_name)?;
                )*
                ::std::result::Result::Ok(Self {
                    $(
                        $field_name,
                    )*
                })
            }
        }

        #[$crate::__async_trait::async_trait]
        impl $crate::RequestFilter for $struct_name {
            type Conf = __Conf;
            type CTX = __CTX;

            fn new_ctx() -> Self::CTX {
                $(
                    let $field_name = <$field_type as $crate::RequestFilter>::new_ctx();
                )*
                Self::CTX {
                    $(
                        $field_name,
                    )*
                }
            }

            async fn request_filter(
                &self,
                _session: &mut $crate::pingora::Session,
                _ctx: &mut Self::CTX,
            ) -> ::std::result::Result<
                $crate::RequestFilterResult,
                ::std::boxed::Box<$crate::pingora::Error>,
            > {
                $(
                    let result = $crate::RequestFilter::request_filter(
                        &self.$field_name,
                        _session,
                        &mut _ctx.$field_name,
                    )
                    .await?;
                    if result != $crate::RequestFilterResult::Unhandled {
                        return ::std::result::Result::Ok(result);
                    }
                )*
                ::std::result::Result::Ok($crate::RequestFilterResult::Unhandled)
            }
        }
    }
}
