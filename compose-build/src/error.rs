use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("service {service:?}: build: secret {secret:?} is undefined")]
    UnresolvedSecret { service: String, secret: String },

    #[error("service {service:?}: build: context must be specified")]
    MissingBuildContext { service: String },

    #[error("service {service:?}: build: URL-style context ({context:?}) is not supported")]
    UnsupportedContext { service: String, context: String },

    #[error("secret {secret:?} has no file, only file based secrets can be used when building")]
    SecretWithoutFile { secret: String },

    #[error("the path {path:?} is not valid utf-8")]
    NonUtf8Path { path: PathBuf },

    #[error("unknown service {service:?}")]
    UnknownService { service: String },

    #[error("couldn't read compose file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("compose file {path:?} has no parent directory")]
    NoParentDirectory { path: PathBuf },

    #[error("couldn't parse compose file")]
    Yaml(#[from] serde_yaml::Error),

    #[error("couldn't determine the project name")]
    MissingProjectName,
}
