use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap as Map,
    path::{Path, PathBuf},
};

use crate::services::ProjectModel;

/// An already loaded compose project. Nothing in here changes once the
/// frontend has produced it.
#[derive(Clone, Debug, Default)]
pub struct Project {
    pub name: String,
    pub working_dir: PathBuf,
    pub services: Map<String, Service>,
    pub secrets: Map<String, SecretConfig>,
}

impl Project {
    pub fn new<N, P>(name: N, working_dir: P) -> Project
    where
        N: Into<String>,
        P: Into<PathBuf>,
    {
        Project {
            name: name.into(),
            working_dir: working_dir.into(),
            ..Default::default()
        }
    }
}

impl ProjectModel for Project {
    fn name(&self) -> &str {
        &self.name
    }

    fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    fn secret(&self, name: &str) -> Option<&SecretConfig> {
        self.secrets.get(name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Service {
    pub name: String,
    pub image: Option<String>,
    pub pull_policy: Option<PullPolicy>,
    pub build: Option<BuildConfig>,
}

#[derive(Clone, Debug, Default)]
pub struct BuildConfig {
    pub context: Option<String>,
    pub dockerfile: Option<String>,
    pub dockerfile_inline: Option<String>,
    /// Build arguments, `None` means the value is taken from the builder's environment.
    pub args: Map<String, Option<String>>,
    pub cache_from: Vec<String>,
    pub target: Option<String>,
    pub labels: Map<String, String>,
    pub secrets: Vec<SecretRef>,
    pub ssh: Vec<SshEntry>,
}

/// A secret as referenced from a service's build block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretRef {
    Short(String),
    Long {
        source: String,
        target: Option<String>,
    },
}

impl SecretRef {
    /// Returns the id the secret is exposed as and the name of the top-level
    /// secret it comes from.
    pub fn id_and_source(&self) -> (&str, &str) {
        match self {
            SecretRef::Short(name) => (name, name),
            SecretRef::Long { source, target } => match target.as_deref() {
                Some(target) if !target.is_empty() => (target, source),
                _ => (source, source),
            },
        }
    }
}

/// A top-level secret definition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecretConfig {
    pub file: Option<String>,
}

impl SecretConfig {
    pub fn file<F: Into<String>>(file: F) -> SecretConfig {
        SecretConfig {
            file: Some(file.into()),
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum SshEntry {
    Default,
    Key { id: String, path: Option<String> },
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum PullPolicy {
    Always,
    Never,
    Missing,
    Build,
    Other(String),
}

impl From<&str> for PullPolicy {
    fn from(value: &str) -> Self {
        match value {
            "always" => PullPolicy::Always,
            "never" => PullPolicy::Never,
            "missing" | "if_not_present" => PullPolicy::Missing,
            "build" => PullPolicy::Build,
            other => PullPolicy::Other(other.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    pub image: String,
    pub build: Option<BuildSpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BuildSpec {
    pub force: bool,
    pub build_args: Vec<String>,
    pub dockerfile_inline: String,
}
