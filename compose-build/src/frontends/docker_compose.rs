use log::{debug, info, warn};
use serde::{
    de::{self, MapAccess, SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};
use serde_yaml;
use std::{
    collections::BTreeMap as Map,
    env, fmt, fs,
    path::{Path, PathBuf},
};

use crate::{
    error::ParseError,
    models::{
        BuildConfig, Project, PullPolicy, SecretConfig, SecretRef, Service as ServiceModel,
        SshEntry,
    },
    paths,
    services::ComposerFrontend,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct DockerComposeFile {
    pub name: Option<String>,

    #[serde(default)]
    pub services: Map<String, Service>,

    #[serde(default)]
    pub secrets: Map<String, Secret>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Service {
    pub image: Option<String>,

    pub build: Option<Build>,

    pub pull_policy: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
enum Build {
    Short(String),
    Extended(ExtendedBuild),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ExtendedBuild {
    context: Option<String>,

    dockerfile: Option<String>,

    dockerfile_inline: Option<String>,

    #[serde(default)]
    args: MapList,

    #[serde(default)]
    cache_from: Vec<String>,

    #[serde(default)]
    labels: MapList,

    target: Option<String>,

    #[serde(default)]
    secrets: Vec<SecretRef>,

    #[serde(default)]
    ssh: MapList,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Secret {
    file: Option<String>,
}

/// Values are read as the text written in the file, so `1.10` stays `1.10`.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
enum MapList {
    Map(Map<String, Option<String>>),
    List(Vec<String>),
}

// Both enums are deserialized by hand instead of `#[serde(untagged)]`, which
// would buffer scalars and lose their original text.
impl<'de> Deserialize<'de> for Build {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BuildVisitor;

        impl<'de> Visitor<'de> for BuildVisitor {
            type Value = Build;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a build context or a build block")
            }

            fn visit_str<E: de::Error>(self, context: &str) -> Result<Build, E> {
                Ok(Build::Short(context.into()))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Build, A::Error> {
                ExtendedBuild::deserialize(de::value::MapAccessDeserializer::new(map))
                    .map(Build::Extended)
            }
        }

        deserializer.deserialize_any(BuildVisitor)
    }
}

impl<'de> Deserialize<'de> for MapList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MapListVisitor;

        impl<'de> Visitor<'de> for MapListVisitor {
            type Value = MapList;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping or a list of `key=value` strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<MapList, A::Error> {
                let mut map = Map::new();
                while let Some((key, value)) = access.next_entry::<String, Option<String>>()? {
                    map.insert(key, value);
                }
                Ok(MapList::Map(map))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<MapList, A::Error> {
                let mut list = Vec::new();
                while let Some(entry) = access.next_element::<String>()? {
                    list.push(entry);
                }
                Ok(MapList::List(list))
            }
        }

        deserializer.deserialize_any(MapListVisitor)
    }
}

impl Default for MapList {
    fn default() -> Self {
        MapList::List(Vec::new())
    }
}

impl MapList {
    pub fn to_map(self) -> Map<String, Option<String>> {
        match self {
            MapList::Map(map) => map,
            MapList::List(list) => list.into_iter().map(MapList::split_value).collect(),
        }
    }

    /// Entries in list form, `key: value` pairs become `key=value`.
    pub fn to_entries(self) -> Vec<String> {
        match self {
            MapList::Map(map) => map
                .into_iter()
                .map(|(key, value)| match value {
                    Some(value) => format!("{}={}", key, value),
                    None => key,
                })
                .collect(),
            MapList::List(list) => list,
        }
    }

    fn split_value(value: String) -> (String, Option<String>) {
        let split_index = value.find('=');
        match split_index {
            Some(split_index) => {
                let (key, value) = value.split_at(split_index);
                (key.into(), Some(value[1..].into()))
            }
            None => (value, None),
        }
    }
}

impl ExtendedBuild {
    fn into_build_config(self) -> BuildConfig {
        BuildConfig {
            // compose defaults the context of a build block to the project directory
            context: self.context.or_else(|| Some(".".into())),
            dockerfile: self.dockerfile,
            dockerfile_inline: self.dockerfile_inline,
            args: self.args.to_map(),
            cache_from: self.cache_from,
            target: self.target,
            labels: self
                .labels
                .to_map()
                .into_iter()
                .map(|(key, value)| (key, value.unwrap_or_default()))
                .collect(),
            secrets: self.secrets,
            ssh: self
                .ssh
                .to_entries()
                .iter()
                .map(|entry| SshEntry::from(entry.as_str()))
                .collect(),
        }
    }
}

impl DockerComposeFile {
    fn load(compose_file: &str) -> Result<DockerComposeFile, ParseError> {
        let deserializer = serde_yaml::Deserializer::from_str(compose_file);

        let mut ignored = Vec::new();
        let file: DockerComposeFile = serde_ignored::deserialize(deserializer, |path| {
            ignored.push(path.to_string());
        })?;

        for path in ignored.iter() {
            if path.contains(".build.") {
                warn!("ignoring unsupported field {}", path);
            } else {
                debug!("ignoring field {}", path);
            }
        }

        Ok(file)
    }

    fn into_project(self, name: String, working_dir: PathBuf) -> Project {
        let services = self
            .services
            .into_iter()
            .map(|(service_name, service)| {
                let build = match service.build {
                    Some(Build::Short(context)) => Some(BuildConfig {
                        context: Some(context),
                        ..Default::default()
                    }),
                    Some(Build::Extended(build)) => Some(build.into_build_config()),
                    None => None,
                };

                let service = ServiceModel {
                    name: service_name.clone(),
                    image: service.image,
                    pull_policy: service.pull_policy.as_deref().map(PullPolicy::from),
                    build,
                };

                (service_name, service)
            })
            .collect();

        let secrets = self
            .secrets
            .into_iter()
            .map(|(secret_name, secret)| (secret_name, SecretConfig { file: secret.file }))
            .collect();

        Project {
            name,
            working_dir,
            services,
            secrets,
        }
    }
}

/// Lowercases `name` and drops everything but `a-z`, `0-9`, `_` and `-`, the
/// way compose does for project names derived from a directory.
pub fn normalize_project_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect::<String>()
        .trim_start_matches(|c: char| c == '_' || c == '-')
        .to_owned()
}

pub struct DockerComposeFrontend;

impl DockerComposeFrontend {
    pub fn new() -> DockerComposeFrontend {
        DockerComposeFrontend
    }

    /// Loads a project from compose YAML that has already been read. Relative
    /// paths in it are resolved against `working_dir`.
    pub fn project_from_str<P: Into<PathBuf>>(
        &mut self,
        project_name: &str,
        working_dir: P,
        compose_file: &str,
    ) -> Result<Project, ParseError> {
        let file = DockerComposeFile::load(compose_file)?;
        Ok(file.into_project(project_name.into(), working_dir.into()))
    }
}

impl ComposerFrontend for DockerComposeFrontend {
    fn project<P: AsRef<Path>>(
        &mut self,
        project_name: Option<&str>,
        compose_file_path: P,
    ) -> Result<Project, ParseError> {
        let io_error = |source| ParseError::Io {
            path: compose_file_path.as_ref().into(),
            source,
        };

        // Symlinks are not followed, the working directory is where the file
        // was found.
        let current_dir = env::current_dir().map_err(io_error)?;
        let compose_file_path = paths::clean(&current_dir.join(compose_file_path.as_ref()));

        let work_directory = compose_file_path
            .parent()
            .ok_or_else(|| ParseError::NoParentDirectory {
                path: compose_file_path.clone(),
            })?
            .to_path_buf();
        info!("found work directory {:?}", work_directory);

        let compose_file = fs::read_to_string(&compose_file_path).map_err(io_error)?;
        let file = DockerComposeFile::load(&compose_file)?;

        let project_name = match (project_name, file.name.as_deref()) {
            (Some(name), _) | (None, Some(name)) => name.to_owned(),
            (None, None) => work_directory
                .file_name()
                .and_then(|name| name.to_str())
                .map(normalize_project_name)
                .filter(|name| !name.is_empty())
                .ok_or(ParseError::MissingProjectName)?,
        };
        info!("project name {:?}", project_name);

        Ok(file.into_project(project_name, work_directory))
    }
}
