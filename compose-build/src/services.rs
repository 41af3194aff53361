use std::path::{Path, PathBuf};

use crate::{
    error::ParseError,
    models::{Project, SecretConfig, Service},
    paths,
};

/// Read-only view of a loaded compose project.
pub trait ProjectModel {
    fn name(&self) -> &str;

    fn working_dir(&self) -> &Path;

    fn service(&self, name: &str) -> Option<&Service>;

    fn secret(&self, name: &str) -> Option<&SecretConfig>;

    /// Resolves `path` against the working directory unless it is already absolute.
    fn relative_path(&self, path: &Path) -> PathBuf {
        paths::resolve(self.working_dir(), path)
    }
}

pub trait ComposerFrontend {
    fn project<P: AsRef<Path>>(
        &mut self,
        project_name: Option<&str>,
        compose_file_path: P,
    ) -> Result<Project, ParseError>;
}
