use std::path::{Path, PathBuf};

use crate::{error::ParseError, models::SecretRef, paths::path_str, services::ProjectModel};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSecret {
    pub id: String,
    pub source: PathBuf,
}

impl ResolvedSecret {
    pub fn to_arg(&self) -> Result<String, ParseError> {
        Ok(format!(
            "--secret=id={},src={}",
            self.id,
            path_str(&self.source)?
        ))
    }
}

/// Resolves the secrets of a build block against the project's top-level
/// secrets, keeping declaration order. Duplicate ids are passed through.
pub fn resolve_secrets<P>(
    project: &P,
    service_name: &str,
    secrets: &[SecretRef],
) -> Result<Vec<ResolvedSecret>, ParseError>
where
    P: ProjectModel + ?Sized,
{
    let mut resolved = Vec::with_capacity(secrets.len());

    for secret in secrets {
        let (id, source) = secret.id_and_source();

        let config = project
            .secret(source)
            .ok_or_else(|| ParseError::UnresolvedSecret {
                service: service_name.into(),
                secret: source.into(),
            })?;

        let file = config
            .file
            .as_deref()
            .ok_or_else(|| ParseError::SecretWithoutFile {
                secret: source.into(),
            })?;

        resolved.push(ResolvedSecret {
            id: id.into(),
            source: project.relative_path(Path::new(file)),
        });
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Project, SecretConfig};

    fn project() -> Project {
        let mut project = Project::new("proj", "/work");
        project
            .secrets
            .insert("src_secret".into(), SecretConfig::file("test_secret1"));
        project
            .secrets
            .insert("simple_secret".into(), SecretConfig::file("./test_secret2"));
        project.secrets.insert(
            "absolute_secret".into(),
            SecretConfig::file("/tmp/absolute_secret"),
        );
        project
    }

    #[test]
    fn resolves_both_shapes_in_declaration_order() {
        let secrets = vec![
            SecretRef::Long {
                source: "src_secret".into(),
                target: Some("tgt_secret".into()),
            },
            SecretRef::Short("simple_secret".into()),
            SecretRef::Short("absolute_secret".into()),
        ];

        let resolved = resolve_secrets(&project(), "bar", &secrets).unwrap();
        let args = resolved
            .iter()
            .map(|secret| secret.to_arg().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(
            args,
            vec![
                "--secret=id=tgt_secret,src=/work/test_secret1",
                "--secret=id=simple_secret,src=/work/test_secret2",
                "--secret=id=absolute_secret,src=/tmp/absolute_secret",
            ]
        );
    }

    #[test]
    fn duplicate_ids_are_kept() {
        let secrets = vec![
            SecretRef::Short("simple_secret".into()),
            SecretRef::Long {
                source: "src_secret".into(),
                target: Some("simple_secret".into()),
            },
        ];

        let resolved = resolve_secrets(&project(), "bar", &secrets).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].id, "simple_secret");
        assert_eq!(resolved[1].id, "simple_secret");
        assert_eq!(resolved[1].source, PathBuf::from("/work/test_secret1"));
    }

    #[test]
    fn undefined_secret_is_an_error() {
        let secrets = vec![
            SecretRef::Short("simple_secret".into()),
            SecretRef::Long {
                source: "missing".into(),
                target: Some("simple_secret".into()),
            },
        ];

        let err = resolve_secrets(&project(), "bar", &secrets).unwrap_err();
        match err {
            ParseError::UnresolvedSecret { service, secret } => {
                assert_eq!(service, "bar");
                assert_eq!(secret, "missing");
            }
            err => panic!("unexpected error: {:?}", err),
        }
    }

    #[test]
    fn secret_without_file_is_an_error() {
        let mut project = project();
        project
            .secrets
            .insert("from_env".into(), SecretConfig::default());

        let secrets = vec![SecretRef::Short("from_env".into())];
        let err = resolve_secrets(&project, "bar", &secrets).unwrap_err();
        assert!(matches!(err, ParseError::SecretWithoutFile { .. }));
    }
}
