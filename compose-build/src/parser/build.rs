use log::{debug, warn};
use std::path::Path;

use crate::{
    error::ParseError,
    models::{BuildConfig, BuildSpec, PullPolicy},
    parser::{secrets::resolve_secrets, ssh::resolve_ssh},
    paths::{self, path_str},
    services::ProjectModel,
};

/// Turns a service's build block into the arguments of an image build. The
/// resolved context directory is always the last argument.
pub fn translate<P>(
    project: &P,
    service_name: &str,
    build: &BuildConfig,
    pull_policy: Option<&PullPolicy>,
) -> Result<BuildSpec, ParseError>
where
    P: ProjectModel + ?Sized,
{
    let context = match build.context.as_deref() {
        Some(context) if !context.is_empty() => context,
        _ => {
            return Err(ParseError::MissingBuildContext {
                service: service_name.into(),
            })
        }
    };

    if context.contains("://") {
        return Err(ParseError::UnsupportedContext {
            service: service_name.into(),
            context: context.into(),
        });
    }

    let context_dir = project.relative_path(Path::new(context));

    let mut build_args = Vec::new();
    let mut dockerfile_inline = String::new();

    match (
        build.dockerfile_inline.as_deref().filter(|s| !s.is_empty()),
        build.dockerfile.as_deref().filter(|s| !s.is_empty()),
    ) {
        (Some(inline), _) => dockerfile_inline.push_str(inline),
        (None, Some(dockerfile)) => {
            let dockerfile = Path::new(dockerfile);
            let dockerfile = if dockerfile.is_absolute() {
                warn!(
                    "service {:?}: build.dockerfile should be a relative path, got {:?}",
                    service_name, dockerfile
                );
                dockerfile.to_path_buf()
            } else {
                paths::clean(&context_dir.join(dockerfile))
            };
            build_args.push(format!("-f={}", path_str(&dockerfile)?));
        }
        (None, None) => (),
    }

    for (key, value) in build.args.iter() {
        match value {
            Some(value) => build_args.push(format!("--build-arg={}={}", key, value)),
            None => build_args.push(format!("--build-arg={}", key)),
        }
    }

    for cache_from in build.cache_from.iter() {
        build_args.push(format!("--cache-from={}", cache_from));
    }

    if let Some(target) = build.target.as_deref().filter(|s| !s.is_empty()) {
        build_args.push(format!("--target={}", target));
    }

    for (key, value) in build.labels.iter() {
        build_args.push(format!("--label={}={}", key, value));
    }

    for secret in resolve_secrets(project, service_name, &build.secrets)? {
        build_args.push(secret.to_arg()?);
    }

    for ssh in resolve_ssh(&build.ssh) {
        build_args.push(format!("--ssh={}", ssh));
    }

    build_args.push(path_str(&context_dir)?.into());

    let force = pull_policy == Some(&PullPolicy::Build);
    debug!(
        "service {:?}: build args {:?}, force {}",
        service_name, build_args, force
    );

    Ok(BuildSpec {
        force,
        build_args,
        dockerfile_inline,
    })
}
