use log::info;
use std::collections::BTreeMap as Map;

use crate::{
    error::ParseError,
    models::{Project, Service, ServiceDescriptor},
    services::ProjectModel,
};

pub use build::translate;
pub use secrets::{resolve_secrets, ResolvedSecret};
pub use ssh::resolve_ssh;

mod build;
mod secrets;
mod ssh;

/// The image name used for services that build an image but don't name it.
pub fn default_image_name(project_name: &str, service_name: &str) -> String {
    format!("{}_{}", project_name, service_name)
}

/// The service's own image if it names one, the default image name otherwise.
/// Nothing but the image is looked at, so a broken build block doesn't matter.
pub fn image_name<P>(project: &P, service: &Service) -> String
where
    P: ProjectModel + ?Sized,
{
    match service.image.as_deref() {
        Some(image) if !image.is_empty() => image.to_owned(),
        _ => default_image_name(project.name(), &service.name),
    }
}

pub fn parse<P>(project: &P, service: &Service) -> Result<ServiceDescriptor, ParseError>
where
    P: ProjectModel + ?Sized,
{
    let image = image_name(project, service);

    let build = service
        .build
        .as_ref()
        .map(|build| translate(project, &service.name, build, service.pull_policy.as_ref()))
        .transpose()?;

    info!("parsed service {:?} with image {:?}", service.name, image);

    Ok(ServiceDescriptor { image, build })
}

pub fn parse_service<P>(project: &P, service_name: &str) -> Result<ServiceDescriptor, ParseError>
where
    P: ProjectModel + ?Sized,
{
    let service = project
        .service(service_name)
        .ok_or_else(|| ParseError::UnknownService {
            service: service_name.into(),
        })?;

    parse(project, service)
}

/// Parses every service of the project. A service that fails doesn't stop
/// the others from being parsed.
pub fn parse_all(project: &Project) -> Map<String, Result<ServiceDescriptor, ParseError>> {
    project
        .services
        .iter()
        .map(|(name, service)| (name.clone(), parse(project, service)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BuildConfig, PullPolicy, SecretConfig, SecretRef, SshEntry};

    fn build_service(name: &str, context: &str) -> Service {
        Service {
            name: name.into(),
            build: Some(BuildConfig {
                context: Some(context.into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn default_image_name_format() {
        assert_eq!(default_image_name("proj", "web"), "proj_web");
        assert_eq!(default_image_name("my-proj", "web_1"), "my-proj_web_1");
    }

    #[test]
    fn generated_image_name_is_stable() {
        let project = Project::new("proj", "/work");
        let service = build_service("foo", "./fooctx");

        let first = parse(&project, &service).unwrap();
        let second = parse(&project, &service).unwrap();
        assert_eq!(first.image, "proj_foo");
        assert_eq!(first, second);
    }

    #[test]
    fn explicit_image_wins() {
        let project = Project::new("proj", "/work");
        let mut service = build_service("bar", "./barctx");
        service.image = Some("barimg".into());

        assert_eq!(parse(&project, &service).unwrap().image, "barimg");

        service.image = Some("".into());
        assert_eq!(parse(&project, &service).unwrap().image, "proj_bar");
    }

    #[test]
    fn service_without_build_has_no_build_spec() {
        let project = Project::new("proj", "/work");
        let service = Service {
            name: "db".into(),
            image: Some("postgres:13".into()),
            pull_policy: Some(PullPolicy::Build),
            ..Default::default()
        };

        let descriptor = parse(&project, &service).unwrap();
        assert_eq!(descriptor.image, "postgres:13");
        assert_eq!(descriptor.build, None);
    }

    #[test]
    fn secret_is_second_to_last_and_context_last() {
        let mut project = Project::new("proj", "/work");
        project
            .secrets
            .insert("db_secret".into(), SecretConfig::file("creds"));

        let mut service = build_service("app", "./app");
        if let Some(build) = service.build.as_mut() {
            build.secrets = vec![SecretRef::Short("db_secret".into())];
        }

        let build = parse(&project, &service).unwrap().build.unwrap();
        let args = &build.build_args;
        assert_eq!(args[args.len() - 2], "--secret=id=db_secret,src=/work/creds");
        assert_eq!(args[args.len() - 1], "/work/app");
    }

    #[test]
    fn full_build_block_in_order() {
        let mut project = Project::new("proj", "/work");
        project
            .secrets
            .insert("bare".into(), SecretConfig::file("bare.txt"));
        project
            .secrets
            .insert("structured".into(), SecretConfig::file("/etc/structured"));

        let mut service = build_service("app", "app");
        service.pull_policy = Some(PullPolicy::Build);
        if let Some(build) = service.build.as_mut() {
            build.target = Some("dev".into());
            build.labels.insert("team".into(), "core".into());
            build.secrets = vec![
                SecretRef::Short("bare".into()),
                SecretRef::Long {
                    source: "structured".into(),
                    target: Some("token".into()),
                },
            ];
            build.ssh = vec![SshEntry::Default];
        }

        let build = parse(&project, &service).unwrap().build.unwrap();
        assert!(build.force);
        assert_eq!(
            build.build_args,
            vec![
                "--target=dev",
                "--label=team=core",
                "--secret=id=bare,src=/work/bare.txt",
                "--secret=id=token,src=/etc/structured",
                "--ssh=default",
                "/work/app",
            ]
        );
    }

    #[test]
    fn image_name_ignores_the_build_block() {
        let project = Project::new("proj", "/work");
        let mut service = build_service("api", "./api");
        service.image = Some("registry/api:1".into());
        if let Some(build) = service.build.as_mut() {
            build.secrets = vec![SecretRef::Short("undefined".into())];
        }

        assert_eq!(image_name(&project, &service), "registry/api:1");
        assert!(parse(&project, &service).is_err());

        service.image = None;
        assert_eq!(image_name(&project, &service), "proj_api");
    }

    #[test]
    fn unknown_service() {
        let project = Project::new("proj", "/work");
        let err = parse_service(&project, "nope").unwrap_err();
        assert!(matches!(err, ParseError::UnknownService { service } if service == "nope"));
    }

    #[test]
    fn parse_all_keeps_going_after_a_failure() {
        let mut project = Project::new("proj", "/work");

        let mut broken = build_service("broken", "./broken");
        if let Some(build) = broken.build.as_mut() {
            build.secrets = vec![SecretRef::Short("undefined".into())];
        }
        project.services.insert("broken".into(), broken);
        project
            .services
            .insert("web".into(), build_service("web", "./web"));

        let parsed = parse_all(&project);
        assert!(matches!(
            parsed["broken"],
            Err(ParseError::UnresolvedSecret { .. })
        ));
        assert_eq!(parsed["web"].as_ref().unwrap().image, "proj_web");
    }

    #[test]
    fn services_can_be_parsed_in_parallel() {
        let mut project = Project::new("proj", "/work");
        for name in &["a", "b", "c", "d"] {
            project
                .services
                .insert((*name).into(), build_service(name, name));
        }

        let project = &project;
        let descriptors = std::thread::scope(|scope| {
            let handles = project
                .services
                .values()
                .map(|service| scope.spawn(move || parse(project, service)))
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap().unwrap())
                .collect::<Vec<_>>()
        });

        let images = descriptors
            .iter()
            .map(|descriptor| descriptor.image.as_str())
            .collect::<Vec<_>>();
        assert_eq!(images, vec!["proj_a", "proj_b", "proj_c", "proj_d"]);
        assert_eq!(
            descriptors[2].build.as_ref().unwrap().build_args,
            vec!["/work/c"]
        );
    }
}
