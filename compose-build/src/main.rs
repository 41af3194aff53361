use anyhow::{anyhow, Result};
use crossterm::{
    style::{self, Colorize, Styler},
    QueueableCommand,
};
use log::info;
use std::{
    collections::BTreeMap as Map,
    env,
    io::{stdout, Write},
    path::{Path, PathBuf},
};
use structopt::StructOpt;

use compose_build::{
    frontends::DockerComposeFrontend,
    image_name,
    models::{Project, Service, ServiceDescriptor},
    parse_all, parse_service,
    services::{ComposerFrontend, ProjectModel},
    ParseError,
};

const COMPOSE_FILE_NAMES: &[&str] = &[
    "compose.yaml",
    "compose.yml",
    "docker-compose.yml",
    "docker-compose.yaml",
];

#[derive(Debug, StructOpt)]
#[structopt(
    name = "compose-build",
    about = "Prints the images and build arguments of docker-compose services."
)]
struct Opt {
    #[structopt(short, long, parse(from_os_str))]
    /// Use this compose file instead of looking for one.
    file: Option<PathBuf>,

    #[structopt(short = "p", long, env = "COMPOSE_PROJECT_NAME")]
    /// Project name, defaults to the name of the compose file's directory.
    project_name: Option<String>,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Prints the image of each service.
    Images {
        /// Services to include, all of them if none are given.
        services: Vec<String>,
    },
    /// Prints the arguments used to build the image of each service.
    BuildArgs {
        #[structopt(long)]
        /// Print the service descriptors as JSON.
        json: bool,

        /// Services to include, all of them if none are given.
        services: Vec<String>,
    },
}

fn find_compose_file<P: AsRef<Path>>(path: P) -> Option<PathBuf> {
    for path in path.as_ref().ancestors() {
        for file_name in COMPOSE_FILE_NAMES {
            let compose_file_path = path.join(file_name);
            if compose_file_path.exists() {
                return Some(compose_file_path);
            }
        }
    }

    None
}

fn main() -> Result<()> {
    pretty_env_logger::init_custom_env("LOG");

    let opt = Opt::from_args();

    let mut stdout = stdout();

    let compose_file_path = match opt.file {
        Some(file) => file,
        None => find_compose_file(env::current_dir()?)
            .ok_or_else(|| anyhow!("Couldn't find a compose file in the current working directory or any of its parents."))?,
    };
    info!("found compose file {:?}", compose_file_path);

    let mut frontend = DockerComposeFrontend::new();
    let project = frontend.project(opt.project_name.as_deref(), &compose_file_path)?;
    info!("parsed project {:?}", project.name);

    match opt.command {
        Command::Images { services } => {
            for service in select_services(&project, &services)? {
                stdout.queue(style::Print(format!(
                    "{} -> {}\n",
                    service.name,
                    image_name(&project, service)
                )))?;
            }
            stdout.flush()?;
        }
        Command::BuildArgs { json, services } => {
            let parsed = if services.is_empty() {
                parse_all(&project)
            } else {
                services
                    .iter()
                    .map(|name| (name.clone(), parse_service(&project, name)))
                    .collect()
            };

            let mut descriptors = Map::new();
            let mut failures = Vec::new();
            for (name, result) in parsed {
                match result {
                    Ok(descriptor) => {
                        descriptors.insert(name, descriptor);
                    }
                    Err(err) => failures.push(err),
                }
            }
            info!("parsed {} services", descriptors.len());

            if json {
                serde_json::to_writer_pretty(&mut stdout, &descriptors)?;
                stdout.write_all(b"\n")?;
            } else {
                print_build_args(&mut stdout, &descriptors)?;
            }

            report_failures(&mut stdout, &failures)?;
        }
    }

    Ok(())
}

/// The named services, or all of them when `names` is empty.
fn select_services<'a>(project: &'a Project, names: &[String]) -> Result<Vec<&'a Service>> {
    if names.is_empty() {
        return Ok(project.services.values().collect());
    }

    names
        .iter()
        .map(|name| {
            project.service(name).ok_or_else(|| {
                anyhow::Error::from(ParseError::UnknownService {
                    service: name.clone(),
                })
            })
        })
        .collect()
}

/// Prints every failure, the remaining services have been printed already.
fn report_failures(stdout: &mut impl Write, failures: &[ParseError]) -> Result<()> {
    for error in failures.iter() {
        stdout
            .queue(style::PrintStyledContent("ERROR: ".red().bold()))?
            .queue(style::Print(format!("{}\n", error)))?;
    }
    stdout.flush()?;

    if !failures.is_empty() {
        return Err(anyhow!("{} service(s) failed to parse", failures.len()));
    }

    Ok(())
}

fn print_build_args(
    stdout: &mut impl Write,
    descriptors: &Map<String, ServiceDescriptor>,
) -> Result<()> {
    for (name, descriptor) in descriptors.iter() {
        let build = match descriptor.build.as_ref() {
            Some(build) => build,
            None => {
                info!("service {:?} has nothing to build", name);
                continue;
            }
        };

        let force = if build.force { ", always built" } else { "" };
        stdout
            .queue(style::PrintStyledContent("BUILD: ".cyan().bold()))?
            .queue(style::Print(format!(
                "{} ({}{})\n",
                name, descriptor.image, force
            )))?;

        for arg in build.build_args.iter() {
            stdout.queue(style::Print(format!("    {}\n", arg)))?;
        }

        if !build.dockerfile_inline.is_empty() {
            stdout.queue(style::Print("    (inline dockerfile)\n"))?;
        }
    }

    stdout.flush()?;

    Ok(())
}
