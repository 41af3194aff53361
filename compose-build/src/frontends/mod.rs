pub use docker_compose::DockerComposeFrontend;

mod docker_compose;
