//! Turns the services of a docker-compose project into the image reference and
//! the `build` arguments needed to produce each service's image.

pub mod error;
pub mod frontends;
pub mod models;
pub mod parser;
pub mod paths;
pub mod services;

pub use error::ParseError;
pub use parser::{default_image_name, image_name, parse, parse_all, parse_service};
