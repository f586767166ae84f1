pub mod cli;
pub mod error;
pub mod http;
pub mod logging;
pub mod models;
pub mod repository;
pub mod services;
pub mod storage;
pub mod utils;

pub use cli::{Cli, Commands};
pub use error::AppError;
pub use models::Config;
