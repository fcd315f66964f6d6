pub mod clock;
pub mod config;
pub mod error;
pub mod graph;
pub mod io;
pub mod parser;
pub mod paths;
pub mod prompt;
pub mod recommend;
pub mod rules;
pub mod state;
pub mod task;
pub mod types;
pub mod validation;
pub mod workflow;

pub use error::{Result, SpecflowError};
