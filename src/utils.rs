pub mod completion;
pub mod config;
pub mod errors;
pub mod prompt;
pub mod yb_utils;
