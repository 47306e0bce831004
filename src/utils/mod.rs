pub mod arg;
pub mod arg_parser;
pub mod config;
