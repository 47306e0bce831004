pub mod ickb;

pub use ickb::IckbSubCommand;

use clap::ArgMatches;
use serde_json::Value;

pub trait CliSubCommand {
    fn process(&mut self, matches: &ArgMatches, debug: bool) -> Result<Output, String>;
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Output {
    pub stdout: Option<Value>,
    pub stderr: Option<Value>,
}

impl Output {
    pub fn new_output(value: Value) -> Output {
        Output {
            stdout: Some(value),
            stderr: None,
        }
    }

    pub fn new_error(value: Value) -> Output {
        Output {
            stdout: None,
            stderr: Some(value),
        }
    }

    pub fn print(&self) {
        if let Some(stdout) = self.stdout.as_ref() {
            println!("{}", render(stdout));
        }
        if let Some(stderr) = self.stderr.as_ref() {
            eprintln!("{}", render(stderr));
        }
    }
}

fn render(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
