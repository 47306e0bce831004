use std::fmt::Display;
use std::fs;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ckb_sdk::HumanCapacity;
use clap::ArgMatches;
use ickb_signer::PrivkeySigner;
use url::Url;

pub trait ArgParser<T> {
    fn parse(&self, input: &str) -> Result<T, String>;

    fn validate(&self, input: &str) -> Result<(), String> {
        self.parse(input).map(|_| ())
    }

    fn from_matches<R: From<T>>(&self, matches: &ArgMatches, name: &str) -> Result<R, String> {
        self.from_matches_opt(matches, name, true)?
            .ok_or_else(|| format!("<{}> is required", name))
    }

    fn from_matches_opt<R: From<T>>(
        &self,
        matches: &ArgMatches,
        name: &str,
        required: bool,
    ) -> Result<Option<R>, String> {
        if required && !matches.is_present(name) {
            return Err(format!("<{}> is required", name));
        }
        matches
            .value_of(name)
            .map(|input| self.parse(input).map(Into::into))
            .transpose()
    }
}

#[derive(Debug, Default)]
pub struct FromStrParser<T: FromStr> {
    _t: PhantomData<T>,
}

impl<T: FromStr> FromStrParser<T> {
    pub fn new() -> FromStrParser<T> {
        FromStrParser { _t: PhantomData }
    }
}

impl<T> ArgParser<T> for FromStrParser<T>
where
    T: FromStr,
    <T as FromStr>::Err: Display,
{
    fn parse(&self, input: &str) -> Result<T, String> {
        T::from_str(input).map_err(|err| err.to_string())
    }
}

pub struct UrlParser;

impl ArgParser<Url> for UrlParser {
    fn parse(&self, input: &str) -> Result<Url, String> {
        Url::parse(input).map_err(|err| err.to_string())
    }
}

#[derive(Default)]
pub struct PathParser {
    should_exists: bool,
}

impl ArgParser<PathBuf> for PathParser {
    fn parse(&self, input: &str) -> Result<PathBuf, String> {
        let path = PathBuf::from(input);
        if self.should_exists && !path.exists() {
            Err(format!("path <{}> does not exists", input))
        } else {
            Ok(path)
        }
    }
}

pub struct FilePathParser {
    path_parser: PathParser,
}

impl FilePathParser {
    pub fn new(should_exists: bool) -> FilePathParser {
        FilePathParser {
            path_parser: PathParser { should_exists },
        }
    }
}

impl ArgParser<PathBuf> for FilePathParser {
    fn parse(&self, input: &str) -> Result<PathBuf, String> {
        let path = self.path_parser.parse(input)?;
        if path.exists() && !path.is_file() {
            Err(format!("path <{}> is not file", input))
        } else {
            Ok(path)
        }
    }
}

/// Reads the first whitespace separated token of the file as a hex private key
pub struct PrivkeyPathParser;

impl ArgParser<PrivkeySigner> for PrivkeyPathParser {
    fn parse(&self, input: &str) -> Result<PrivkeySigner, String> {
        let path: PathBuf = FilePathParser::new(true).parse(input)?;
        let content = fs::read_to_string(&path).map_err(|err| err.to_string())?;
        let privkey_string = content
            .split_whitespace()
            .next()
            .ok_or_else(|| "File is empty".to_string())?;
        PrivkeySigner::from_hex(privkey_string)
            .map_err(|err| format!("Invalid secp256k1 secret key format, error: {}", err))
    }
}

pub struct CapacityParser;

impl ArgParser<HumanCapacity> for CapacityParser {
    fn parse(&self, input: &str) -> Result<HumanCapacity, String> {
        HumanCapacity::from_str(input)
    }
}

pub struct DurationParser;

impl ArgParser<Duration> for DurationParser {
    fn parse(&self, input: &str) -> Result<Duration, String> {
        let input_lower = input.to_lowercase();
        if let Some(value_part) = input_lower.strip_suffix("ms") {
            let value: u64 = value_part.parse::<u64>().map_err(|err| err.to_string())?;
            return Ok(Duration::from_millis(value));
        }
        let unit_part = input_lower
            .chars()
            .last()
            .ok_or_else(|| "Missing input".to_owned())?;
        let value_part = &input_lower[0..input_lower.len() - unit_part.len_utf8()];
        let value: u64 = value_part.parse::<u64>().map_err(|err| err.to_string())?;
        let seconds = match unit_part {
            's' => value,
            'm' => value * 60,
            'h' => value * 3600,
            _ => {
                return Err("Please give an unit, {ms: millisecond, s: second, m: minute, h: hour}"
                    .to_owned());
            }
        };
        Ok(Duration::from_secs(seconds))
    }
}
