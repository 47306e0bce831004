use crate::utils::arg_parser::{
    ArgParser, CapacityParser, DurationParser, FilePathParser, FromStrParser, PrivkeyPathParser,
    UrlParser,
};
use clap::Arg;

pub fn url<'a>() -> Arg<'a> {
    Arg::with_name("url")
        .long("url")
        .takes_value(true)
        .global(true)
        .validator(|input| UrlParser.validate(input))
        .about("CKB node JSON-RPC url (the node must enable the indexer module)")
}

pub fn config<'a>() -> Arg<'a> {
    Arg::with_name("config")
        .long("config")
        .takes_value(true)
        .global(true)
        .validator(|input| FilePathParser::new(true).validate(input))
        .about("TOML file with the code hash, hash type and cell dep of every iCKB script")
}

pub fn privkey_path<'a>() -> Arg<'a> {
    Arg::with_name("privkey-path")
        .long("privkey-path")
        .takes_value(true)
        .validator(|input| PrivkeyPathParser.validate(input))
        .about("Private key file path (only read first line)")
}

pub fn amount<'a>() -> Arg<'a> {
    Arg::with_name("amount")
        .long("amount")
        .takes_value(true)
        .validator(|input| CapacityParser.validate(input))
        .about("The deposit capacity, occupied capacity included (unit: CKB, format: 1000.5)")
}

pub fn fee_rate<'a>() -> Arg<'a> {
    Arg::with_name("fee-rate")
        .long("fee-rate")
        .takes_value(true)
        .validator(|input| FromStrParser::<u64>::default().validate(input))
        .about("The transaction fee rate (unit: shannons/KB), estimated from recent blocks when absent")
}

pub fn poll_interval<'a>() -> Arg<'a> {
    Arg::with_name("poll-interval")
        .long("poll-interval")
        .takes_value(true)
        .default_value("1s")
        .validator(|input| DurationParser.validate(input))
        .about("Delay between two transaction status polls (format: 500ms, 3s, 1m)")
}

pub fn poll_attempts<'a>() -> Arg<'a> {
    Arg::with_name("poll-attempts")
        .long("poll-attempts")
        .takes_value(true)
        .default_value("120")
        .validator(|input| FromStrParser::<u32>::default().validate(input))
        .about("Transaction status polls before giving up on the commitment")
}
