use std::process;

use anyhow::{anyhow, Context};
use clap::{crate_version, App, AppSettings, Arg, ArgMatches};

use subcommands::{CliSubCommand, IckbSubCommand};
use utils::{arg, config::GlobalConfig};

mod subcommands;
mod utils;

fn main() {
    env_logger::init();

    let matches = build_cli(crate_version!()).get_matches();
    if let Err(err) = run(&matches) {
        eprintln!("{:#}", err);
        process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let debug = matches.is_present("debug");
    let config = GlobalConfig::new(
        matches.value_of("url"),
        matches.value_of("config"),
        debug,
    );
    log::debug!(
        "node url: {}, scripts config: {:?}",
        config.url(),
        config.scripts_path()
    );
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("create tokio runtime")?;

    let output = match matches.subcommand() {
        ("ickb", Some(sub_matches)) => IckbSubCommand::new(&runtime, &config)
            .process(sub_matches, config.debug())
            .map_err(|err| anyhow!(err))?,
        _ => return Err(anyhow!(build_cli(crate_version!()).generate_usage())),
    };
    output.print();
    Ok(())
}

pub fn build_cli(version: &str) -> App {
    App::new("ickb-cli")
        .version(version)
        .global_setting(AppSettings::ColoredHelp)
        .global_setting(AppSettings::DeriveDisplayOrder)
        .subcommand(IckbSubCommand::subcommand())
        .arg(arg::url())
        .arg(arg::config())
        .arg(
            Arg::with_name("debug")
                .long("debug")
                .global(true)
                .about("Display the signed transaction"),
        )
}
