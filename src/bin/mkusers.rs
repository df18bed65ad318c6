extern crate arg_parser;
extern crate mkusers;

use std::path::Path;
use std::{env, fs, process};

use anyhow::{Context, Result};
use arg_parser::ArgParser;
use log::{Level, LevelFilter, Metadata, Record};

use mkusers::credential::hasher_for;
use mkusers::{home, parse_table, Config, Run, UserSpec};

static LOGGER: StderrLogger = StderrLogger;

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            match record.level() {
                Level::Error | Level::Warn => {
                    eprintln!("mkusers: {}: {}", record.level(), record.args())
                }
                _ => eprintln!("{}", record.args()),
            }
        }
    }

    fn flush(&self) {}
}

fn read_tables(paths: &[String]) -> Result<Vec<UserSpec>> {
    let mut specs = Vec::new();
    for path in paths {
        let data = fs::read_to_string(path).with_context(|| format!("{path}: failed to read"))?;
        specs.extend(parse_table(&data).with_context(|| format!("{path}: failed to parse"))?);
    }
    Ok(specs)
}

fn mkusers(parser: &ArgParser) -> Result<()> {
    let config = match parser.get_opt("config") {
        Some(path) => Config::from_file(Path::new(&path))?,
        None => Config::default(),
    };

    if parser.found("print-config") {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let (root, tables) = match parser.args.split_first() {
        Some((root, tables)) if !tables.is_empty() => (Path::new(root), tables),
        _ => anyhow::bail!("usage: mkusers [-c config.toml] [--no-chown] <target-root> <table>..."),
    };

    let specs = read_tables(tables)?;
    let hasher = hasher_for(&config.general)?;
    let directives = Run::execute(root, &config, &specs, hasher)
        .with_context(|| format!("{}: failed to synthesize accounts", root.display()))?;

    if parser.found("no-chown") {
        for directive in &directives {
            println!("{} {} {}", directive.path, directive.uid, directive.gid);
        }
    } else {
        home::materialize(root, &directives)?;
    }

    log::info!(
        "{}: applied {} rows, {} home directories",
        root.display(),
        specs.len(),
        directives.len()
    );
    Ok(())
}

fn main() {
    let mut parser = ArgParser::new(4)
        .add_opt("c", "config")
        .add_flag(&["no-chown"])
        .add_flag(&["print-config"])
        .add_flag(&["v", "verbose"]);
    parser.parse(env::args());

    let level = if parser.found("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }

    if let Err(err) = mkusers(&parser) {
        eprintln!("mkusers: {:#}", err);
        process::exit(1);
    }
}
