mod compose;
mod config;
mod error;
mod join;
mod loader;
mod plan;
mod pool;
mod timer;

use crate::{
    config::{ Filter, JoinConfig },
    join::*,
};

use clap::{ ArgAction, Parser };

use log::{ debug, LevelFilter };

use std::{
    ffi::OsString,
    num::NonZeroUsize,
    path::PathBuf,
};

/// Scale images to a common width (or height) and join them into one strip.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None, args_override_self = true)]
struct Args {
    /// Images to join, in order
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Output filename without extension
    #[arg(short, long, required_unless_present = "dry_run")]
    output: Option<String>,
    /// Output filename extension, picks the encoder
    #[arg(short, long, default_value = "jpg")]
    format: String,
    /// Encoder quality
    #[arg(short, long, default_value_t = 92, value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: u8,
    /// Scale images down to the smallest one instead of up to the largest
    #[arg(short, long)]
    small: bool,
    /// Join images left to right with a common height
    #[arg(short, long)]
    landscape: bool,
    /// Resampling filter
    #[arg(long, value_enum, default_value_t = Filter::Lanczos3)]
    filter: Filter,
    /// Keep transparent borders
    #[arg(long)]
    no_trim: bool,
    /// Round images with an alpha channel down to even dimensions
    #[arg(long)]
    even: bool,
    /// Worker threads, defaults to the number of cores
    #[arg(short, long)]
    jobs: Option<NonZeroUsize>,
    /// Print the scaling plan and exit without writing anything
    #[arg(long)]
    dry_run: bool,
    /// Ignore the defaults file
    #[arg(long)]
    no_defaults: bool,
    /// More logging, repeat for debug output
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl From<&Args> for JoinConfig{
    fn from(args: &Args) -> Self{
        Self{
            downscale: args.small,
            landscape: args.landscape,
            quality: args.quality,
            format: args.format.clone(),
            filter: args.filter,
            trim: !args.no_trim,
            even: args.even,
            jobs: args.jobs,
        }
    }
}

pub fn main() {
    let (args, defaults) = parse_args();
    init_logger(args.verbose);
    if let Some((path, args)) = defaults{
        debug!("Using {} extra arguments from {}", args.len(), path.display());
    }

    let config = JoinConfig::from(&args);
    debug!("{:?}", config);

    if args.dry_run {
        let (plans, canvas) = dry_run(&args.files, &config).vital("Photojoin: dry run failed");
        print!("{}", report(&plans, canvas));
        return;
    }

    let name = args.output.as_deref().ok_or("no output name").vital("Photojoin");
    let path = output_path(name, &config.format);
    let blob = join_images(&args.files, &config).vital("Photojoin: could not join images");
    write_output(&path, &blob).vital("Photojoin: could not save result");
    println!("{}", path.display());
}

/// Parses the command line with the defaults file spliced in front of it.
/// The logger is not up yet, so what was read is handed back for later.
fn parse_args() -> (Args, Option<(PathBuf, Vec<OsString>)>) {
    let argv: Vec<OsString> = std::env::args_os().collect();
    // clap can't run before the defaults are known, so this is a plain string
    // match; a file literally named `--no-defaults` after `--` also trips it
    let skip = argv.iter().any(|a| a == "--no-defaults");
    let defaults = if skip { None } else { config::defaults_path() };
    let defaults = defaults.and_then(|path| {
        let args = config::read_defaults(&path)
            .vital("Photojoin: could not read defaults file");
        (!args.is_empty()).then_some((path, args))
    });

    let extra = defaults.as_ref().map(|(_, a)| a.clone()).unwrap_or_default();
    let args = Args::parse_from(config::merge_args(argv.into_iter(), extra));
    (args, defaults)
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

trait Vital<T> {
    fn vital(self, msg: &str) -> T;
}

impl<T, U: std::fmt::Display> Vital<T> for Result<T, U> {
    fn vital(self, msg: &str) -> T {
        match self {
            Ok(res) => res,
            Err(err) => {
                eprintln!("{msg}: {err}");
                std::process::exit(1);
            },
        }
    }
}
