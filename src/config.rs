use std::{
    ffi::OsString,
    fs,
    io,
    num::NonZeroUsize,
    path::{ Path, PathBuf },
};

use clap::ValueEnum;
use image::imageops::FilterType;
use log::{ debug, info };

/// Everything the loader and the engine need to know about one run.
#[derive(Debug, Clone)]
pub struct JoinConfig{
    /// Normalize to the smallest image instead of the largest.
    pub downscale: bool,
    /// Normalize height and join left to right instead of normalizing width
    /// and stacking top to bottom.
    pub landscape: bool,
    pub quality: u8,
    pub format: String,
    pub filter: Filter,
    pub trim: bool,
    pub even: bool,
    pub jobs: Option<NonZeroUsize>,
}

impl Default for JoinConfig{
    fn default() -> Self{
        Self{
            downscale: false,
            landscape: false,
            quality: 92,
            format: "jpg".to_string(),
            filter: Filter::Lanczos3,
            trim: true,
            even: false,
            jobs: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Filter{
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<Filter> for FilterType{
    fn from(f: Filter) -> Self{
        match f{
            Filter::Nearest => FilterType::Nearest,
            Filter::Triangle => FilterType::Triangle,
            Filter::CatmullRom => FilterType::CatmullRom,
            Filter::Gaussian => FilterType::Gaussian,
            Filter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

pub fn defaults_path() -> Option<PathBuf>{
    let mut path = dirs::config_dir()?;
    path.push("photojoin");
    path.push("defaults");
    Some(path)
}

/// Splits a defaults file into arguments. `#` comments out the rest of a line.
pub fn parse_defaults(text: &str) -> Vec<OsString>{
    text.lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(str::split_whitespace)
        .map(OsString::from)
        .collect()
}

pub fn read_defaults(path: &Path) -> io::Result<Vec<OsString>>{
    match fs::read_to_string(path){
        Ok(text) => {
            let args = parse_defaults(&text);
            info!("Defaults from {}: {:?}", path.display(), args);
            Ok(args)
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No defaults file at {}", path.display());
            Ok(Vec::new())
        },
        Err(e) => Err(e),
    }
}

/// Puts `defaults` between the program name and the user's own arguments so
/// anything given on the command line overrides them.
pub fn merge_args<I>(mut argv: I, defaults: Vec<OsString>) -> Vec<OsString>
where
    I: Iterator<Item = OsString>,
{
    let mut merged = Vec::new();
    merged.extend(argv.next());
    merged.extend(defaults);
    merged.extend(argv);
    merged
}
