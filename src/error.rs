use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JoinError{
    #[error("no images supplied")]
    EmptyInput,

    #[error("could not decode {}: {source}", .path.display())]
    Decode{
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{} has a zero width or height", .path.display())]
    ZeroSized{ path: PathBuf },

    #[error("unsupported output format '{0}'")]
    UnsupportedFormat(String),

    #[error("quality {0} is out of range 0-100")]
    InvalidQuality(u8),

    #[error("could not encode output: {0}")]
    Encode(#[source] image::ImageError),

    #[error("could not write {}: {source}", .path.display())]
    Write{
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("canvas of {width}x{height} is too large")]
    CanvasTooLarge{ width: u64, height: u64 },

    #[error("could not start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
