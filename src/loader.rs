use std::path::{ Path, PathBuf };

use image::{
    imageops::FilterType,
    DynamicImage,
    GenericImageView,
    ImageBuffer,
    ImageError,
    ImageReader as IR,
    Pixel,
};
use log::{ debug, info, warn };
use rayon::ThreadPool;

use crate::{
    config::JoinConfig,
    error::JoinError,
    pool,
};

/// Size of one input image after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor{
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// A decoded input and its descriptor. The pixels are the trimmed ones, so the
/// engine never has to decode a file twice.
#[derive(Debug, Clone)]
pub struct LoadedImage{
    pub descriptor: ImageDescriptor,
    pub image: DynamicImage,
}

pub fn load_images(
    pool: &ThreadPool,
    files: &[PathBuf],
    config: &JoinConfig,
) -> Result<Vec<LoadedImage>, JoinError>{
    if files.is_empty(){
        return Err(JoinError::EmptyInput);
    }
    let paths: Vec<&PathBuf> = files.iter().collect();
    pool::map_ordered(pool, paths, |path| load_image(path, config))
}

pub fn load_image(path: &Path, config: &JoinConfig) -> Result<LoadedImage, JoinError>{
    let decode = |source: ImageError| JoinError::Decode{ path: path.to_path_buf(), source };
    let mut image = IR::open(path)
        .map_err(|e| decode(ImageError::IoError(e)))?
        .with_guessed_format()
        .map_err(|e| decode(ImageError::IoError(e)))?
        .decode()
        .map_err(decode)?;

    let (w, h) = image.dimensions();
    if w == 0 || h == 0{
        return Err(JoinError::ZeroSized{ path: path.to_path_buf() });
    }

    let has_alpha = image.color().has_alpha();
    if config.trim && has_alpha{
        match scan_alpha(&image){
            AlphaScan::Bounds(x, y, tw, th) => {
                image = image.crop_imm(x, y, tw, th);
                debug!("{}: trimmed {w}x{h} -> {tw}x{th}", path.display());
            },
            AlphaScan::FullyTransparent => {
                warn!("{} is fully transparent, keeping it untrimmed", path.display());
            },
            AlphaScan::Nothing => {},
        }
    }
    if config.even && has_alpha{
        image = even_dimensions(image);
    }

    let (width, height) = image.dimensions();
    info!("Loaded {} ({width}x{height})", path.display());
    Ok(LoadedImage{
        descriptor: ImageDescriptor{ path: path.to_path_buf(), width, height },
        image,
    })
}

/// Outcome of looking for the visible part of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaScan{
    /// No alpha channel, or no transparent border around the visible pixels.
    Nothing,
    FullyTransparent,
    /// `(x, y, width, height)` of the pixels whose alpha is not zero.
    Bounds(u32, u32, u32, u32),
}

/// Finds the visible bounding box in one pass, reading alpha at the image's
/// own depth so faint 16-bit and float alpha still counts as visible.
pub fn scan_alpha(image: &DynamicImage) -> AlphaScan{
    match image{
        DynamicImage::ImageLumaA8(buf) => visible_bounds(buf, |p| p.0[1] != 0),
        DynamicImage::ImageRgba8(buf) => visible_bounds(buf, |p| p.0[3] != 0),
        DynamicImage::ImageLumaA16(buf) => visible_bounds(buf, |p| p.0[1] != 0),
        DynamicImage::ImageRgba16(buf) => visible_bounds(buf, |p| p.0[3] != 0),
        DynamicImage::ImageRgba32F(buf) => visible_bounds(buf, |p| p.0[3] != 0.0),
        _ => AlphaScan::Nothing,
    }
}

fn visible_bounds<P, F>(buf: &ImageBuffer<P, Vec<P::Subpixel>>, visible: F) -> AlphaScan
where
    P: Pixel,
    F: Fn(&P) -> bool,
{
    let mut min = (u32::MAX, u32::MAX);
    let mut max = (0, 0);
    for (x, y, px) in buf.enumerate_pixels(){
        if visible(px){
            min = (min.0.min(x), min.1.min(y));
            max = (max.0.max(x), max.1.max(y));
        }
    }
    if min.0 > max.0{
        return AlphaScan::FullyTransparent;
    }
    let bbox = (min.0, min.1, max.0 - min.0 + 1, max.1 - min.1 + 1);
    if bbox == (0, 0, buf.width(), buf.height()){
        return AlphaScan::Nothing;
    }
    AlphaScan::Bounds(bbox.0, bbox.1, bbox.2, bbox.3)
}

/// The visible bounding box, if there is a transparent border to cut.
pub fn trim_transparent(image: &DynamicImage) -> Option<(u32, u32, u32, u32)>{
    match scan_alpha(image){
        AlphaScan::Bounds(x, y, w, h) => Some((x, y, w, h)),
        _ => None,
    }
}

/// Shrinks odd dimensions by one pixel. A dimension of 1 is left alone.
/// Applied to every image with an alpha channel, trimmed or not.
pub fn even_dimensions(image: DynamicImage) -> DynamicImage{
    let (w, h) = image.dimensions();
    let even = |v: u32| if v > 1 { v - v % 2 } else { v };
    let (ew, eh) = (even(w), even(h));
    if (ew, eh) == (w, h){
        return image;
    }
    image.resize_exact(ew, eh, FilterType::Lanczos3)
}
