use std::io::Cursor;

use image::{
    codecs::{
        jpeg::JpegEncoder,
        png::{ self, CompressionType, PngEncoder },
    },
    imageops::{ self, FilterType },
    DynamicImage,
    ImageFormat,
    Rgb,
    RgbImage,
    RgbaImage,
};
use log::{ debug, info };
use rayon::ThreadPool;

use crate::{
    error::JoinError,
    loader::LoadedImage,
    plan::{ self, ScaledPlan },
    pool,
};

/// Converts every image to RGBA8 and resamples it to its planned size.
/// The output has the same order as `images`.
pub fn resample_all(
    pool: &ThreadPool,
    images: Vec<LoadedImage>,
    plans: &[ScaledPlan],
    filter: FilterType,
) -> Result<Vec<RgbaImage>, JoinError>{
    let jobs: Vec<(LoadedImage, &ScaledPlan)> = images.into_iter().zip(plans).collect();
    pool::map_ordered(pool, jobs, |(loaded, p)| Ok(resample(loaded, p, filter)))
}

pub fn resample(loaded: LoadedImage, plan: &ScaledPlan, filter: FilterType) -> RgbaImage{
    let (w, h) = plan.scaled_size();
    let rgba = loaded.image.into_rgba8();
    if rgba.dimensions() == (w, h){
        return rgba;
    }
    debug!(
        "{}: {}x{} * {:.4} -> {w}x{h}",
        loaded.descriptor.path.display(), rgba.width(), rgba.height(), plan.scale,
    );
    imageops::resize(&rgba, w, h, filter)
}

/// Appends the images edge to edge, in order: top to bottom for portrait
/// strips, left to right for landscape ones.
pub fn compose(images: &[RgbaImage], landscape: bool) -> Result<RgbaImage, JoinError>{
    if images.is_empty(){
        return Err(JoinError::EmptyInput);
    }
    let (width, height) = plan::strip_size(images.iter().map(|i| i.dimensions()), landscape)?;
    let mut canvas = RgbaImage::new(width, height);
    let mut offset = 0i64;
    for img in images{
        if landscape{
            imageops::replace(&mut canvas, img, offset, 0);
            offset += img.width() as i64;
        } else {
            imageops::replace(&mut canvas, img, 0, offset);
            offset += img.height() as i64;
        }
    }
    info!("Composed {} images into {width}x{height}", images.len());
    Ok(canvas)
}

pub fn output_format(ext: &str) -> Result<ImageFormat, JoinError>{
    ImageFormat::from_extension(ext)
        .filter(ImageFormat::can_write)
        .ok_or_else(|| JoinError::UnsupportedFormat(ext.to_string()))
}

/// Encodes the canvas into an in-memory blob. Quality drives the JPEG
/// quantizer and the PNG zlib effort; other formats ignore it.
pub fn encode_blob(canvas: RgbaImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>, JoinError>{
    if quality > 100{
        return Err(JoinError::InvalidQuality(quality));
    }
    let mut blob = Vec::new();
    match format{
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(flatten(&canvas));
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut blob, quality.max(1)))
                .map_err(JoinError::Encode)?;
        },
        ImageFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut blob, png_compression(quality), png::FilterType::Adaptive,
            );
            DynamicImage::ImageRgba8(canvas).write_with_encoder(encoder)
                .map_err(JoinError::Encode)?;
        },
        other => {
            debug!("{other:?} has no quality setting, ignoring {quality}");
            encodable(canvas, other).write_to(&mut Cursor::new(&mut blob), other)
                .map_err(JoinError::Encode)?;
        },
    }
    debug!("Encoded {} bytes as {format:?}", blob.len());
    Ok(blob)
}

/// ImageMagick reads the tens digit of a PNG quality as the zlib level.
fn png_compression(quality: u8) -> CompressionType{
    match quality / 10{
        0..=3 => CompressionType::Fast,
        4..=7 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Converts the canvas to a pixel layout the encoder for `format` accepts.
fn encodable(canvas: RgbaImage, format: ImageFormat) -> DynamicImage{
    match format{
        ImageFormat::Pnm => DynamicImage::ImageRgb8(flatten(&canvas)),
        ImageFormat::Hdr => DynamicImage::ImageRgb8(flatten(&canvas)).to_rgb32f().into(),
        ImageFormat::OpenExr => DynamicImage::ImageRgba8(canvas).to_rgba32f().into(),
        ImageFormat::Farbfeld => DynamicImage::ImageRgba8(canvas).to_rgba16().into(),
        _ => DynamicImage::ImageRgba8(canvas),
    }
}

/// Blends the canvas onto white, for encoders without an alpha channel.
pub fn flatten(canvas: &RgbaImage) -> RgbImage{
    RgbImage::from_fn(canvas.width(), canvas.height(), |x, y| {
        let [r, g, b, a] = canvas.get_pixel(x, y).0;
        let a = a as u16;
        let blend = |c: u8| ((c as u16 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
