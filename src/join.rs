use std::{
    fs,
    io,
    path::{ Path, PathBuf },
};

use log::{ info, warn };

use crate::{
    compose,
    config::JoinConfig,
    error::JoinError,
    loader::{ self, LoadedImage },
    plan::{ self, ScaledPlan },
    pool,
    timer::Timer,
};

/// Loads, scales and joins `files` into one encoded image blob.
pub fn join_images(files: &[PathBuf], config: &JoinConfig) -> Result<Vec<u8>, JoinError>{
    if files.is_empty(){
        return Err(JoinError::EmptyInput);
    }
    // an unknown format should fail before any decoding work
    let format = compose::output_format(&config.format)?;
    if config.quality > 100{
        return Err(JoinError::InvalidQuality(config.quality));
    }

    let mut timer = Timer::new();
    let pool = pool::build(config.jobs)?;
    let (images, plans) = load_and_plan(&pool, files, config)?;
    timer.lap("load");

    let scaled = compose::resample_all(&pool, images, &plans, config.filter.into())?;
    timer.lap("resample");

    let canvas = compose::compose(&scaled, config.landscape)?;
    drop(scaled);
    timer.lap("compose");

    let blob = compose::encode_blob(canvas, format, config.quality)?;
    timer.lap("encode");
    info!("Joined {} images in {}ms", files.len(), timer.total().as_millis());
    Ok(blob)
}

fn load_and_plan(
    pool: &rayon::ThreadPool,
    files: &[PathBuf],
    config: &JoinConfig,
) -> Result<(Vec<LoadedImage>, Vec<ScaledPlan>), JoinError>{
    let images = loader::load_images(pool, files, config)?;
    let descriptors: Vec<_> = images.iter().map(|l| l.descriptor.clone()).collect();
    let plans = plan::compute_plan(&descriptors, config.downscale, config.landscape)?;
    Ok((images, plans))
}

/// Loads and plans without resampling or writing anything.
pub fn dry_run(files: &[PathBuf], config: &JoinConfig) -> Result<(Vec<ScaledPlan>, (u32, u32)), JoinError>{
    let pool = pool::build(config.jobs)?;
    let (_, plans) = load_and_plan(&pool, files, config)?;
    let canvas = plan::canvas_size(&plans, config.landscape)?;
    Ok((plans, canvas))
}

pub fn report(plans: &[ScaledPlan], canvas: (u32, u32)) -> String{
    let mut out = String::new();
    for p in plans{
        let (w, h) = p.scaled_size();
        out.push_str(&format!(
            "{}: {}x{} * {:.4} -> {w}x{h}\n",
            p.descriptor.path.display(), p.descriptor.width, p.descriptor.height, p.scale,
        ));
    }
    out.push_str(&format!("canvas: {}x{}\n", canvas.0, canvas.1));
    out
}

/// `name` plus the format used verbatim as the extension.
pub fn output_path(name: &str, format: &str) -> PathBuf{
    PathBuf::from(format!("{name}.{format}"))
}

/// Writes the blob, removing whatever was written if that fails half way.
pub fn write_output(path: &Path, blob: &[u8]) -> Result<(), JoinError>{
    if let Err(source) = fs::write(path, blob){
        match fs::remove_file(path){
            Ok(()) => warn!("Removed partial output {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {},
            Err(e) => warn!("Could not remove partial output {}: {e}", path.display()),
        }
        return Err(JoinError::Write{ path: path.to_path_buf(), source });
    }
    info!("Wrote {} ({} bytes)", path.display(), blob.len());
    Ok(())
}

#[cfg(test)]
mod tests{
    use super::*;
    use image::{ GenericImageView, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage };
    use std::num::NonZeroUsize;

    fn write_png(dir: &Path, name: &str, img: RgbImage) -> PathBuf{
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    fn png_config() -> JoinConfig{
        JoinConfig{
            format: "png".to_string(),
            filter: crate::config::Filter::Nearest,
            jobs: NonZeroUsize::new(2),
            ..JoinConfig::default()
        }
    }

    #[test]
    fn tall_and_wide_make_200_by_500(){
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write_png(dir.path(), "tall.png", RgbImage::from_pixel(100, 200, Rgb([255, 0, 0]))),
            write_png(dir.path(), "wide.png", RgbImage::from_pixel(200, 100, Rgb([0, 0, 255]))),
        ];
        let blob = join_images(&files, &png_config()).unwrap();
        let strip = image::load_from_memory_with_format(&blob, ImageFormat::Png).unwrap();
        assert_eq!(strip.dimensions(), (200, 500));
        assert_eq!(strip.get_pixel(100, 399).0, [255, 0, 0, 255]);
        assert_eq!(strip.get_pixel(100, 400).0, [0, 0, 255, 255]);
    }

    #[test]
    fn landscape_puts_first_image_on_the_left(){
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write_png(dir.path(), "a.png", RgbImage::from_pixel(10, 20, Rgb([10, 10, 10]))),
            write_png(dir.path(), "b.png", RgbImage::from_pixel(30, 10, Rgb([20, 20, 20]))),
            write_png(dir.path(), "c.png", RgbImage::from_pixel(5, 5, Rgb([30, 30, 30]))),
        ];
        let config = JoinConfig{ landscape: true, ..png_config() };
        let blob = join_images(&files, &config).unwrap();
        let strip = image::load_from_memory(&blob).unwrap();
        // heights normalized to 20: 10x20, 60x20, 20x20
        assert_eq!(strip.dimensions(), (90, 20));
        assert_eq!(strip.get_pixel(0, 0)[0], 10);
        assert_eq!(strip.get_pixel(10, 0)[0], 20);
        assert_eq!(strip.get_pixel(89, 19)[0], 30);
    }

    #[test]
    fn transparent_border_does_not_count(){
        let dir = tempfile::tempdir().unwrap();
        let bordered = dir.path().join("bordered.png");
        RgbaImage::from_fn(110, 110, |x, y| {
            let inside = (10..100).contains(&x) && (10..100).contains(&y);
            if inside { Rgba([1, 2, 3, 255]) } else { Rgba([0, 0, 0, 0]) }
        }).save(&bordered).unwrap();
        let small = write_png(dir.path(), "small.png", RgbImage::from_pixel(45, 45, Rgb([0, 0, 0])));

        let (plans, canvas) = dry_run(&[bordered, small], &png_config()).unwrap();
        assert_eq!(plans[0].scale, 1.0);
        assert_eq!(plans[1].scale, 2.0);
        assert_eq!(canvas, (90, 180));
    }

    #[test]
    fn empty_input_writes_nothing(){
        let dir = tempfile::tempdir().unwrap();
        let err = join_images(&[], &png_config()).unwrap_err();
        assert!(matches!(err, JoinError::EmptyInput));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn bad_input_fails_the_whole_batch(){
        let dir = tempfile::tempdir().unwrap();
        let good = write_png(dir.path(), "good.png", RgbImage::new(4, 4));
        let missing = dir.path().join("missing.png");
        let err = join_images(&[good, missing.clone()], &png_config()).unwrap_err();
        match err{
            JoinError::Decode{ path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_format_is_rejected_up_front(){
        let config = JoinConfig{ format: "doc".to_string(), ..png_config() };
        let err = join_images(&[PathBuf::from("/not/read.png")], &config).unwrap_err();
        assert!(matches!(err, JoinError::UnsupportedFormat(_)));
    }

    #[test]
    fn report_lists_every_image(){
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write_png(dir.path(), "one.png", RgbImage::new(10, 10)),
            write_png(dir.path(), "two.png", RgbImage::new(20, 5)),
        ];
        let (plans, canvas) = dry_run(&files, &png_config()).unwrap();
        let text = report(&plans, canvas);
        assert!(text.contains("one.png: 10x10 * 2.0000 -> 20x20"));
        assert!(text.contains("two.png: 20x5 * 1.0000 -> 20x5"));
        assert!(text.ends_with("canvas: 20x25\n"));
    }

    #[test]
    fn output_is_written_and_named(){
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("strip");
        let path = output_path(name.to_str().unwrap(), "jpg");
        assert_eq!(path, dir.path().join("strip.jpg"));

        write_output(&path, b"blob").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"blob");
    }

    #[test]
    fn unwritable_output_leaves_no_file(){
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/strip.jpg");
        let err = write_output(&path, b"blob").unwrap_err();
        assert!(matches!(err, JoinError::Write{ .. }));
        assert!(!path.exists());
    }
}
