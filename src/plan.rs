use crate::{
    error::JoinError,
    loader::ImageDescriptor,
};

/// The dimension that is forced to a common value across all images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis{
    Width,
    Height,
}

impl Axis{
    /// Landscape strips share a height, portrait strips share a width.
    pub fn for_layout(landscape: bool) -> Self{
        if landscape { Axis::Height } else { Axis::Width }
    }

    pub fn of(self, d: &ImageDescriptor) -> u32{
        match self{
            Axis::Width => d.width,
            Axis::Height => d.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaledPlan{
    pub descriptor: ImageDescriptor,
    pub scale: f64,
}

impl ScaledPlan{
    pub fn scaled_size(&self) -> (u32, u32){
        (scale_dim(self.descriptor.width, self.scale), scale_dim(self.descriptor.height, self.scale))
    }
}

fn scale_dim(v: u32, scale: f64) -> u32{
    (v as f64 * scale).round().max(1.0) as u32
}

/// Computes one scale factor per image so that every image ends up with the
/// same extent on the normalization axis: the smallest one when `downscale`,
/// the largest one otherwise.
pub fn compute_plan(
    descriptors: &[ImageDescriptor],
    downscale: bool,
    landscape: bool,
) -> Result<Vec<ScaledPlan>, JoinError>{
    let axis = Axis::for_layout(landscape);
    let values = descriptors.iter().map(|d| axis.of(d));
    let target = if downscale { values.min() } else { values.max() }
        .ok_or(JoinError::EmptyInput)?;

    for d in descriptors{
        if d.width == 0 || d.height == 0{
            return Err(JoinError::ZeroSized{ path: d.path.clone() });
        }
    }

    Ok(descriptors
        .iter()
        .map(|d| ScaledPlan{
            descriptor: d.clone(),
            scale: target as f64 / axis.of(d) as f64,
        })
        .collect())
}

/// Size of the strip the plans assemble into, as `(width, height)`.
pub fn canvas_size(plans: &[ScaledPlan], landscape: bool) -> Result<(u32, u32), JoinError>{
    strip_size(plans.iter().map(ScaledPlan::scaled_size), landscape)
}

/// Joining along one axis sums that axis and keeps the largest value on the
/// other, so ±1 rounding differences never crop a pixel.
pub fn strip_size<I>(sizes: I, landscape: bool) -> Result<(u32, u32), JoinError>
where
    I: IntoIterator<Item = (u32, u32)>,
{
    let (mut cross, mut along) = (0u64, 0u64);
    for (w, h) in sizes{
        let (w, h) = (w as u64, h as u64);
        if landscape{
            cross = cross.max(h);
            along += w;
        } else {
            cross = cross.max(w);
            along += h;
        }
    }
    let (width, height) = if landscape { (along, cross) } else { (cross, along) };
    match (u32::try_from(width), u32::try_from(height)){
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(JoinError::CanvasTooLarge{ width, height }),
    }
}
