//! Launcher icon generation for every density bucket
//!
//! One `ic_launcher.png` is written to each `drawable-<bucket>` directory.
//! The generator picks the best strategy the host allows:
//!
//! 1. Imaging unavailable, source present: copy the source bytes verbatim
//! 2. Imaging available, source present: fit the source into the bucket
//!    square, centred on a transparent canvas
//! 3. Imaging available, no usable source: synthesize the default icon
//! 4. Neither: no icons, only a warning
//!
//! A source that fails to decode falls back to the default icon.

use std::fs;
use std::path::Path;

use image::{imageops, imageops::FilterType, DynamicImage, ImageFormat, Rgba, RgbaImage};
use tracing::{debug, info, warn};

use crate::config::BuildConfig;
use crate::error::{BuildError, IoResultExt, Result};
use crate::scaffold::ProjectScaffold;

/// File name of the launcher icon inside each drawable directory
pub const ICON_FILE_NAME: &str = "ic_launcher.png";

/// Default icon background (material blue)
const DEFAULT_BACKGROUND: [u8; 3] = [33, 150, 243];

/// Resolution tier for launcher icons
///
/// The set and its order are fixed: Android resolves `drawable-<name>`
/// directories by exactly these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DensityBucket {
    Mdpi,
    Hdpi,
    Xhdpi,
    Xxhdpi,
    Xxxhdpi,
}

impl DensityBucket {
    pub const ALL: [DensityBucket; 5] = [
        DensityBucket::Mdpi,
        DensityBucket::Hdpi,
        DensityBucket::Xhdpi,
        DensityBucket::Xxhdpi,
        DensityBucket::Xxxhdpi,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DensityBucket::Mdpi => "mdpi",
            DensityBucket::Hdpi => "hdpi",
            DensityBucket::Xhdpi => "xhdpi",
            DensityBucket::Xxhdpi => "xxhdpi",
            DensityBucket::Xxxhdpi => "xxxhdpi",
        }
    }

    /// Edge length of the square icon in pixels
    pub fn size(self) -> u32 {
        match self {
            DensityBucket::Mdpi => 48,
            DensityBucket::Hdpi => 72,
            DensityBucket::Xhdpi => 96,
            DensityBucket::Xxhdpi => 144,
            DensityBucket::Xxxhdpi => 192,
        }
    }

    pub fn dir_name(self) -> String {
        format!("drawable-{}", self.name())
    }
}

/// Which icon strategy ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconOutcome {
    /// Source image fitted to every bucket
    Resized,
    /// Default icon drawn programmatically
    Synthesized,
    /// Source bytes copied unmodified to every bucket
    Copied,
    /// No icons written
    Skipped,
}

impl IconOutcome {
    /// Whether every density bucket now holds a launcher icon
    pub fn wrote_icons(self) -> bool {
        !matches!(self, IconOutcome::Skipped)
    }
}

/// Icon processor holding a decoded source image
pub struct IconProcessor {
    source_image: DynamicImage,
}

impl IconProcessor {
    /// Load icon from a file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let img = image::open(path).map_err(|e| BuildError::image(path, e))?;
        Ok(Self { source_image: img })
    }

    /// Draw the default launcher icon
    ///
    /// A horizontal blue gradient whose alpha ramps from transparent on the
    /// left to opaque on the right, with a centred white circle whose
    /// diameter is half the edge length. Output depends only on `size`.
    pub fn create_default(size: u32) -> Self {
        let mut img = RgbaImage::new(size, size);
        let centre = size as f32 / 2.0;
        let radius = size as f32 / 4.0;
        let [r, g, b] = DEFAULT_BACKGROUND;

        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let dx = x as f32 + 0.5 - centre;
            let dy = y as f32 + 0.5 - centre;

            *pixel = if dx * dx + dy * dy <= radius * radius {
                Rgba([255, 255, 255, 255])
            } else {
                let alpha = (255 * x / size) as u8;
                Rgba([r, g, b, alpha])
            };
        }

        Self {
            source_image: DynamicImage::ImageRgba8(img),
        }
    }

    /// Get the source image dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.source_image.width(), self.source_image.height())
    }

    /// Scale the source to fit a `size` square and centre it on a transparent canvas
    ///
    /// The longest edge becomes `size`; the aspect ratio is preserved.
    pub fn fit_square(&self, size: u32) -> RgbaImage {
        let scaled = if self.dimensions() == (size, size) {
            self.source_image.to_rgba8()
        } else {
            self.source_image
                .resize(size, size, FilterType::Lanczos3)
                .to_rgba8()
        };

        let mut canvas = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));
        let x_offset = (size - scaled.width().min(size)) / 2;
        let y_offset = (size - scaled.height().min(size)) / 2;
        imageops::replace(&mut canvas, &scaled, x_offset as i64, y_offset as i64);
        canvas
    }

    /// Fit to a `size` square and save as PNG
    pub fn save_fitted(&self, path: &Path, size: u32) -> Result<()> {
        save_png(&self.fit_square(size), path)
    }
}

fn save_png(img: &RgbaImage, path: &Path) -> Result<()> {
    img.save_with_format(path, ImageFormat::Png)
        .map_err(|e| BuildError::image(path, e))
}

/// Write one launcher icon per density bucket
pub fn generate_icons(scaffold: &ProjectScaffold, config: &BuildConfig) -> Result<IconOutcome> {
    let source = config.icon.as_deref().filter(|p| p.is_file());
    if let (Some(requested), None) = (config.icon.as_deref(), source) {
        warn!("Icon not found at {}, using default icons", requested.display());
    }

    let outcome = match (config.imaging.is_available(), source) {
        (false, Some(path)) => {
            copy_icon_directly(scaffold, path)?;
            IconOutcome::Copied
        }
        (false, None) => {
            warn!("Image processing unavailable and no icon supplied, building without icons");
            IconOutcome::Skipped
        }
        (true, Some(path)) => match IconProcessor::from_path(path) {
            Ok(processor) => {
                for bucket in DensityBucket::ALL {
                    let dest = scaffold.drawable_dir(bucket).join(ICON_FILE_NAME);
                    processor.save_fitted(&dest, bucket.size())?;
                    debug!("Icon {}x{} written to {}", bucket.size(), bucket.size(), dest.display());
                }
                IconOutcome::Resized
            }
            Err(e) => {
                warn!("Failed to process icon {}: {}; using default icons", path.display(), e);
                create_default_icons(scaffold)?;
                IconOutcome::Synthesized
            }
        },
        (true, None) => {
            create_default_icons(scaffold)?;
            IconOutcome::Synthesized
        }
    };

    info!("Icons: {:?}", outcome);
    Ok(outcome)
}

fn create_default_icons(scaffold: &ProjectScaffold) -> Result<()> {
    for bucket in DensityBucket::ALL {
        let dest = scaffold.drawable_dir(bucket).join(ICON_FILE_NAME);
        let processor = IconProcessor::create_default(bucket.size());
        processor.save_fitted(&dest, bucket.size())?;
    }
    Ok(())
}

fn copy_icon_directly(scaffold: &ProjectScaffold, source: &Path) -> Result<()> {
    for bucket in DensityBucket::ALL {
        let dest = scaffold.drawable_dir(bucket).join(ICON_FILE_NAME);
        fs::copy(source, &dest).with_path("copy icon", source)?;
    }
    info!("Icon copied to all densities without resizing");
    Ok(())
}
