//! Pure Rust image backend on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` |
//! | Channel reduction | `to_luma8` / `to_rgb8` / `to_rgba8` |
//! | Encode | `DynamicImage::save_with_format` |
//! | Display | temporary PNG + platform opener (`xdg-open`, `open`, `start`) |
//!
//! ## Decoded layouts
//!
//! | Source | Buffer |
//! |---|---|
//! | gray, any depth | [`ChannelLayout::Gray`] |
//! | anything with alpha (incl. gray + alpha) | [`ChannelLayout::Rgba`] |
//! | other color | [`ChannelLayout::Rgb`] |
//!
//! 16-bit and float sources are reduced to the 8-bit range on decode.
//!
//! ## Previews
//!
//! `display` hands the viewer a PNG in the system temp dir named
//! `image-layers-<pid>-<nanos>.png`. The viewer runs detached and may still
//! be reading the file when the call returns, so it is left in place. Each
//! `display` first removes previews older than [`PREVIEW_MAX_AGE`].

use super::backend::{BackendError, ImageBackend};
use crate::buffer::{ChannelLayout, PixelBuffer};
use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, RgbImage, RgbaImage};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const PREVIEW_PREFIX: &str = "image-layers-";

/// Previews older than this are removed at the next `display`.
pub const PREVIEW_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Extensions whose codecs are compiled in.
const SUPPORTED_FORMATS: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

/// Returns the set of image file extensions that can be read and written.
pub fn supported_extensions() -> Vec<&'static str> {
    SUPPORTED_FORMATS.iter().map(|(ext, _)| *ext).collect()
}

fn format_for_path(path: &Path) -> Option<ImageFormat> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    SUPPORTED_FORMATS
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, fmt)| *fmt)
}

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Default)]
pub struct RustBackend {
    viewer: Option<String>,
}

impl RustBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `viewer` instead of the platform opener for [`display`](ImageBackend::display).
    pub fn with_viewer(viewer: Option<String>) -> Self {
        Self { viewer }
    }
}

/// Convert a decoded image into a buffer, choosing the layout by color type.
pub fn buffer_from_image(img: &DynamicImage) -> Result<PixelBuffer, BackendError> {
    let color = img.color();
    let (width, height) = (img.width() as usize, img.height() as usize);
    let (layout, bytes) = if color.has_alpha() {
        (ChannelLayout::Rgba, img.to_rgba8().into_raw())
    } else if color.has_color() {
        (ChannelLayout::Rgb, img.to_rgb8().into_raw())
    } else {
        (ChannelLayout::Gray, img.to_luma8().into_raw())
    };
    let samples = bytes.into_iter().map(f32::from).collect();
    PixelBuffer::from_samples(width, height, layout, samples)
        .map_err(|e| BackendError::Open(e.to_string()))
}

/// Materialize a buffer as an 8-bit image (samples are rounded and clamped).
pub fn image_from_buffer(buffer: &PixelBuffer) -> Result<DynamicImage, BackendError> {
    let (w, h) = (buffer.width() as u32, buffer.height() as u32);
    let bytes = buffer.to_bytes();
    let img = match buffer.layout() {
        ChannelLayout::Gray => GrayImage::from_raw(w, h, bytes).map(DynamicImage::ImageLuma8),
        ChannelLayout::Rgb => RgbImage::from_raw(w, h, bytes).map(DynamicImage::ImageRgb8),
        ChannelLayout::Rgba => RgbaImage::from_raw(w, h, bytes).map(DynamicImage::ImageRgba8),
    };
    img.ok_or_else(|| BackendError::Save("buffer does not match its dimensions".into()))
}

/// Write `buffer` to `path` in `format`, dropping alpha where the format
/// has none.
fn save_buffer(buffer: &PixelBuffer, path: &Path, format: ImageFormat) -> Result<(), BackendError> {
    let img = image_from_buffer(buffer)?;
    let img = if format == ImageFormat::Jpeg && buffer.layout().has_alpha() {
        log::debug!("dropping alpha channel for JPEG output");
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        img
    };
    img.save_with_format(path, format)
        .map_err(|e| BackendError::Save(format!("{}: {}", path.display(), e)))
}

/// Default program used to open a file on this platform.
fn platform_opener() -> Command {
    if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else {
        Command::new("xdg-open")
    }
}

fn preview_path(dir: &Path) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    dir.join(format!(
        "{}{}-{}.png",
        PREVIEW_PREFIX,
        std::process::id(),
        stamp
    ))
}

fn is_preview(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(PREVIEW_PREFIX) && name.ends_with(".png")
}

/// Remove preview files in `dir` last modified at least `max_age` ago.
/// Returns how many were removed; unreadable entries are skipped.
pub fn prune_previews(dir: &Path, max_age: Duration) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    let mut removed = 0;
    for path in entries.flatten().map(|e| e.path()) {
        if !is_preview(&path) {
            continue;
        }
        let age = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .map(|t| t.elapsed().unwrap_or_default());
        if age.is_some_and(|age| age >= max_age) && std::fs::remove_file(&path).is_ok() {
            log::debug!("removed stale preview {}", path.display());
            removed += 1;
        }
    }
    removed
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<PixelBuffer, BackendError> {
        log::debug!("decoding {}", path.display());
        let img = ImageReader::open(path)
            .map_err(|e| BackendError::Open(format!("{}: {}", path.display(), e)))?
            .with_guessed_format()
            .map_err(|e| BackendError::Open(format!("{}: {}", path.display(), e)))?
            .decode()
            .map_err(|e| BackendError::Open(format!("{}: {}", path.display(), e)))?;
        buffer_from_image(&img)
    }

    fn encode(&self, buffer: &PixelBuffer, path: &Path) -> Result<(), BackendError> {
        let format = format_for_path(path).ok_or_else(|| {
            BackendError::Save(format!(
                "{}: unsupported output format (expected one of {})",
                path.display(),
                supported_extensions().join(", ")
            ))
        })?;
        log::debug!("encoding {} as {:?}", path.display(), format);
        save_buffer(buffer, path, format)
    }

    fn display(&self, buffer: &PixelBuffer) -> Result<(), BackendError> {
        let dir = std::env::temp_dir();
        prune_previews(&dir, PREVIEW_MAX_AGE);
        let path = preview_path(&dir);
        save_buffer(buffer, &path, ImageFormat::Png)?;

        let mut cmd = match &self.viewer {
            Some(viewer) => Command::new(viewer),
            None => platform_opener(),
        };
        log::debug!("displaying {} with {:?}", path.display(), cmd.get_program());
        cmd.arg(&path)
            .spawn()
            .map_err(|e| BackendError::Display(format!("{:?}: {}", cmd.get_program(), e)))?;
        Ok(())
    }
}
