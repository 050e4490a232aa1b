//! Local UI icons and remote condition icons, decoded into GUI-independent bitmaps.

use image::imageops::FilterType;
use std::{collections::HashMap, fs, path::PathBuf};
use tracing::warn;

use crate::error::AssetLoadError;

/// Edge length of the small UI icons.
pub const ICON_SIZE: u32 = 24;

/// RGBA8 pixels, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bitmap({}x{})", self.width, self.height)
    }
}

impl From<image::RgbaImage> for Bitmap {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self { width, height, rgba: img.into_raw() }
    }
}

/// Where the shell's fixed icons come from.
pub trait IconSource: Send + Sync {
    fn load_icon(&self, name: &str) -> Result<Bitmap, AssetLoadError>;
}

/// Reads icon files from a directory and shrinks them to [`ICON_SIZE`].
#[derive(Debug, Clone)]
pub struct DirIconSource {
    dir: PathBuf,
}

impl DirIconSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl IconSource for DirIconSource {
    fn load_icon(&self, name: &str) -> Result<Bitmap, AssetLoadError> {
        let path = self.dir.join(name);
        let bytes = fs::read(&path).map_err(|source| AssetLoadError::Io { path, source })?;

        let img = image::load_from_memory(&bytes)
            .map_err(|source| AssetLoadError::Decode { name: name.to_string(), source })?;

        let resized = img.resize_exact(ICON_SIZE, ICON_SIZE, FilterType::Lanczos3);
        Ok(resized.to_rgba8().into())
    }
}

/// Decode a condition icon fetched from the provider. Kept at its native size.
pub fn decode_condition_icon(code: &str, bytes: &[u8]) -> Result<Bitmap, AssetLoadError> {
    let img = image::load_from_memory(bytes)
        .map_err(|source| AssetLoadError::Decode { name: code.to_string(), source })?;
    Ok(img.to_rgba8().into())
}

/// The fixed icons the shell draws next to its labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiIcon {
    Search,
    Thermometer,
    Humidity,
    Wind,
    Leaf,
    MapPin,
    Clock,
    Sunrise,
    Sunset,
    Pressure,
}

impl UiIcon {
    pub const fn all() -> &'static [UiIcon] {
        &[
            UiIcon::Search,
            UiIcon::Thermometer,
            UiIcon::Humidity,
            UiIcon::Wind,
            UiIcon::Leaf,
            UiIcon::MapPin,
            UiIcon::Clock,
            UiIcon::Sunrise,
            UiIcon::Sunset,
            UiIcon::Pressure,
        ]
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            UiIcon::Search => "search.png",
            UiIcon::Thermometer => "thermometer.png",
            UiIcon::Humidity => "droplets.png",
            UiIcon::Wind => "wind.png",
            UiIcon::Leaf => "leaf.png",
            UiIcon::MapPin => "map-pin.png",
            UiIcon::Clock => "clock.png",
            UiIcon::Sunrise => "sunrise.png",
            UiIcon::Sunset => "sunset.png",
            UiIcon::Pressure => "gauge.png",
        }
    }
}

/// Icons loaded once at startup. Missing or broken files are simply absent.
#[derive(Debug, Default)]
pub struct IconSet {
    icons: HashMap<UiIcon, Bitmap>,
}

impl IconSet {
    pub fn load(source: &dyn IconSource) -> Self {
        let mut icons = HashMap::new();
        for icon in UiIcon::all() {
            match source.load_icon(icon.file_name()) {
                Ok(bitmap) => {
                    icons.insert(*icon, bitmap);
                }
                Err(err) => warn!(icon = icon.file_name(), error = %err, "icon unavailable"),
            }
        }
        Self { icons }
    }

    pub fn get(&self, icon: UiIcon) -> Option<&Bitmap> {
        self.icons.get(&icon)
    }

    pub fn iter(&self) -> impl Iterator<Item = (UiIcon, &Bitmap)> {
        self.icons.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}
