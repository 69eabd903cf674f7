//! Image decoding into `ImageData` and bulk texture registration.

use std::sync::Arc;

use crate::device::RenderDevice;
use crate::error::{EngineError, Result};
use crate::resources::Registry;
use crate::scene::{ImageData, Texture};

use super::{join, AssetSource};

/// Decodes a PNG or JPEG held in memory into RGBA8.
pub fn decode_image(path: &str, bytes: &[u8]) -> Result<ImageData> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| EngineError::asset(path, e))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    let data = ImageData::new(width, height, image.into_raw());
    data.validate(path)?;
    Ok(data)
}

pub fn load_image(source: &dyn AssetSource, path: &str) -> Result<ImageData> {
    decode_image(path, &source.read(path)?)
}

/// Uploads one image and registers it under `name`.
pub fn load_texture<D: RenderDevice>(
    device: &mut D,
    source: &dyn AssetSource,
    path: &str,
    name: &str,
    textures: &mut Registry<Texture<D>>,
) -> Result<Arc<Texture<D>>> {
    let image = load_image(source, path)?;
    let texture = Arc::new(Texture::upload(device, name, &image)?);
    textures.add(name, Arc::clone(&texture));
    Ok(texture)
}

/// Loads every file in `dir` ending with `extension`, registering each as
/// `prefix + file name`. Returns the registered names in listing order.
///
/// The first undecodable file aborts the load.
pub fn load_textures<D: RenderDevice>(
    device: &mut D,
    source: &dyn AssetSource,
    dir: &str,
    extension: &str,
    prefix: &str,
    textures: &mut Registry<Texture<D>>,
) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for file in source.list(dir)? {
        if !file.ends_with(extension) {
            continue;
        }
        let name = format!("{prefix}{file}");
        load_texture(device, source, &join(dir, &file), &name, textures)?;
        names.push(name);
    }
    log::info!("loaded {} textures from {dir}", names.len());
    Ok(names)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::assets::MemoryAssetSource;
    use crate::device::SoftwareDevice;
    use crate::resources::Category;

    fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn decodes_png_to_rgba8() {
        let data = decode_image("red.png", &png(3, 2, [255, 0, 0, 255])).unwrap();
        assert_eq!((data.width, data.height), (3, 2));
        assert_eq!(data.texel(2, 1), [255, 0, 0, 255]);
    }

    #[test]
    fn garbage_is_an_asset_error() {
        let err = decode_image("junk.png", b"not an image").unwrap_err();
        assert!(matches!(err, EngineError::Asset { path, .. } if path == "junk.png"));
    }

    #[test]
    fn directory_load_filters_by_extension_and_prefixes_names() {
        let mut assets = MemoryAssetSource::new();
        assets
            .insert("textures/wall.png", png(1, 1, [10, 20, 30, 255]))
            .insert("textures/floor.png", png(2, 2, [1, 2, 3, 255]))
            .insert("textures/readme.txt", "not a texture");

        let mut device = SoftwareDevice::new();
        let mut registry = Registry::new(Category::Texture);
        let names = load_textures(
            &mut device,
            &assets,
            "textures",
            "png",
            "textures/",
            &mut registry,
        )
        .unwrap();

        assert_eq!(names, ["textures/floor.png", "textures/wall.png"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("textures/floor.png").unwrap().size(), (2, 2));
    }

    #[test]
    fn missing_directory_propagates() {
        let assets = MemoryAssetSource::new();
        let mut device = SoftwareDevice::new();
        let mut registry = Registry::new(Category::Texture);
        let err = load_textures(&mut device, &assets, "none", "png", "", &mut registry).unwrap_err();
        assert!(matches!(err, EngineError::AssetNotFound { .. }));
    }
}
