use std::path::{Path, PathBuf};

use crate::AssetError;
use crate::mesh::MeshAsset;
use crate::obj::load_obj;
use crate::primitives;
use crate::ramp::{TextureData, builtin_ramp};

/// Named resource lookup.
///
/// Names resolve first against files in the asset directory (`<name>.obj`,
/// `<name>.png`), then against the built-in primitives and ramps. A name that
/// is itself a path to an existing file is loaded directly.
#[derive(Debug, Clone, Default)]
pub struct AssetLibrary {
    root: Option<PathBuf>,
}

impl AssetLibrary {
    /// Library serving only built-in resources.
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn load_mesh(&self, name: &str) -> Result<MeshAsset, AssetError> {
        let direct = Path::new(name);
        if direct.extension().is_some_and(|e| e.eq_ignore_ascii_case("obj")) && direct.is_file() {
            return load_obj(direct);
        }
        if let Some(path) = self.file(name, "obj") {
            return load_obj(path);
        }
        primitives::builtin(name).ok_or_else(|| AssetError::NotFound(name.to_string()))
    }

    pub fn load_texture(&self, name: &str) -> Result<TextureData, AssetError> {
        if let Some(path) = self.file(name, "png") {
            let image = image::open(&path)?.to_rgba8();
            tracing::debug!(path = %path.display(), "loaded texture");
            return Ok(TextureData {
                name: name.to_string(),
                width: image.width(),
                height: image.height(),
                rgba: image.into_raw(),
            });
        }
        builtin_ramp(name).ok_or_else(|| AssetError::NotFound(name.to_string()))
    }

    fn file(&self, name: &str, extension: &str) -> Option<PathBuf> {
        let path = self.root.as_ref()?.join(name).with_extension(extension);
        path.is_file().then_some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtins_resolve_without_root() {
        let lib = AssetLibrary::builtin();
        assert!(lib.load_mesh("box").is_ok());
        assert!(lib.load_texture("plasma").is_ok());
    }

    #[test]
    fn unknown_names_are_not_found() {
        let lib = AssetLibrary::builtin();
        assert!(matches!(lib.load_mesh("teapot"), Err(AssetError::NotFound(_))));
        assert!(matches!(lib.load_texture("magma"), Err(AssetError::NotFound(_))));
    }

    #[test]
    fn files_in_root_shadow_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("box.obj")).unwrap();
        writeln!(file, "o tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3").unwrap();
        drop(file);

        let lib = AssetLibrary::with_root(dir.path());
        let asset = lib.load_mesh("box").unwrap();
        assert_eq!(asset.first_mesh().unwrap().vertex_count(), 3);
    }

    #[test]
    fn png_in_root_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let img = image::RgbaImage::from_pixel(4, 1, image::Rgba([10, 20, 30, 255]));
        img.save(dir.path().join("custom.png")).unwrap();

        let lib = AssetLibrary::with_root(dir.path());
        let tex = lib.load_texture("custom").unwrap();
        assert_eq!((tex.width, tex.height), (4, 1));
        assert_eq!(tex.texel(3, 0), [10, 20, 30, 255]);
    }
}
