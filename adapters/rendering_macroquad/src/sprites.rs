use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use macroquad::texture::Texture2D;
use outbreak_rendering::SpriteKey;

const SUPPORTED_MANIFEST_VERSION: u32 = 1;
const ALL_SPRITE_KEYS: [SpriteKey; 8] = [
    SpriteKey::Background,
    SpriteKey::Box,
    SpriteKey::Landmine,
    SpriteKey::Player,
    SpriteKey::Rock,
    SpriteKey::Zombie,
    SpriteKey::ZombieWalking,
    SpriteKey::ZombieDead,
];

/// Cache of textures loaded from the sprite manifest.
#[derive(Debug)]
pub struct SpriteAtlas {
    textures: HashMap<SpriteKey, Texture2D>,
}

impl SpriteAtlas {
    /// Loads the default sprite manifest from disk.
    pub fn from_default_manifest() -> Result<Self> {
        Self::from_manifest_path(Self::default_manifest_path())
    }

    /// Loads sprites from the manifest located at the provided path.
    pub fn from_manifest_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_manifest_with_loader(path, default_loader)
    }

    /// Returns the default manifest path relative to the repository root.
    #[must_use]
    pub fn default_manifest_path() -> PathBuf {
        PathBuf::from("assets/manifest.toml")
    }

    /// Retrieves the texture associated with the provided key.
    pub fn texture(&self, key: SpriteKey) -> Result<Texture2D> {
        self.textures
            .get(&key)
            .copied()
            .with_context(|| format!("sprite {key:?} missing from atlas"))
    }

    /// Returns whether the atlas contains the provided key.
    #[must_use]
    pub fn contains(&self, key: SpriteKey) -> bool {
        self.textures.contains_key(&key)
    }

    /// Returns the number of textures stored in the atlas.
    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn from_manifest_with_loader(
        path: impl AsRef<Path>,
        mut loader: impl FnMut(SpriteKey, &Path) -> Result<Texture2D>,
    ) -> Result<Self> {
        let manifest_path = path.as_ref();
        let contents = fs::read_to_string(manifest_path).with_context(|| {
            format!(
                "failed to read sprite manifest at {}",
                manifest_path.display()
            )
        })?;
        let base = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let entries = parse_manifest(&contents, &base)?;
        Self::from_entries(entries, &mut loader)
    }

    fn from_entries(
        entries: Vec<(SpriteKey, PathBuf)>,
        loader: &mut impl FnMut(SpriteKey, &Path) -> Result<Texture2D>,
    ) -> Result<Self> {
        let mut textures = HashMap::with_capacity(entries.len());
        for (key, path) in entries {
            let texture = loader(key, &path).with_context(|| {
                format!("failed to load sprite {key:?} from {}", path.display())
            })?;
            if textures.insert(key, texture).is_some() {
                bail!("duplicate sprite entry for {key:?}");
            }
        }
        Ok(Self { textures })
    }
}

fn default_loader(_key: SpriteKey, path: &Path) -> Result<Texture2D> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read sprite asset at {}", path.display()))?;
    Ok(Texture2D::from_file_with_format(&bytes, None))
}

#[derive(Debug, serde::Deserialize)]
struct Manifest {
    version: u32,
    sprites: HashMap<String, String>,
}

fn parse_manifest(contents: &str, base_path: &Path) -> Result<Vec<(SpriteKey, PathBuf)>> {
    let manifest: Manifest =
        toml::from_str(contents).context("failed to parse sprite manifest toml contents")?;
    if manifest.version != SUPPORTED_MANIFEST_VERSION {
        bail!(
            "unsupported sprite manifest version {}; expected {}",
            manifest.version,
            SUPPORTED_MANIFEST_VERSION
        );
    }

    let mut resolved = HashMap::new();
    for (name, relative_path) in manifest.sprites {
        let key = parse_sprite_key(&name)
            .with_context(|| format!("unknown sprite key `{name}` in manifest"))?;
        let path = base_path.join(relative_path);
        if resolved.insert(key, path).is_some() {
            bail!("sprite manifest contains duplicate entry for {key:?}");
        }
    }

    let mut ordered = Vec::with_capacity(ALL_SPRITE_KEYS.len());
    for key in ALL_SPRITE_KEYS {
        let Some(path) = resolved.remove(&key) else {
            bail!("sprite manifest missing entry for {key:?}");
        };
        ordered.push((key, path));
    }

    if !resolved.is_empty() {
        let unexpected = resolved
            .into_keys()
            .map(|key| format!("{key:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        bail!("sprite manifest contains unexpected keys: {unexpected}");
    }

    Ok(ordered)
}

fn parse_sprite_key(name: &str) -> Result<SpriteKey> {
    match name {
        "Background" => Ok(SpriteKey::Background),
        "Box" => Ok(SpriteKey::Box),
        "Landmine" => Ok(SpriteKey::Landmine),
        "Player" => Ok(SpriteKey::Player),
        "Rock" => Ok(SpriteKey::Rock),
        "Zombie" => Ok(SpriteKey::Zombie),
        "ZombieWalking" => Ok(SpriteKey::ZombieWalking),
        "ZombieDead" => Ok(SpriteKey::ZombieDead),
        _ => bail!("unknown sprite key `{name}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, path::Path};

    const COMPLETE_MANIFEST: &str = r#"
        version = 1

        [sprites]
        Background = "board/background.png"
        Box = "entities/box.png"
        Landmine = "entities/landmine.png"
        Player = "entities/player.png"
        Rock = "entities/rock.png"
        Zombie = "entities/zombie.png"
        ZombieWalking = "entities/zombie_walking.png"
        ZombieDead = "entities/zombie_dead.png"
    "#;

    #[test]
    fn parse_manifest_requires_all_known_keys() {
        let manifest = r#"
            version = 1

            [sprites]
            Background = "board/background.png"
            Player = "entities/player.png"
        "#;

        let result = parse_manifest(manifest, Path::new("assets"));
        assert!(result.is_err(), "incomplete manifest should fail");
    }

    #[test]
    fn manifest_rejects_unknown_keys() {
        let manifest = format!("{COMPLETE_MANIFEST}\nExtra = \"extra.png\"\n");
        let result = parse_manifest(&manifest, Path::new("assets"));
        assert!(result.is_err(), "unknown keys must be rejected");
    }

    #[test]
    fn manifest_rejects_unsupported_versions() {
        let manifest = COMPLETE_MANIFEST.replacen("version = 1", "version = 2", 1);
        let result = parse_manifest(&manifest, Path::new("assets"));
        assert!(result.is_err(), "future manifest versions must be rejected");
    }

    #[test]
    fn manifest_resolves_paths_relative_to_base_directory() {
        let parsed =
            parse_manifest(COMPLETE_MANIFEST, Path::new("root")).expect("manifest should parse");
        assert_eq!(parsed.len(), ALL_SPRITE_KEYS.len());
        assert_eq!(
            parsed[0],
            (SpriteKey::Background, PathBuf::from("root/board/background.png"))
        );
        assert_eq!(
            parsed[7],
            (
                SpriteKey::ZombieDead,
                PathBuf::from("root/entities/zombie_dead.png")
            )
        );
    }

    #[test]
    fn atlas_loads_textures_using_deterministic_order() {
        let entries = parse_manifest(COMPLETE_MANIFEST, Path::new("assets"))
            .expect("manifest should parse into canonical order");
        let load_order = RefCell::new(Vec::new());
        let atlas = SpriteAtlas::from_entries(entries, &mut |key, _| {
            load_order.borrow_mut().push(key);
            Ok(Texture2D::empty())
        })
        .expect("atlas should load using provided loader");

        assert_eq!(load_order.borrow().as_slice(), &ALL_SPRITE_KEYS);
        assert_eq!(atlas.texture_count(), ALL_SPRITE_KEYS.len());
    }

    #[test]
    fn atlas_loads_each_texture_exactly_once() {
        let entries = parse_manifest(COMPLETE_MANIFEST, Path::new("assets"))
            .expect("manifest should parse");
        let load_counts = RefCell::new(HashMap::new());
        let atlas = SpriteAtlas::from_entries(entries, &mut |key, _| {
            *load_counts.borrow_mut().entry(key).or_insert(0) += 1;
            Ok(Texture2D::empty())
        })
        .expect("atlas should load textures once");

        for key in ALL_SPRITE_KEYS {
            assert!(atlas.contains(key));
            assert!(atlas.texture(key).is_ok());
        }

        let counts = load_counts.into_inner();
        for key in ALL_SPRITE_KEYS {
            assert_eq!(
                counts.get(&key),
                Some(&1),
                "loader should be invoked exactly once per key"
            );
        }
    }
}
