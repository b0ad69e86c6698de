//! Plugin-stub generation: every packed archive needs a companion
//! ESP/ESL/ESM so the engine will actually load it. This module copies a
//! pre-built template's bytes to the output location and nothing more —
//! record content is out of scope (spec §4.7 Non-goals).

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PackagerError, Result};
use crate::game::GameKind;

/// Source of template plugin bytes for a given game.
///
/// A template's byte content and its extension are fetched separately so a
/// caller-supplied `.esm` template is never silently renamed to `.esp` —
/// [`write_plugin_stub`] names its output after whatever [`extension`]
/// reports, not a per-game default (spec §3: "matching template's original
/// extension").
///
/// [`extension`]: TemplateSource::extension
pub trait TemplateSource: Send + Sync {
    fn bytes(&self, game: GameKind) -> Result<Vec<u8>>;
    fn extension(&self, game: GameKind) -> Result<String>;
}

/// Reads a template file from disk per game, resolved once at construction.
/// The output extension is taken from the configured path itself.
pub struct FilesystemTemplate {
    skyrim: Option<PathBuf>,
    fallout4: Option<PathBuf>,
}

impl FilesystemTemplate {
    pub fn new(skyrim: Option<PathBuf>, fallout4: Option<PathBuf>) -> Self {
        Self { skyrim, fallout4 }
    }

    fn path_for(&self, game: GameKind) -> Option<&Path> {
        match game {
            GameKind::Skyrim => self.skyrim.as_deref(),
            GameKind::Fallout4 => self.fallout4.as_deref(),
        }
    }

    fn missing(game: GameKind) -> PackagerError {
        PackagerError::Template {
            game: game.display_name().to_string(),
            reason: "no template configured for this game".into(),
        }
    }
}

impl TemplateSource for FilesystemTemplate {
    fn bytes(&self, game: GameKind) -> Result<Vec<u8>> {
        let path = self.path_for(game).ok_or_else(|| Self::missing(game))?;
        fs::read(path).map_err(|e| PackagerError::Template {
            game: game.display_name().to_string(),
            reason: format!("failed to read template {}: {e}", path.display()),
        })
    }

    fn extension(&self, game: GameKind) -> Result<String> {
        let path = self.path_for(game).ok_or_else(|| Self::missing(game))?;
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string)
            .ok_or_else(|| PackagerError::Template {
                game: game.display_name().to_string(),
                reason: format!("template {} has no file extension", path.display()),
            })
    }
}

/// Holds template bytes and extension in memory. Used in tests and by
/// callers that embed templates at build time (`include_bytes!`) rather
/// than reading from disk.
pub struct InMemoryTemplate {
    skyrim: Option<(Vec<u8>, String)>,
    fallout4: Option<(Vec<u8>, String)>,
}

impl InMemoryTemplate {
    pub fn new(skyrim: Option<(Vec<u8>, String)>, fallout4: Option<(Vec<u8>, String)>) -> Self {
        Self { skyrim, fallout4 }
    }

    fn entry(&self, game: GameKind) -> Option<&(Vec<u8>, String)> {
        match game {
            GameKind::Skyrim => self.skyrim.as_ref(),
            GameKind::Fallout4 => self.fallout4.as_ref(),
        }
    }
}

impl TemplateSource for InMemoryTemplate {
    fn bytes(&self, game: GameKind) -> Result<Vec<u8>> {
        self.entry(game).map(|(bytes, _)| bytes.clone()).ok_or_else(|| PackagerError::Template {
            game: game.display_name().to_string(),
            reason: "no template configured for this game".into(),
        })
    }

    fn extension(&self, game: GameKind) -> Result<String> {
        self.entry(game).map(|(_, ext)| ext.clone()).ok_or_else(|| PackagerError::Template {
            game: game.display_name().to_string(),
            reason: "no template configured for this game".into(),
        })
    }
}

/// A written-out plugin stub: its path and the byte count copied.
#[derive(Debug, Clone)]
pub struct PluginArtifact {
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Writes `<base_name>.<ext>` under `out_dir`, where `ext` is the
/// template's own extension (`esp`/`esl`/`esm`), using `source` for the
/// template bytes. Overwrites any existing file at that path.
pub fn write_plugin_stub(
    source: &dyn TemplateSource,
    game: GameKind,
    base_name: &str,
    out_dir: &Path,
) -> Result<PluginArtifact> {
    let bytes = source.bytes(game)?;
    let extension = source.extension(game)?;
    fs::create_dir_all(out_dir).map_err(|e| PackagerError::io(out_dir, e))?;

    let path = out_dir.join(format!("{base_name}.{extension}"));
    fs::write(&path, &bytes).map_err(|e| PackagerError::io(&path, e))?;

    Ok(PluginArtifact {
        path,
        bytes_written: bytes.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_bytes_verbatim_with_correct_extension() {
        let dir = tempdir().unwrap();
        let template = InMemoryTemplate::new(
            Some((vec![1, 2, 3, 4], "esp".to_string())),
            Some((vec![5, 6], "esl".to_string())),
        );

        let artifact = write_plugin_stub(&template, GameKind::Skyrim, "MyMod", dir.path()).unwrap();
        assert_eq!(artifact.path.file_name().unwrap(), "MyMod.esp");
        assert_eq!(fs::read(&artifact.path).unwrap(), vec![1, 2, 3, 4]);

        let artifact = write_plugin_stub(&template, GameKind::Fallout4, "MyMod", dir.path()).unwrap();
        assert_eq!(artifact.path.file_name().unwrap(), "MyMod.esl");
        assert_eq!(fs::read(&artifact.path).unwrap(), vec![5, 6]);
    }

    #[test]
    fn missing_template_for_game_errors() {
        let template = InMemoryTemplate::new(Some((vec![1], "esp".to_string())), None);
        let dir = tempdir().unwrap();
        let result = write_plugin_stub(&template, GameKind::Fallout4, "MyMod", dir.path());
        assert!(result.is_err());
    }

    #[test]
    fn overwrites_existing_stub() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("MyMod.esp");
        fs::write(&path, b"stale").unwrap();

        let template = InMemoryTemplate::new(Some((vec![9, 9, 9], "esp".to_string())), None);
        let artifact = write_plugin_stub(&template, GameKind::Skyrim, "MyMod", dir.path()).unwrap();
        assert_eq!(fs::read(&artifact.path).unwrap(), vec![9, 9, 9]);
    }

    #[test]
    fn filesystem_template_extension_follows_the_configured_file() {
        let dir = tempdir().unwrap();
        let esm_path = dir.path().join("Master.esm");
        fs::write(&esm_path, b"master-bytes").unwrap();

        let template = FilesystemTemplate::new(None, Some(esm_path));
        let artifact = write_plugin_stub(&template, GameKind::Fallout4, "MyMod", dir.path()).unwrap();
        assert_eq!(artifact.path.file_name().unwrap(), "MyMod.esm");
        assert_eq!(fs::read(&artifact.path).unwrap(), b"master-bytes");
    }
}
