//! Game-specific constants: archive extension and the compiled-in fallback
//! directory set each [`crate::scanner::GameDirectoryScanner`] augments with
//! whatever it detects in a live reference root. Plugin output extension is
//! not one of these — it follows the template's own extension, per
//! [`crate::plugin::TemplateSource`].

use std::collections::BTreeSet;

/// Which Creation Engine title a run targets. Determines archive extension
/// and fallback directory set (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameKind {
    Skyrim,
    Fallout4,
}

impl GameKind {
    /// Native archive extension for this game (`bsa` / `ba2`).
    pub fn archive_extension(self) -> &'static str {
        match self {
            GameKind::Skyrim => "bsa",
            GameKind::Fallout4 => "ba2",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            GameKind::Skyrim => "Skyrim",
            GameKind::Fallout4 => "Fallout 4",
        }
    }

    /// Canonical engine directories plus a curated set of common community
    /// toolchain directories (BodySlide, etc.). Never empty, per spec §4.2.
    pub fn fallback_dirs(self) -> BTreeSet<String> {
        let mut dirs: BTreeSet<String> = [
            "meshes",
            "textures",
            "sounds",
            "scripts",
            "interface",
            "seq",
            "music",
            "shadersfx",
            "lodsettings",
            "grass",
            "voices",
            "video",
            "strings",
            "facegendata",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect();

        // Community toolchain directories observed across BodySlide/Outfit
        // Studio and similar generators; augmenting, not replacing, the
        // detected set (spec §4.2's "curated... not exhaustive" note).
        for extra in ["calientetools", "tools", "cache", "nemesis_engine"] {
            dirs.insert(extra.to_owned());
        }

        match self {
            GameKind::Fallout4 => {
                dirs.insert("materials".to_owned());
                dirs.insert("vis".to_owned());
                dirs.insert("misc".to_owned());
            }
            GameKind::Skyrim => {
                dirs.insert("skse".to_owned());
            }
        }

        dirs
    }
}
