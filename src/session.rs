// Player session: the playlist, which entry is playing, and the settings that
// survive restarts. Owned by the host and passed to whoever needs it.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::effects::Effect;
use crate::error::SessionError;

/// What gets written to disk between runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Effect name as the pipeline reports it (`identity`, `old_paper`, ...).
    #[serde(default = "default_effect_name")]
    pub current_effect: String,
    /// Playlist from the last run, used when no clips are given on the command line.
    #[serde(default)]
    pub playlist: Vec<PathBuf>,
}

fn default_effect_name() -> String {
    Effect::Identity.as_str().to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self { current_effect: default_effect_name(), playlist: Vec::new() }
    }
}

impl Settings {
    /// Load settings; a missing file gives defaults.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// The stored effect, or `None` (with a warning) if it's not a name we know.
    pub fn effect(&self) -> Option<Effect> {
        match self.current_effect.parse() {
            Ok(effect) => Some(effect),
            Err(e) => {
                warn!("ignoring saved effect: {e}");
                None
            }
        }
    }
}

pub struct Session {
    playlist: Vec<PathBuf>,
    index: usize,
    pub settings: Settings,
}

impl Session {
    pub fn new(playlist: Vec<PathBuf>, settings: Settings) -> Self {
        Self { playlist, index: 0, settings }
    }

    pub fn playlist(&self) -> &[PathBuf] {
        &self.playlist
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&Path> {
        self.playlist.get(self.index).map(PathBuf::as_path)
    }

    /// Jump to entry `i`. Out-of-range indices are ignored.
    pub fn select(&mut self, i: usize) -> Option<&Path> {
        if i >= self.playlist.len() {
            return None;
        }
        self.index = i;
        self.current()
    }

    /// Next entry, wrapping to the first after the last.
    pub fn next(&mut self) -> Option<&Path> {
        if self.playlist.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.playlist.len();
        self.current()
    }

    /// Previous entry, wrapping to the last before the first.
    pub fn previous(&mut self) -> Option<&Path> {
        if self.playlist.is_empty() {
            return None;
        }
        self.index = self.index.checked_sub(1).unwrap_or(self.playlist.len() - 1);
        self.current()
    }

    /// Reorder the playlist by `key` (stable). The entry that was playing stays current.
    pub fn sort_by_key<K: Ord>(&mut self, mut key: impl FnMut(&Path) -> K) {
        let current = self.current().map(Path::to_path_buf);
        let mut keyed: Vec<(K, PathBuf)> =
            self.playlist.drain(..).map(|p| (key(&p), p)).collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        self.playlist = keyed.into_iter().map(|(_, p)| p).collect();
        if let Some(i) = current.and_then(|c| self.playlist.iter().position(|p| *p == c)) {
            self.select(i);
        }
    }

    /// Copy the playlist into the settings so the next run starts with it.
    pub fn remember_playlist(&mut self) {
        self.settings.playlist = self.playlist.clone();
    }

    /// Drop the current entry. The entry now at the same index (wrapped) becomes current.
    pub fn remove_current(&mut self) -> Result<Option<&Path>, SessionError> {
        if self.playlist.is_empty() {
            return Err(SessionError::EmptyPlaylist);
        }
        let removed = self.playlist.remove(self.index);
        info!("removed {} from playlist", removed.display());
        if self.playlist.is_empty() {
            self.index = 0;
            return Ok(None);
        }
        self.index %= self.playlist.len();
        Ok(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(n: usize) -> Session {
        let playlist = (0..n).map(|i| PathBuf::from(format!("clip{i}"))).collect();
        Session::new(playlist, Settings::default())
    }

    #[test]
    fn next_and_previous_wrap() {
        let mut s = session(3);
        assert_eq!(s.previous(), Some(Path::new("clip2")));
        assert_eq!(s.next(), Some(Path::new("clip0")));
        assert_eq!(s.next(), Some(Path::new("clip1")));
        assert_eq!(s.index(), 1);
    }

    #[test]
    fn select_ignores_out_of_range() {
        let mut s = session(2);
        assert_eq!(s.select(5), None);
        assert_eq!(s.index(), 0);
        assert_eq!(s.select(1), Some(Path::new("clip1")));
    }

    #[test]
    fn empty_playlist_navigation_is_harmless() {
        let mut s = session(0);
        assert_eq!(s.next(), None);
        assert_eq!(s.previous(), None);
        assert!(matches!(s.remove_current(), Err(SessionError::EmptyPlaylist)));
    }

    #[test]
    fn remove_keeps_position_modulo_length() {
        let mut s = session(3);
        s.select(2);
        assert_eq!(s.remove_current().unwrap(), Some(Path::new("clip0")));
        assert_eq!(s.playlist().len(), 2);
        assert_eq!(s.remove_current().unwrap(), Some(Path::new("clip1")));
        assert_eq!(s.remove_current().unwrap(), None);
        assert!(s.current().is_none());
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.effect(), Some(Effect::Identity));

        let settings = Settings {
            current_effect: Effect::OldPaper.to_string(),
            playlist: vec![PathBuf::from("a/"), PathBuf::from("b.png")],
        };
        settings.save(&path).unwrap();
        let back = Settings::load(&path).unwrap();
        assert_eq!(back, settings);
        assert_eq!(back.effect(), Some(Effect::OldPaper));
    }

    #[test]
    fn playlist_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut s = session(3);
        s.select(1);
        s.remove_current().unwrap();
        s.remember_playlist();
        s.settings.save(&path).unwrap();

        let settings = Settings::load(&path).unwrap();
        let restored = Session::new(settings.playlist.clone(), settings);
        assert_eq!(restored.playlist(), &[PathBuf::from("clip0"), PathBuf::from("clip2")][..]);
        assert_eq!(restored.current(), Some(Path::new("clip0")));
    }

    #[test]
    fn old_settings_without_playlist_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "current_effect": "cold_tint" }"#).unwrap();
        let settings = Settings::load(&path).unwrap();
        assert!(settings.playlist.is_empty());
        assert_eq!(settings.effect(), Some(Effect::ColdTint));
    }

    #[test]
    fn sort_keeps_the_playing_entry_current() {
        let mut s = session(4);
        s.select(1);
        let lengths = [("clip0", 30), ("clip1", 5), ("clip2", 90), ("clip3", 5)];
        s.sort_by_key(|p| lengths.iter().find(|(n, _)| Path::new(n) == p).map(|(_, l)| *l));

        let order: Vec<_> = s.playlist().iter().map(|p| p.display().to_string()).collect();
        assert_eq!(order, ["clip1", "clip3", "clip0", "clip2"]);
        assert_eq!(s.current(), Some(Path::new("clip1")));
        assert_eq!(s.index(), 0);
    }

    #[test]
    fn sort_on_empty_playlist_is_harmless() {
        let mut s = session(0);
        s.sort_by_key(|p| p.to_path_buf());
        assert!(s.current().is_none());
    }

    #[test]
    fn unknown_saved_effect_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "current_effect": "sparkles" }"#).unwrap();
        assert_eq!(Settings::load(&path).unwrap().effect(), None);

        fs::write(&path, "{}").unwrap();
        assert_eq!(Settings::load(&path).unwrap().effect(), Some(Effect::Identity));
    }
}
