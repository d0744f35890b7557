use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub agenda_url: String,
    pub display_url: Option<String>,
    pub note_interval_secs: u64,
    pub refresh_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/board.db".into(),
            agenda_url: "http://localhost:8000/agenda.json".into(),
            display_url: None,
            note_interval_secs: 10,
            refresh_secs: 2,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("board.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("database_url") {
                settings.database_url = v.clone();
            }
            if let Some(v) = file_cfg.get("agenda_url") {
                settings.agenda_url = v.clone();
            }
            if let Some(v) = file_cfg.get("display_url") {
                settings.display_url = Some(v.clone());
            }
            if let Some(v) = file_cfg.get("note_interval_secs") {
                if let Ok(parsed) = v.parse::<u64>() {
                    settings.note_interval_secs = parsed;
                }
            }
            if let Some(v) = file_cfg.get("refresh_secs") {
                if let Ok(parsed) = v.parse::<u64>() {
                    settings.refresh_secs = parsed;
                }
            }
        }
    }

    if let Ok(v) = std::env::var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Ok(v) = std::env::var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Ok(v) = std::env::var("APP__AGENDA_URL") {
        settings.agenda_url = v;
    }

    if let Ok(v) = std::env::var("APP__DISPLAY_URL") {
        settings.display_url = Some(v);
    }

    if let Ok(v) = std::env::var("APP__NOTE_INTERVAL_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.note_interval_secs = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__REFRESH_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.refresh_secs = parsed;
        }
    }

    settings
}

/// Room number carried in the display URL's fragment, e.g.
/// `http://host/board#3` selects room 3. Absent or non-numeric fragments
/// leave the room unset.
pub fn room_number_from_fragment(display_url: &str) -> Option<u32> {
    let parsed = url::Url::parse(display_url).ok()?;
    parsed.fragment()?.trim().parse().ok()
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_plain_file_path_to_sqlite_url() {
        assert_eq!(
            normalize_database_url("./data/test.db"),
            "sqlite://./data/test.db"
        );
    }

    #[test]
    fn memory_url_passes_through_untouched() {
        assert_eq!(
            normalize_database_url("sqlite::memory:"),
            "sqlite::memory:"
        );
    }

    #[test]
    fn room_number_comes_from_the_url_fragment() {
        assert_eq!(room_number_from_fragment("http://host/board#3"), Some(3));
        assert_eq!(room_number_from_fragment("http://host/board#17"), Some(17));
        assert_eq!(room_number_from_fragment("http://host/board"), None);
        assert_eq!(room_number_from_fragment("http://host/board#lobby"), None);
        assert_eq!(room_number_from_fragment("not a url"), None);
    }
}
