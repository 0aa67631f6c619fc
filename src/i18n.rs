// i18n.rs — runtime strings of the desktop shell
//
// Tables live in assets/i18n/<lang>.json (flat `{ "key": "value" }`) or in a single
// assets/i18n.json (`{ "<lang>": { "key": "value" } }`), searched next to the executable
// then in the working directory. Lookups fall back to English, then to the built-in
// table, then to the key itself.

use once_cell::sync::{Lazy, OnceCell};
use serde::Deserialize;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

pub const FALLBACK_LANG: &str = "en";

type Table = HashMap<String, String>;

#[derive(Debug, Clone)]
pub struct I18n {
    pub lang: String,
    map: Table,
    fallback_map: Table,
}

static I18N: OnceCell<RwLock<I18n>> = OnceCell::new();

static BUILTIN: Lazy<Table> = Lazy::new(|| {
    [
        ("app.title", "Panosphere"),
        ("menu.file", "File"),
        ("menu.open_image", "Open panorama…"),
        ("menu.exit", "Exit"),
        ("menu.view", "View"),
        ("view.reset", "Reset view"),
        ("view.fullscreen.enter", "Enter fullscreen"),
        ("view.fullscreen.exit", "Exit fullscreen"),
        ("view.show_fps", "Show FPS"),
        ("file.filter.images", "Images"),
        ("status.loading_image", "Loading…"),
        ("status.load_error", "The panorama cannot be loaded: {err}"),
        ("overlay.two_fingers", "Use two fingers to navigate"),
        ("overlay.ctrl_zoom", "Use ctrl + scroll to zoom the image"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
});

#[derive(Deserialize)]
#[serde(untagged)]
enum TableFile {
    Flat(Table),
    PerLang(HashMap<String, Table>),
}

fn read_table(path: &Path, lang: Option<&str>) -> Option<Table> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<TableFile>(&text) {
        Ok(TableFile::Flat(table)) if lang.is_none() => Some(table),
        Ok(TableFile::PerLang(mut all)) => lang.and_then(|lang| all.remove(lang)),
        Ok(TableFile::Flat(_)) => None,
        Err(err) => {
            log::warn!("invalid i18n table {}: {err}", path.display());
            None
        }
    }
}

/// `<exe_dir>/assets/<file>` first, then `./assets/<file>`.
fn find_asset(file: &Path) -> Option<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    exe_dir
        .into_iter()
        .chain(std::iter::once(PathBuf::new()))
        .map(|dir| dir.join("assets").join(file))
        .find(|path| path.exists())
}

fn load_lang(lang: &str) -> Table {
    let per_lang = Path::new("i18n").join(format!("{lang}.json"));
    if let Some(table) = find_asset(&per_lang).and_then(|path| read_table(&path, None)) {
        return table;
    }
    find_asset(Path::new("i18n.json"))
        .and_then(|path| read_table(&path, Some(lang)))
        .unwrap_or_default()
}

/// Loads `lang`. Later calls replace the current tables.
pub fn init(lang: impl Into<String>) {
    let lang = lang.into();
    let map = load_lang(&lang);
    if map.is_empty() {
        log::info!("no strings for language {lang}, using {FALLBACK_LANG}");
    }
    let fallback_map = if lang == FALLBACK_LANG {
        map.clone()
    } else {
        load_lang(FALLBACK_LANG)
    };

    let i18n = I18n {
        lang,
        map,
        fallback_map,
    };
    match I18N.get() {
        Some(lock) => {
            if let Ok(mut current) = lock.write() {
                *current = i18n;
            }
        }
        None => {
            let _ = I18N.set(RwLock::new(i18n));
        }
    }
}

/// Localized text for `key`.
pub fn tr(key: &str) -> String {
    let loaded = I18N.get().and_then(|lock| lock.read().ok()).and_then(|i18n| {
        i18n.map
            .get(key)
            .or_else(|| i18n.fallback_map.get(key))
            .cloned()
    });
    loaded
        .or_else(|| BUILTIN.get(key).cloned())
        .unwrap_or_else(|| key.to_string())
}

/// Localized text with `{name}` placeholders substituted. Unknown placeholders are kept.
pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    args.iter().fold(tr(key), |text, (name, value)| {
        text.replace(&format!("{{{name}}}"), value)
    })
}

/// `--lang <code>`, then `PANORAMA_LANG`, then English.
pub fn resolve_lang_from_args() -> String {
    let mut args = std::env::args();
    while let Some(arg) = args.next() {
        if arg == "--lang" {
            if let Some(lang) = args.next() {
                return lang;
            }
        }
    }

    match std::env::var("PANORAMA_LANG") {
        Ok(lang) if !lang.trim().is_empty() => lang,
        _ => FALLBACK_LANG.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_strings_cover_overlays() {
        assert_eq!(tr("overlay.ctrl_zoom"), "Use ctrl + scroll to zoom the image");
        assert_eq!(tr("no.such.key"), "no.such.key");
    }

    #[test]
    fn placeholders_are_substituted() {
        let text = tr_with("status.load_error", &[("err", "truncated file".to_string())]);
        assert!(text.ends_with("truncated file"));
        assert_eq!(tr_with("x.{a}", &[("b", "1".to_string())]), "x.{a}");
    }
}
