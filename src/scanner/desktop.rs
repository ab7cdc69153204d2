//! Desktop-entry scanner
//!
//! Recursively scans the standard application directories for `.desktop`
//! files and parses the `[Desktop Entry]` section into candidates. Only the
//! keys the index needs are recognized; everything else is ignored.
//! Malformed files are skipped, not fatal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::index::Entry;

/// Scan the given locations, sending one candidate per visible desktop
/// entry. `NoDisplay=true` entries are suppressed here so they never reach
/// the index.
pub fn scan_locations(locations: &[PathBuf], cancel: &AtomicBool, tx: &mpsc::Sender<Entry>) {
    for location in locations {
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        debug!("scanning desktop entries in {}", location.display());
        for dent in WalkDir::new(location).into_iter().filter_map(|e| e.ok()) {
            if cancel.load(Ordering::Relaxed) {
                return;
            }
            if !dent.file_type().is_file() {
                continue;
            }
            if dent.path().extension().and_then(|s| s.to_str()) != Some("desktop") {
                continue;
            }

            let Ok(content) = std::fs::read_to_string(dent.path()) else {
                continue;
            };
            let Some(entry) = parse_desktop_entry(&content, dent.path()) else {
                trace!("skipping desktop entry {}", dent.path().display());
                continue;
            };
            if tx.blocking_send(entry).is_err() {
                return;
            }
        }
    }
}

/// Parse a desktop file into an index candidate.
///
/// Returns `None` for hidden (`NoDisplay=true`) or malformed entries. A
/// missing `Name` falls back to the file's basename without the `.desktop`
/// suffix; an entry with neither `Name` nor `Exec` is malformed.
pub fn parse_desktop_entry(content: &str, path: &Path) -> Option<Entry> {
    let mut name: Option<String> = None;
    let mut localized_names = HashMap::new();
    let mut exec: Option<String> = None;
    let mut terminal = false;
    let mut categories = Vec::new();
    let mut in_desktop_entry = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            in_desktop_entry = &line[1..line.len() - 1] == "Desktop Entry";
            continue;
        }
        if !in_desktop_entry {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "Name" => name = Some(value.to_string()),
            "Exec" => exec = Some(strip_field_codes(value)),
            "Terminal" => terminal = value.eq_ignore_ascii_case("true"),
            "NoDisplay" => {
                if value.eq_ignore_ascii_case("true") {
                    return None;
                }
            }
            "Categories" => {
                categories = value
                    .split(';')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {
                if let Some(locale) = key.strip_prefix("Name[").and_then(|k| k.strip_suffix(']')) {
                    localized_names.insert(locale.to_string(), value.to_string());
                }
            }
        }
    }

    if name.is_none() && exec.is_none() {
        return None;
    }

    let name = name.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    Some(Entry {
        id: 0,
        name,
        localized_names,
        path: path.to_path_buf(),
        exec: exec.unwrap_or_default(),
        terminal,
        categories,
        is_desktop: true,
    })
}

/// Strip desktop-entry field codes from an `Exec` value.
///
/// `%%` becomes a literal `%`, `%` followed by a letter is removed, and the
/// result is whitespace-normalized.
pub fn strip_field_codes(exec: &str) -> String {
    let mut out = String::with_capacity(exec.len());
    let mut chars = exec.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('%') => {
                out.push('%');
                chars.next();
            }
            Some(next) if next.is_ascii_alphabetic() => {
                chars.next();
            }
            _ => out.push('%'),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Option<Entry> {
        parse_desktop_entry(content, Path::new("/usr/share/applications/demo.desktop"))
    }

    #[test]
    fn parses_full_entry() {
        let entry = parse(
            "[Desktop Entry]\n\
             Name=Firefox\n\
             Name[ru]=Файрфокс\n\
             Exec=firefox %u\n\
             Terminal=false\n\
             Categories=Network;WebBrowser;\n",
        )
        .expect("entry should parse");

        assert_eq!(entry.name, "Firefox");
        assert_eq!(entry.localized_names.get("ru").unwrap(), "Файрфокс");
        assert_eq!(entry.exec, "firefox");
        assert!(!entry.terminal);
        assert_eq!(entry.categories, vec!["Network", "WebBrowser"]);
        assert!(entry.is_desktop);
    }

    #[test]
    fn no_display_is_suppressed() {
        let entry = parse(
            "[Desktop Entry]\nName=Hidden\nExec=hidden\nNoDisplay=true\n",
        );
        assert!(entry.is_none());
    }

    #[test]
    fn no_display_false_is_kept() {
        let entry = parse("[Desktop Entry]\nName=Shown\nExec=shown\nNoDisplay=false\n");
        assert!(entry.is_some());
    }

    #[test]
    fn missing_name_falls_back_to_basename() {
        let entry = parse("[Desktop Entry]\nExec=demo-bin\n").expect("entry should parse");
        assert_eq!(entry.name, "demo");
    }

    #[test]
    fn entry_without_name_and_exec_is_malformed() {
        assert!(parse("[Desktop Entry]\nTerminal=true\n").is_none());
        assert!(parse("not an ini file at all").is_none());
    }

    #[test]
    fn only_desktop_entry_section_is_consulted() {
        let entry = parse(
            "[Desktop Action new-window]\n\
             Name=New Window\n\
             [Desktop Entry]\n\
             Name=Browser\n\
             Exec=browser\n",
        )
        .expect("entry should parse");
        assert_eq!(entry.name, "Browser");
    }

    #[test]
    fn terminal_is_case_insensitive() {
        let entry = parse("[Desktop Entry]\nName=Top\nExec=top\nTerminal=True\n").unwrap();
        assert!(entry.terminal);
    }

    #[test]
    fn empty_category_tokens_are_dropped() {
        let entry = parse(
            "[Desktop Entry]\nName=Gimp\nExec=gimp\nCategories=Graphics;;Viewers;\n",
        )
        .unwrap();
        assert_eq!(entry.categories, vec!["Graphics", "Viewers"]);
    }

    #[test]
    fn strip_field_codes_removes_letter_codes() {
        assert_eq!(strip_field_codes("firefox %u"), "firefox");
        assert_eq!(strip_field_codes("gimp-2.10 %U %F"), "gimp-2.10");
        assert_eq!(strip_field_codes("viewer %f --caption %c --icon %i"), "viewer --caption --icon");
    }

    #[test]
    fn strip_field_codes_keeps_escaped_percent() {
        assert_eq!(strip_field_codes("tool --progress=100%% run"), "tool --progress=100% run");
    }

    #[test]
    fn strip_field_codes_normalizes_whitespace() {
        assert_eq!(strip_field_codes("app   %u   --flag"), "app --flag");
    }

    #[test]
    fn strip_field_codes_keeps_trailing_percent() {
        assert_eq!(strip_field_codes("app 50%"), "app 50%");
    }

    #[tokio::test]
    async fn scan_locations_emits_visible_entries() {
        use std::sync::atomic::AtomicBool;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("editor.desktop"),
            "[Desktop Entry]\nName=Editor\nExec=editor %f\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("hidden.desktop"),
            "[Desktop Entry]\nName=Hidden\nExec=hidden\nNoDisplay=true\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("README"), "not a desktop file").unwrap();

        let (tx, mut rx) = mpsc::channel(100);
        let locations = vec![dir.path().to_path_buf()];
        tokio::task::spawn_blocking(move || {
            let cancel = AtomicBool::new(false);
            scan_locations(&locations, &cancel, &tx);
        })
        .await
        .unwrap();

        let mut entries = Vec::new();
        while let Ok(entry) = rx.try_recv() {
            entries.push(entry);
        }
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Editor");
        assert_eq!(entries[0].exec, "editor");
    }
}
