use std::path::{Path, PathBuf};

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("se", "biglittle", "Biglittle")
}

/// Hämta databassökväg
pub fn get_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("biglittle.db"))
        .unwrap_or_else(|| PathBuf::from("biglittle.db"))
}

/// Hämta sökväg till settings.toml
pub fn get_settings_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().join("settings.toml"))
        .unwrap_or_else(|| PathBuf::from("settings.toml"))
}

/// Normalisera sökväg för visning
pub fn display_path(path: &Path) -> String {
    // Förkorta hemkatalogen till ~
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

/// Skapa ett säkert filnamn från en sträng
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Höst 2024"), "Höst 2024");
        assert_eq!(sanitize_filename("Big/Little"), "Big_Little");
        assert_eq!(sanitize_filename(" svar: del 1 "), "svar_ del 1");
    }

    #[test]
    fn test_database_path_has_file_name() {
        assert_eq!(
            get_database_path().file_name().and_then(|n| n.to_str()),
            Some("biglittle.db")
        );
    }
}
