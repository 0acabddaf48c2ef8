//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::defaults::TILE_SIZE;
use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::coord::MAX_ZOOM;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [planet] section
    if let Some(section) = ini.section(Some("planet")) {
        if let Some(v) = section.get("api_key") {
            let v = v.trim();
            if !v.is_empty() {
                config.planet.api_key = Some(v.to_string());
            }
        }
        if let Some(v) = section.get("api_base_url") {
            let v = v.trim().trim_end_matches('/');
            if !v.starts_with("http://") && !v.starts_with("https://") {
                return Err(invalid("planet", "api_base_url", v, "must be an http(s) URL"));
            }
            config.planet.api_base_url = v.to_string();
        }
        if let Some(v) = section.get("item_type") {
            let v = v.trim();
            if v.is_empty() {
                return Err(invalid("planet", "item_type", v, "must not be empty"));
            }
            config.planet.item_type = v.to_string();
        }
    }

    // [search] section
    if let Some(section) = ini.section(Some("search")) {
        if let Some(v) = section.get("timeout") {
            config.search.timeout_secs =
                parse_positive(v, "search", "timeout", "must be a positive integer (seconds)")?;
        }
        if let Some(v) = section.get("max_concurrent") {
            config.search.max_concurrent =
                parse_positive(v, "search", "max_concurrent", "must be a positive integer")?;
        }
        if let Some(v) = section.get("backoff_base_ms") {
            config.search.backoff_base_ms = parse_positive(
                v,
                "search",
                "backoff_base_ms",
                "must be a positive integer (milliseconds)",
            )?;
        }
        if let Some(v) = section.get("backoff_max_ms") {
            config.search.backoff_max_ms = parse_positive(
                v,
                "search",
                "backoff_max_ms",
                "must be a positive integer (milliseconds)",
            )?;
        }
        if config.search.backoff_max_ms < config.search.backoff_base_ms {
            return Err(invalid(
                "search",
                "backoff_max_ms",
                &config.search.backoff_max_ms.to_string(),
                "must not be lower than backoff_base_ms",
            ));
        }
    }

    // [fetch] section
    if let Some(section) = ini.section(Some("fetch")) {
        if let Some(v) = section.get("tile_url") {
            let v = v.trim();
            if !v.contains("{id}") {
                return Err(invalid("fetch", "tile_url", v, "must contain an {id} placeholder"));
            }
            config.fetch.tile_url_template = v.to_string();
        }
        if let Some(v) = section.get("shards") {
            config.fetch.shards =
                parse_positive(v, "fetch", "shards", "must be a positive integer")?;
        }
        if let Some(v) = section.get("timeout") {
            config.fetch.timeout_secs =
                parse_positive(v, "fetch", "timeout", "must be a positive integer (seconds)")?;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("ttl") {
            config.cache.ttl_secs =
                parse_positive(v, "cache", "ttl", "must be a positive integer (seconds)")?;
        }
    }

    // [tiles] section
    if let Some(section) = ini.section(Some("tiles")) {
        if let Some(v) = section.get("bound_padding") {
            config.tiles.bound_padding = parse_number(
                v,
                "tiles",
                "bound_padding",
                "must be a non-negative integer (tiles)",
            )?;
        }
        if let Some(v) = section.get("min_mosaic_zoom") {
            config.tiles.min_mosaic_zoom = parse_zoom(v, "min_mosaic_zoom")?;
        }
        if let Some(v) = section.get("min_search_zoom") {
            config.tiles.min_search_zoom = parse_zoom(v, "min_search_zoom")?;
        }
        if let Some(v) = section.get("search_window_days") {
            config.tiles.search_window_days = parse_positive(
                v,
                "tiles",
                "search_window_days",
                "must be a positive integer (days)",
            )?;
        }
        if let Some(v) = section.get("utc_offset_minutes") {
            let minutes: i32 = parse_number(
                v,
                "tiles",
                "utc_offset_minutes",
                "must be an integer number of minutes",
            )?;
            if minutes.abs() >= 24 * 60 {
                return Err(invalid(
                    "tiles",
                    "utc_offset_minutes",
                    v,
                    "must be within one day of UTC",
                ));
            }
            config.tiles.utc_offset_minutes = minutes;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(
    value: &str,
    section: &str,
    key: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_positive<T: FromStr + PartialOrd + Default>(
    value: &str,
    section: &str,
    key: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    let parsed: T = parse_number(value, section, key, reason)?;
    if parsed <= T::default() {
        return Err(invalid(section, key, value, reason));
    }
    Ok(parsed)
}

fn parse_zoom(value: &str, key: &str) -> Result<u8, ConfigFileError> {
    let zoom: u8 = parse_number(value, "tiles", key, "must be a zoom level")?;
    if zoom > MAX_ZOOM {
        return Err(invalid(
            "tiles",
            key,
            value,
            &format!("must be at most {} ({}px tiles)", MAX_ZOOM, TILE_SIZE),
        ));
    }
    Ok(zoom)
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use crate::config::settings::ConfigFile;
    use tempfile::TempDir;

    fn load(contents: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, contents).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_partial_config() {
        let config = load(
            r#"
[planet]
api_key = abc123

[cache]
ttl = 120
"#,
        )
        .unwrap();

        assert_eq!(config.planet.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.cache.ttl_secs, 120);
        // Untouched sections keep their defaults
        assert_eq!(config.search.timeout_secs, DEFAULT_SEARCH_TIMEOUT_SECS);
        assert_eq!(config.planet.item_type, DEFAULT_ITEM_TYPE);
        assert_eq!(config.tiles.bound_padding, DEFAULT_BOUND_PADDING_TILES);
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let config = load("[planet]\napi_key =   \n").unwrap();
        assert!(config.planet.api_key.is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = load("[planet]\napi_base_url = https://example.com/v1/\n").unwrap();
        assert_eq!(config.planet.api_base_url, "https://example.com/v1");
    }

    #[test]
    fn test_invalid_timeout() {
        let err = load("[search]\ntimeout = soon\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue { section, key, .. } => {
                assert_eq!(section, "search");
                assert_eq!(key, "timeout");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(load("[search]\nmax_concurrent = 0\n").is_err());
    }

    #[test]
    fn test_backoff_max_below_base_rejected() {
        assert!(load("[search]\nbackoff_base_ms = 500\nbackoff_max_ms = 100\n").is_err());
    }

    #[test]
    fn test_tile_url_requires_id_placeholder() {
        assert!(load("[fetch]\ntile_url = https://tiles.example.com/a.png\n").is_err());

        let config =
            load("[fetch]\ntile_url = https://t{shard}.example.com/{id}/{z}/{x}/{y}.png\n")
                .unwrap();
        assert!(config.fetch.tile_url_template.starts_with("https://t{shard}"));
    }

    #[test]
    fn test_tiles_section() {
        let config = load(
            r#"
[tiles]
bound_padding = 0
min_mosaic_zoom = 9
utc_offset_minutes = -480
"#,
        )
        .unwrap();
        assert_eq!(config.tiles.bound_padding, 0);
        assert_eq!(config.tiles.min_mosaic_zoom, 9);
        assert_eq!(config.tiles.utc_offset_minutes, -480);
    }

    #[test]
    fn test_zoom_above_max_rejected() {
        assert!(load("[tiles]\nmin_mosaic_zoom = 40\n").is_err());
    }

    #[test]
    fn test_utc_offset_out_of_range() {
        assert!(load("[tiles]\nutc_offset_minutes = 1440\n").is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("/var/log/skymosaic.log");
        assert_eq!(path, PathBuf::from("/var/log/skymosaic.log"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/logs/a.log"), home.join("logs/a.log"));
        }
    }
}
