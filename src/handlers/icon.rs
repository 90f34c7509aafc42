// src/handlers/icon.rs

//! Icons shipped in the `icons` section
//!
//! The section maps an icon name to its base64-encoded image. Icons are
//! stored as media keyed `<pack slug>-<icon name>` so two packs can ship an
//! icon with the same name.

use crate::db::models::Icon;
use crate::error::{Error, Result};
use crate::manifest::section;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rusqlite::Connection;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Media ids of the icons installed for a pack, by media key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconMap {
    ids: HashMap<String, i64>,
}

impl IconMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn media_key(pack_slug: &str, icon: &str) -> String {
        format!("{pack_slug}-{icon}")
    }

    pub fn insert(&mut self, key: String, id: i64) {
        self.ids.insert(key, id);
    }

    /// Media id of `icon` shipped by `pack_slug`
    pub fn get(&self, pack_slug: &str, icon: &str) -> Option<i64> {
        self.ids.get(&Self::media_key(pack_slug, icon)).copied()
    }

    /// Resolve an optional icon reference, warning about unknown names
    pub fn resolve(&self, pack_slug: &str, icon: Option<&str>) -> Option<i64> {
        let icon = icon.filter(|i| !i.is_empty())?;
        let id = self.get(pack_slug, icon);
        if id.is_none() {
            warn!("Icon '{}' is not shipped by plugin pack '{}'", icon, pack_slug);
        }
        id
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Installs and removes the icons of a pack
#[derive(Debug, Clone, Copy, Default)]
pub struct IconManager;

impl IconManager {
    pub fn new() -> Self {
        Self
    }

    pub fn key_in_json(&self) -> &'static str {
        section::ICONS
    }

    fn entries(icons: Option<&Value>) -> Result<Option<&Map<String, Value>>> {
        match icons {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(Error::InvalidManifest(format!(
                "icons must map names to base64 images, got {other}"
            ))),
        }
    }

    /// Store every icon of the section and return their media ids
    pub fn install(&self, conn: &Connection, pack_slug: &str, icons: Option<&Value>) -> Result<IconMap> {
        let mut map = IconMap::new();
        let Some(entries) = Self::entries(icons)? else {
            return Ok(map);
        };

        for (name, encoded) in entries {
            let encoded = encoded.as_str().ok_or_else(|| {
                Error::InvalidManifest(format!("icon '{name}' must be a base64 string"))
            })?;
            let data = STANDARD
                .decode(encoded.trim())
                .map_err(|e| Error::InvalidManifest(format!("icon '{name}' is not valid base64: {e}")))?;

            let key = IconMap::media_key(pack_slug, name);
            let id = Icon::new(key.clone(), data).upsert(conn)?;
            map.insert(key, id);
        }
        debug!("Installed {} icons for {}", map.len(), pack_slug);
        Ok(map)
    }

    /// Remove every icon listed in the section
    pub fn uninstall(&self, conn: &Connection, pack_slug: &str, icons: Option<&Value>) -> Result<()> {
        let Some(entries) = Self::entries(icons)? else {
            return Ok(());
        };
        for name in entries.keys() {
            Icon::delete_by_slug(conn, &IconMap::media_key(pack_slug, name))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use serde_json::json;

    #[test]
    fn test_install_and_uninstall() {
        let conn = db::open_in_memory().unwrap();
        let section = json!({"tux": STANDARD.encode(b"png-bytes"), "logo": STANDARD.encode(b"x")});

        let map = IconManager::new().install(&conn, "linux", Some(&section)).unwrap();
        assert_eq!(map.len(), 2);
        let id = map.get("linux", "tux").unwrap();
        let icon = Icon::find_by_slug(&conn, "linux-tux").unwrap().unwrap();
        assert_eq!(icon.id, Some(id));
        assert_eq!(icon.data, b"png-bytes");
        assert_eq!(map.resolve("linux", Some("logo")), map.get("linux", "logo"));
        assert_eq!(map.resolve("linux", Some("absent")), None);
        assert_eq!(map.resolve("linux", None), None);

        IconManager::new().uninstall(&conn, "linux", Some(&section)).unwrap();
        assert!(Icon::find_by_slug(&conn, "linux-tux").unwrap().is_none());
    }

    #[test]
    fn test_invalid_icons() {
        let conn = db::open_in_memory().unwrap();
        let manager = IconManager::new();
        assert!(manager.install(&conn, "p", Some(&json!(["a"]))).is_err());
        assert!(manager.install(&conn, "p", Some(&json!({"a": 1}))).is_err());
        assert!(manager.install(&conn, "p", Some(&json!({"a": "%%%"}))).is_err());
        assert!(manager.install(&conn, "p", None).unwrap().is_empty());
    }
}
