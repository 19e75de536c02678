//! Persistent Dock items, read from the Dock's preferences domain.
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

/// One application tile from the Dock's `persistent-apps` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockItem {
    /// Bundle identifier of the application.
    pub bundle_id: String,
    /// Tile label as shown in the Dock.
    pub label: String,
    /// Bundle path decoded from the tile's file URL.
    pub path: Option<String>,
}

/// `"key" = value;` lines in `defaults read` output; quotes are optional.
static ENTRY_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r#"^\s*"?(bundle-identifier|file-label|_CFURLString|tile-type)"?\s*=\s*"?(.*?)"?;\s*$"#)
        .ok()
});

/// Filesystem path for a `file://` URL, with percent escapes decoded.
///
/// A path whose escapes do not decode to UTF-8 is kept verbatim.
fn url_to_path(url: &str) -> Option<String> {
    let rest = url.strip_prefix("file://")?;
    let path = urlencoding::decode(rest).unwrap_or_else(|_| rest.into());
    Some(path.trim_end_matches('/').to_string())
}

/// Parse `defaults read com.apple.dock persistent-apps` output.
///
/// Tiles without a bundle identifier (folders, URLs) are skipped. Order is
/// the Dock's left-to-right order.
pub fn parse_persistent_apps(text: &str) -> Vec<DockItem> {
    let mut out = Vec::new();
    let Some(re) = ENTRY_RE.as_ref() else {
        return out;
    };
    let (mut bundle_id, mut label, mut path) = (None, None, None);
    for line in text.lines() {
        let Some(caps) = re.captures(line) else {
            continue;
        };
        let value = caps[2].to_string();
        match &caps[1] {
            "bundle-identifier" => bundle_id = Some(value),
            "file-label" => label = Some(value),
            "_CFURLString" => path = url_to_path(&value),
            // `tile-type` sorts last within a tile and closes it.
            _ => {
                if let Some(bid) = bundle_id.take() {
                    out.push(DockItem {
                        label: label.take().unwrap_or_else(|| bid.clone()),
                        bundle_id: bid,
                        path: path.take(),
                    });
                }
                label = None;
                path = None;
            }
        }
    }
    out
}

/// Read the current Dock application tiles.
pub fn dock_apps() -> Result<Vec<DockItem>> {
    let output = Command::new("defaults")
        .args(["read", "com.apple.dock", "persistent-apps"])
        .output()
        .map_err(|e| Error::Dock(e.to_string()))?;
    if !output.status.success() {
        return Err(Error::Dock(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    let items = parse_persistent_apps(&String::from_utf8_lossy(&output.stdout));
    debug!(count = items.len(), "dock_apps_read");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"(
        {
        GUID = 1371180466;
        "tile-data" =         {
            book = {length = 592, bytes = 0x626f6f6b 50020000 00000410 30000000};
            "bundle-identifier" = "com.apple.Safari";
            "dock-extra" = 0;
            "file-data" =             {
                "_CFURLString" = "file:///Applications/Safari.app/";
                "_CFURLStringType" = 15;
            };
            "file-label" = Safari;
            "file-mod-date" = 3629387845;
            "file-type" = 41;
        };
        "tile-type" = "file-tile";
    },
        {
        GUID = 1371180467;
        "tile-data" =         {
            "file-data" =             {
                "_CFURLString" = "file:///Users/me/Downloads/";
                "_CFURLStringType" = 15;
            };
            "file-label" = Downloads;
        };
        "tile-type" = "directory-tile";
    },
        {
        GUID = 1371180468;
        "tile-data" =         {
            "bundle-identifier" = "com.microsoft.VSCode";
            "file-data" =             {
                "_CFURLString" = "file:///Applications/Visual%20Studio%20Code.app/";
                "_CFURLStringType" = 15;
            };
            "file-label" = "Visual Studio Code";
        };
        "tile-type" = "file-tile";
    }
)"#;

    #[test]
    fn parses_app_tiles_in_order() {
        let items = parse_persistent_apps(SAMPLE);
        assert_eq!(
            items,
            vec![
                DockItem {
                    bundle_id: "com.apple.Safari".into(),
                    label: "Safari".into(),
                    path: Some("/Applications/Safari.app".into()),
                },
                DockItem {
                    bundle_id: "com.microsoft.VSCode".into(),
                    label: "Visual Studio Code".into(),
                    path: Some("/Applications/Visual Studio Code.app".into()),
                },
            ]
        );
    }

    #[test]
    fn empty_dock() {
        assert!(parse_persistent_apps("(\n)\n").is_empty());
        assert!(parse_persistent_apps("").is_empty());
    }

    #[test]
    fn percent_decoding() {
        assert_eq!(
            url_to_path("file:///Applications/a%20b.app/").as_deref(),
            Some("/Applications/a b.app")
        );
        assert_eq!(url_to_path("file:///tmp/100%").as_deref(), Some("/tmp/100%"));
        assert_eq!(url_to_path("file:///tmp/%zz").as_deref(), Some("/tmp/%zz"));
        assert_eq!(url_to_path("file:///tmp/%FF").as_deref(), Some("/tmp/%FF"));
        assert_eq!(url_to_path("https://example.com/"), None);
    }
}
