use std::path::{Path, PathBuf};

use crate::model::{ActionDescriptor, ActionEffect, CloseBehavior, DocumentRecord, ResultItem};

pub const OPEN_WITH_DEFAULT_APP: &str = "Open with default application";
pub const REVEAL_IN_FILE_BROWSER: &str = "Reveal in file browser";
pub const OPEN_TERMINAL_AT_THIS_PATH: &str = "Open terminal at this path";
pub const COPY_FILE_CLIPBOARD: &str = "Copy file to clipboard";
pub const COPY_PATH_CLIPBOARD: &str = "Copy path to clipboard";

pub const UNKNOWN_ICON: &str = "unknown";
const FILE_SCHEME: &str = "file://";
const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Platform {
    pub const fn current() -> Self {
        if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Other
        }
    }

    fn is_unix(self) -> bool {
        !matches!(self, Self::Windows)
    }
}

/// Resolves a symbolic icon name to something the host can render.
pub trait IconLookup: Send + Sync {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Looks up icons in freedesktop icon theme directories. Never writes.
#[derive(Debug, Clone)]
pub struct ThemeIconLookup {
    roots: Vec<PathBuf>,
    themes: Vec<String>,
}

const ICON_SIZES: [&str; 8] = [
    "scalable", "256x256", "128x128", "64x64", "48x48", "32x32", "24x24", "16x16",
];
const ICON_EXTENSIONS: [&str; 2] = ["svg", "png"];

impl ThemeIconLookup {
    pub fn new(roots: Vec<PathBuf>, themes: Vec<String>) -> Self {
        Self { roots, themes }
    }

    pub fn from_env() -> Self {
        let mut roots = Vec::new();
        if let Some(home) = std::env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
            roots.push(PathBuf::from(home).join("icons"));
        } else if let Some(home) = std::env::var_os("HOME").filter(|v| !v.is_empty()) {
            roots.push(PathBuf::from(home).join(".local/share/icons"));
        }
        let data_dirs = std::env::var("XDG_DATA_DIRS")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string());
        roots.extend(
            data_dirs
                .split(':')
                .filter(|dir| !dir.is_empty())
                .map(|dir| Path::new(dir).join("icons")),
        );
        roots.push(PathBuf::from("/usr/share/pixmaps"));

        Self::new(roots, vec!["hicolor".to_string(), "Adwaita".to_string()])
    }
}

impl IconLookup for ThemeIconLookup {
    fn lookup(&self, name: &str) -> Option<String> {
        if name.is_empty() || name.contains('/') {
            return None;
        }
        for root in &self.roots {
            for theme in &self.themes {
                for size in ICON_SIZES {
                    for ext in ICON_EXTENSIONS {
                        let path = root
                            .join(theme)
                            .join(size)
                            .join("mimetypes")
                            .join(format!("{name}.{ext}"));
                        if path.is_file() {
                            return Some(path.to_string_lossy().into_owned());
                        }
                    }
                }
            }
            for ext in ICON_EXTENSIONS {
                let path = root.join(format!("{name}.{ext}"));
                if path.is_file() {
                    return Some(path.to_string_lossy().into_owned());
                }
            }
        }
        None
    }
}

/// Local path for a `file://` url, or `None` for any other scheme.
///
/// The url is taken verbatim; pass a record's `container_url()` to address the
/// file that holds a sub-document.
pub fn path_from_url(url: &str) -> Option<String> {
    let path = url.strip_prefix(FILE_SCHEME)?;
    if path.is_empty() {
        return None;
    }
    Some(path.to_string())
}

pub fn icon_for(record: &DocumentRecord, icons: &dyn IconLookup) -> String {
    let by_mime = record
        .mime_type
        .as_deref()
        .filter(|mime| !mime.is_empty())
        .and_then(|mime| icons.lookup(&mime.replace('/', "-")));
    by_mime
        .or_else(|| icons.lookup(UNKNOWN_ICON))
        .unwrap_or_else(|| UNKNOWN_ICON.to_string())
}

/// Mime type used for clipboard transfers; the extension is consulted only
/// when the record has none.
pub fn mime_hint(path: &str, record: &DocumentRecord) -> String {
    record
        .mime_type
        .clone()
        .filter(|mime| !mime.is_empty())
        .or_else(|| {
            mime_guess::from_path(path)
                .first()
                .map(|mime| mime.essence_str().to_string())
        })
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}

pub fn to_items(
    records: &[DocumentRecord],
    platform: Platform,
    icons: &dyn IconLookup,
) -> Vec<ResultItem> {
    records
        .iter()
        .filter_map(|record| to_item(record, platform, icons))
        .collect()
}

pub fn to_item(
    record: &DocumentRecord,
    platform: Platform,
    icons: &dyn IconLookup,
) -> Option<ResultItem> {
    let container = record.container_url();
    let Some(path) = path_from_url(container).map(|path| native_path(path, platform)) else {
        tracing::debug!(url = %record.url, "skipping non-local record");
        return None;
    };
    let Some(dir) = parent_dir(&path) else {
        tracing::debug!(url = %record.url, "skipping record without a parent directory");
        return None;
    };

    let mime = mime_hint(&path, record);
    let mut actions = vec![
        ActionDescriptor::new(
            OPEN_WITH_DEFAULT_APP,
            ActionEffect::OpenUrl {
                url: container.to_string(),
            },
        ),
        ActionDescriptor::new(
            COPY_PATH_CLIPBOARD,
            ActionEffect::CopyText { text: path.clone() },
        ),
        ActionDescriptor::new(COPY_FILE_CLIPBOARD, copy_file_effect(&path, &mime, platform)),
    ];
    if let Some(reveal) = reveal_effect(&dir, platform) {
        actions.push(ActionDescriptor::new(REVEAL_IN_FILE_BROWSER, reveal));
    }
    if platform.is_unix() {
        actions.push(ActionDescriptor::new(
            OPEN_TERMINAL_AT_THIS_PATH,
            ActionEffect::RunInTerminal {
                script: "exec \"${SHELL:-sh}\"".to_string(),
                workdir: Some(dir.clone()),
                close: CloseBehavior::DoNotClose,
            },
        ));
    }

    let text = if record.filename.is_empty() {
        Path::new(&path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone())
    } else {
        record.filename.clone()
    };

    Some(ResultItem {
        id: format!("recoll:{}", record.url),
        icon: icon_for(record, icons),
        text,
        subtext: dir,
        completion: String::new(),
        actions,
    })
}

/// `file:///C:/x` decodes to `/C:/x`; Windows wants `C:/x`.
fn native_path(path: String, platform: Platform) -> String {
    let bytes = path.as_bytes();
    let has_drive = bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':';
    if platform == Platform::Windows && has_drive {
        path[1..].to_string()
    } else {
        path
    }
}

fn parent_dir(path: &str) -> Option<String> {
    let parent = Path::new(path).parent()?;
    let dir = parent.to_string_lossy();
    if dir.is_empty() {
        None
    } else {
        Some(dir.into_owned())
    }
}

fn copy_file_effect(path: &str, mime: &str, platform: Platform) -> ActionEffect {
    match platform {
        Platform::MacOs => ActionEffect::RunDetached {
            argv: vec![
                "osascript".to_string(),
                "-e".to_string(),
                format!(
                    "set the clipboard to (POSIX file \"{}\")",
                    path.replace('\\', "\\\\").replace('"', "\\\"")
                ),
            ],
            workdir: None,
        },
        Platform::Windows => ActionEffect::RunDetached {
            argv: vec![
                "powershell".to_string(),
                "-NoProfile".to_string(),
                "-Command".to_string(),
                format!("Set-Clipboard -LiteralPath '{}'", path.replace('\'', "''")),
            ],
            workdir: None,
        },
        Platform::Linux | Platform::Other => ActionEffect::RunInTerminal {
            script: format!(
                "xclip -selection clipboard -t {} -i {}",
                shell_quote(mime),
                shell_quote(path)
            ),
            workdir: Some("/usr/bin".to_string()),
            close: CloseBehavior::CloseOnSuccess,
        },
    }
}

fn reveal_effect(dir: &str, platform: Platform) -> Option<ActionEffect> {
    match platform {
        Platform::Linux => Some(ActionEffect::RunDetached {
            argv: vec!["xdg-open".to_string(), dir.to_string()],
            workdir: None,
        }),
        Platform::MacOs => Some(ActionEffect::RunDetached {
            argv: vec!["open".to_string(), dir.to_string()],
            workdir: None,
        }),
        Platform::Windows => Some(ActionEffect::RevealInFileBrowser {
            dir: dir.to_string(),
        }),
        Platform::Other => None,
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::{native_path, path_from_url, shell_quote, Platform};

    #[test]
    fn strips_only_the_file_scheme() {
        assert_eq!(path_from_url("file:///home/u/doc.pdf").as_deref(), Some("/home/u/doc.pdf"));
        assert_eq!(
            path_from_url("file:///home/u/Track#1.mp3").as_deref(),
            Some("/home/u/Track#1.mp3")
        );
        assert_eq!(path_from_url("http://example.com/x"), None);
        assert_eq!(path_from_url("file://"), None);
    }

    #[test]
    fn windows_drive_paths_lose_leading_slash() {
        assert_eq!(native_path("/C:/docs/a.txt".into(), Platform::Windows), "C:/docs/a.txt");
        assert_eq!(native_path("/C:/docs/a.txt".into(), Platform::Linux), "/C:/docs/a.txt");
    }

    #[test]
    fn quotes_single_quotes_for_sh() {
        assert_eq!(shell_quote("it's.txt"), "'it'\\''s.txt'");
    }
}
