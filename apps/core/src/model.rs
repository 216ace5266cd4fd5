use serde::{Deserialize, Serialize};

/// One hit returned by the search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub url: String,
    pub filename: String,
    pub mime_type: Option<String>,
    pub relevancy_rating: String,
    pub abstract_text: String,
    /// Internal path of a sub-document inside its container file; empty for plain files.
    #[serde(default)]
    pub ipath: String,
}

impl DocumentRecord {
    pub fn new(url: &str, filename: &str, mime_type: Option<&str>, relevancy_rating: &str) -> Self {
        Self {
            url: url.to_string(),
            filename: filename.to_string(),
            mime_type: mime_type.map(str::to_string),
            relevancy_rating: relevancy_rating.to_string(),
            abstract_text: String::new(),
            ipath: String::new(),
        }
    }

    pub fn with_ipath(mut self, ipath: &str) -> Self {
        self.ipath = ipath.to_string();
        self
    }

    pub fn with_abstract(mut self, abstract_text: &str) -> Self {
        self.abstract_text = abstract_text.to_string();
        self
    }

    /// Numeric relevancy, e.g. `"87%"` -> `87.0`.
    pub fn rating(&self) -> Option<f64> {
        parse_rating(&self.relevancy_rating)
    }

    /// The url of the file that holds this record.
    ///
    /// A trailing `#<ipath>` is dropped only when it matches the record's own
    /// `ipath`; any other `#` belongs to the file name.
    pub fn container_url(&self) -> &str {
        container_url(&self.url, &self.ipath)
    }
}

pub fn parse_rating(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    number.parse::<f64>().ok().filter(|value| !value.is_nan())
}

pub fn container_url<'a>(url: &'a str, ipath: &str) -> &'a str {
    if ipath.is_empty() {
        return url;
    }
    url.strip_suffix(ipath)
        .and_then(|rest| rest.strip_suffix('#'))
        .unwrap_or(url)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseBehavior {
    #[default]
    CloseOnSuccess,
    CloseOnExit,
    DoNotClose,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionEffect {
    OpenUrl {
        url: String,
    },
    CopyText {
        text: String,
    },
    RevealInFileBrowser {
        dir: String,
    },
    RunDetached {
        argv: Vec<String>,
        workdir: Option<String>,
    },
    RunInTerminal {
        script: String,
        workdir: Option<String>,
        close: CloseBehavior,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub label: String,
    pub effect: ActionEffect,
}

impl ActionDescriptor {
    pub fn new(label: &str, effect: ActionEffect) -> Self {
        Self {
            label: label.to_string(),
            effect,
        }
    }
}

/// A presentable launcher row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    pub id: String,
    pub icon: String,
    pub text: String,
    pub subtext: String,
    pub completion: String,
    pub actions: Vec<ActionDescriptor>,
}
