use serde::{Deserialize, Serialize};

/// What produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// A keyword found in OCR text.
    Text,
    /// A keyword found in text recovered from the file name.
    Filename,
    /// A keyword found in the parent folder name.
    Folder,
    /// Nothing matched.
    Fallback,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Filename => "filename",
            Self::Folder => "folder",
            Self::Fallback => "fallback",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "filename" => Some(Self::Filename),
            "folder" => Some(Self::Folder),
            "fallback" => Some(Self::Fallback),
            _ => None,
        }
    }
}

impl std::fmt::Display for MatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (category, subcategory) pair from the rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Folder-style id, e.g. `01_Esportes`.
    pub category_id: String,
    /// Display name, e.g. `Esportes`.
    pub category: String,
    pub subcategory: String,
    /// Keyword that decided the match.
    pub keyword: Option<String>,
    pub source: MatchSource,
}

impl Classification {
    pub fn is_fallback(&self) -> bool {
        self.source == MatchSource::Fallback
    }

    /// `category/subcategory` label for display.
    pub fn label(&self) -> String {
        format!("{}/{}", self.category, self.subcategory)
    }
}
