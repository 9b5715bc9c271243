use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Document-level facts read from the Info dictionary.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub page_count: usize,
    pub creator: Option<String>,
}

impl DocumentMetadata {
    /// Build from the decoded Info entries. Blank values count as absent.
    pub fn from_info(info: &BTreeMap<String, String>, page_count: usize) -> Self {
        let field = |key: &str| {
            info.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        DocumentMetadata {
            title: field("Title"),
            author: field("Author"),
            page_count,
            creator: field("Creator"),
        }
    }
}

/// Counters gathered while extracting one document.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub pages: usize,
    /// Pages whose text layout had to be analysed.
    pub pages_laid_out: usize,
    pub annotations: usize,
    pub outlines: usize,
}
