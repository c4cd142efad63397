use serde::{Deserialize, Serialize};

/// One summarized item to be written as reading files and reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub summary: String,
    pub source: String,
    /// Display date, copied as-is
    pub pub_date: String,
    #[serde(default)]
    pub link: String,
}

impl Article {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            source: String::new(),
            pub_date: String::new(),
            link: String::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_pub_date(mut self, pub_date: impl Into<String>) -> Self {
        self.pub_date = pub_date.into();
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }
}
