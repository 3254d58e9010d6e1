use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    Ltp,
    Quote,
    Full,
}

impl FeedMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedMode::Ltp => "ltp",
            FeedMode::Quote => "quote",
            FeedMode::Full => "full",
        }
    }
}

impl std::fmt::Display for FeedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
