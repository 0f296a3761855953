use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// A single conversation entry. Never mutated once appended.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub sender: Sender,
    pub content: String,
}

/// Text extracted from the most recently uploaded document.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct DocumentContext {
    pub raw_text: String,
    pub present: bool,
    pub file_name: Option<String>,
    pub page_count: usize,
}

impl DocumentContext {
    pub fn new(raw_text: String, file_name: Option<String>, page_count: usize) -> Self {
        Self {
            raw_text,
            present: true,
            file_name,
            page_count,
        }
    }
}
