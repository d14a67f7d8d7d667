//! The results panel: code, search and image output gathered from a thread.

use std::fmt;
use std::str::FromStr;

use crate::{CodeBlock, ImageAnalysis, Message, SearchResult};

/// A tab of the results panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultsTab {
    /// Code blocks.
    Code,
    /// Search results.
    Search,
    /// Image analysis.
    Image,
}

impl ResultsTab {
    /// The label shown for the tab.
    pub fn label(self) -> &'static str {
        match self {
            ResultsTab::Code => "Code",
            ResultsTab::Search => "Search",
            ResultsTab::Image => "Image",
        }
    }
}

impl fmt::Display for ResultsTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResultsTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "code" => Ok(ResultsTab::Code),
            "search" => Ok(ResultsTab::Search),
            "image" => Ok(ResultsTab::Image),
            _ => Err(format!("unknown results tab '{s}'; expected code, search or image")),
        }
    }
}

/// The newest results of a thread.
///
/// Each kind of result comes from the newest assistant message that has one,
/// so a reply with only search results does not hide older code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsPanel {
    /// Code blocks of the newest reply that produced code.
    pub code: Vec<CodeBlock>,
    /// Search results of the newest reply that searched.
    pub search_results: Vec<SearchResult>,
    /// Image analysis of the newest reply that analyzed an image.
    pub image_analysis: Option<ImageAnalysis>,
}

impl ResultsPanel {
    /// Gather the results of `messages`, scanning from the newest.
    pub fn from_messages(messages: &[Message]) -> Self {
        let mut panel = ResultsPanel::default();
        for message in messages.iter().rev() {
            if !message.role.is_assistant() {
                continue;
            }
            let Some(metadata) = &message.metadata else {
                continue;
            };
            let metadata = metadata.reconciled();
            if panel.code.is_empty() && !metadata.code.is_empty() {
                panel.code = metadata.code;
            }
            if panel.search_results.is_empty() && !metadata.search_results.is_empty() {
                panel.search_results = metadata.search_results;
            }
            if panel.image_analysis.is_none() && metadata.image_analysis.is_some() {
                panel.image_analysis = metadata.image_analysis;
            }
        }
        panel
    }

    /// True when there is nothing to show.
    pub fn is_empty(&self) -> bool {
        self.tabs().is_empty()
    }

    /// The tabs with content, in display order.
    pub fn tabs(&self) -> Vec<ResultsTab> {
        let mut tabs = Vec::with_capacity(3);
        if !self.code.is_empty() {
            tabs.push(ResultsTab::Code);
        }
        if !self.search_results.is_empty() {
            tabs.push(ResultsTab::Search);
        }
        if self.image_analysis.is_some() {
            tabs.push(ResultsTab::Image);
        }
        tabs
    }

    /// Clamp a selected tab index to the tabs available.
    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.tabs().len().saturating_sub(1))
    }

    /// The tab at `index`, clamped to the last tab.
    pub fn tab_at(&self, index: usize) -> Option<ResultsTab> {
        let tabs = self.tabs();
        tabs.get(self.clamp_index(index)).copied()
    }

    /// The index of `tab`, if it has content.
    pub fn index_of(&self, tab: ResultsTab) -> Option<usize> {
        self.tabs().iter().position(|t| *t == tab)
    }
}
