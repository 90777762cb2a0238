use crate::domain::{CreatorGroup, Post, SummaryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePane {
    Creators,
    Posts,
    Preview,
}

impl ActivePane {
    pub fn next(self) -> Self {
        match self {
            ActivePane::Creators => ActivePane::Posts,
            ActivePane::Posts => ActivePane::Preview,
            ActivePane::Preview => ActivePane::Creators,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ActivePane::Creators => ActivePane::Preview,
            ActivePane::Posts => ActivePane::Creators,
            ActivePane::Preview => ActivePane::Posts,
        }
    }
}

pub struct TuiApp {
    pub active_pane: ActivePane,
    pub groups: Vec<CreatorGroup>,
    pub group_index: usize,
    pub post_index: usize,
    pub preview_scroll: u16,
    /// Last generated summary; shown while it matches the selected creator.
    pub summary: Option<SummaryResult>,
    pub should_quit: bool,
    pub status_message: Option<String>,
    pub is_busy: bool,
}

impl TuiApp {
    pub fn new() -> Self {
        Self {
            active_pane: ActivePane::Creators,
            groups: Vec::new(),
            group_index: 0,
            post_index: 0,
            preview_scroll: 0,
            summary: None,
            should_quit: false,
            status_message: None,
            is_busy: false,
        }
    }

    pub fn selected_group(&self) -> Option<&CreatorGroup> {
        self.groups.get(self.group_index)
    }

    pub fn selected_post(&self) -> Option<&Post> {
        self.selected_group()?.posts.get(self.post_index)
    }

    /// The stored summary, but only while the selection still matches it.
    pub fn summary_for_selected(&self) -> Option<&SummaryResult> {
        let summary = self.summary.as_ref()?;
        let group = self.selected_group()?;
        (summary.creator_id == group.creator_id).then_some(summary)
    }

    pub fn set_groups(&mut self, groups: Vec<CreatorGroup>) {
        self.groups = groups;
        if self.group_index >= self.groups.len() {
            self.group_index = self.groups.len().saturating_sub(1);
        }
        self.post_index = 0;
        self.preview_scroll = 0;
    }

    pub fn move_up(&mut self) {
        match self.active_pane {
            ActivePane::Creators => {
                if self.group_index > 0 {
                    self.group_index -= 1;
                    self.post_index = 0;
                    self.preview_scroll = 0;
                }
            }
            ActivePane::Posts => {
                if self.post_index > 0 {
                    self.post_index -= 1;
                    self.preview_scroll = 0;
                }
            }
            ActivePane::Preview => {
                self.preview_scroll = self.preview_scroll.saturating_sub(1);
            }
        }
    }

    pub fn move_down(&mut self) {
        match self.active_pane {
            ActivePane::Creators => {
                if !self.groups.is_empty() && self.group_index < self.groups.len() - 1 {
                    self.group_index += 1;
                    self.post_index = 0;
                    self.preview_scroll = 0;
                }
            }
            ActivePane::Posts => {
                let count = self.selected_group().map(|g| g.count()).unwrap_or(0);
                if count > 0 && self.post_index < count - 1 {
                    self.post_index += 1;
                    self.preview_scroll = 0;
                }
            }
            ActivePane::Preview => {
                self.preview_scroll = self.preview_scroll.saturating_add(1);
            }
        }
    }

    pub fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
    }
}

impl Default for TuiApp {
    fn default() -> Self {
        Self::new()
    }
}
