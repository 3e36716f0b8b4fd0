use std::collections::HashMap;

use flashtrans_types::{ChatTurn, RequestId, RequestKind};

use crate::dashboard::DashboardStore;

/// Turns of chat history offered to the model
pub const MAX_CHAT_HISTORY: usize = 20;

/// What one kind's popup currently shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelState {
    pub request_id: Option<RequestId>,
    pub source: Option<String>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub busy: bool,
}

/// Source and translation of the latest successful result
#[derive(Debug, Clone, PartialEq)]
pub struct LastContext {
    pub source: String,
    pub translation: String,
}

impl LastContext {
    pub fn render(&self) -> String {
        format!("[Source] {}\n[Translation] {}", self.source, self.translation)
    }
}

#[derive(Debug, Default)]
pub struct ChatState {
    pub history: Vec<ChatTurn>,
    /// Question and answer-so-far of the running chat request
    pub pending: Option<PendingAnswer>,
}

#[derive(Debug, Clone)]
pub struct PendingAnswer {
    pub request_id: RequestId,
    pub question: String,
    pub answer: String,
}

impl ChatState {
    pub fn remember(&mut self, question: String, answer: String) {
        self.history.push(ChatTurn::user(question));
        self.history.push(ChatTurn::assistant(answer));
        if self.history.len() > MAX_CHAT_HISTORY {
            let excess = self.history.len() - MAX_CHAT_HISTORY;
            self.history.drain(..excess);
        }
    }
}

/// UI-owned state, mutated only by the presenter
#[derive(Debug, Default)]
pub struct UiState {
    pub panels: HashMap<RequestKind, PanelState>,
    pub chat: ChatState,
    pub dashboard: DashboardStore,
    pub last_context: Option<LastContext>,
    pub notice: Option<String>,
}

impl UiState {
    pub fn new(dashboard: DashboardStore) -> Self {
        Self {
            dashboard,
            ..Default::default()
        }
    }

    pub fn panel(&self, kind: RequestKind) -> Option<&PanelState> {
        self.panels.get(&kind)
    }

    pub(crate) fn panel_mut(&mut self, kind: RequestKind, request_id: RequestId) -> &mut PanelState {
        let panel = self.panels.entry(kind).or_default();
        if panel.request_id != Some(request_id) {
            *panel = PanelState {
                request_id: Some(request_id),
                ..Default::default()
            };
        }
        panel
    }
}
