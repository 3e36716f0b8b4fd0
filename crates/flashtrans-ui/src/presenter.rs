use std::collections::HashMap;
use std::sync::Arc;

use flashtrans_config::dashboard::DashboardConfig;
use flashtrans_core::Dispatcher;
use flashtrans_types::{
    ChatPrompt, ErrorKind, Payload, PipelineEvent, PipelineStage, RequestId, RequestKind,
    StageProgress,
};

use crate::dashboard::{DashboardRecord, DashboardStore, EditedFields, UpdateOutcome};
use crate::events::{UiCommand, UiUpdate};
use crate::state::{LastContext, PendingAnswer, UiState};

/// Sole owner of UI state; turns pipeline events and UI commands into updates
pub struct Presenter {
    dispatcher: Arc<Dispatcher>,
    state: UiState,
    progress: HashMap<RequestId, StageProgress>,
    /// Dashboard index awaiting each retranslation
    pending_retranslate: HashMap<RequestId, usize>,
    editable: bool,
}

impl Presenter {
    pub fn new(dispatcher: Arc<Dispatcher>, config: &DashboardConfig) -> Self {
        Self::with_dashboard(dispatcher, config, DashboardStore::new())
    }

    pub fn with_dashboard(
        dispatcher: Arc<Dispatcher>,
        config: &DashboardConfig,
        dashboard: DashboardStore,
    ) -> Self {
        Self {
            dispatcher,
            state: UiState::new(dashboard),
            progress: HashMap::new(),
            pending_retranslate: HashMap::new(),
            editable: config.editable,
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    /// Apply one pipeline event; stale or out-of-order events change nothing
    pub fn apply(&mut self, event: PipelineEvent) -> Vec<UiUpdate> {
        let PipelineEvent {
            request_id: id,
            kind,
            stage,
        } = event;

        if !self.dispatcher.is_active(id, kind) {
            tracing::debug!("[PRESENTER] discarding {} from superseded {} ({})", stage.name(), id, kind);
            self.progress.remove(&id);
            self.pending_retranslate.remove(&id);
            return Vec::new();
        }

        if !self.progress.entry(id).or_default().advance(&stage) {
            tracing::warn!("[PRESENTER] out-of-order {} for {} ignored", stage.name(), id);
            return Vec::new();
        }

        let terminal = stage.is_terminal();
        let updates = match stage {
            PipelineStage::Captured(payload) => self.on_captured(id, kind, payload),
            PipelineStage::Recognized { text, confidence } => {
                tracing::debug!("[PRESENTER] {} recognized ({:.2})", id, confidence);
                self.show_source(id, kind, text)
            }
            PipelineStage::Partial(fragment) => self.on_partial(id, fragment),
            PipelineStage::Translated { text, target } => self.on_translated(id, kind, text, target),
            PipelineStage::Failed { kind: error, message } => self.on_failed(id, kind, error, message),
            PipelineStage::Cancelled => {
                self.on_cancelled(id, kind);
                Vec::new()
            }
        };

        if terminal {
            self.progress.remove(&id);
            self.dispatcher.retire(id, kind);
        }

        updates
    }

    pub fn handle_command(&mut self, command: UiCommand) -> Vec<UiUpdate> {
        match command {
            UiCommand::Chat(question) => self.start_chat(question),
            UiCommand::StopChat => self.stop_chat(),
            UiCommand::EditRecord { index, fields } => self.edit_record(index, fields),
            UiCommand::ClearDashboard => {
                if let Some(id) = self.dispatcher.cancel(RequestKind::DashboardRetranslate) {
                    tracing::debug!("[PRESENTER] retranslation {} dropped with dashboard", id);
                }
                self.pending_retranslate.clear();
                self.state.dashboard.clear();
                vec![UiUpdate::DashboardCleared]
            }
            UiCommand::Snapshot => vec![UiUpdate::Snapshot(
                self.state.dashboard.to_ordered_sequence(),
            )],
        }
    }

    fn on_captured(&mut self, id: RequestId, kind: RequestKind, payload: Payload) -> Vec<UiUpdate> {
        if kind.is_chat() {
            return Vec::new();
        }

        self.state.panel_mut(kind, id).busy = true;
        let mut updates = vec![UiUpdate::PanelBusy {
            kind,
            request_id: id,
        }];

        if let Payload::Text(text) = payload {
            updates.extend(self.show_source(id, kind, text));
        }
        updates
    }

    fn show_source(&mut self, id: RequestId, kind: RequestKind, text: String) -> Vec<UiUpdate> {
        if kind == RequestKind::DashboardRetranslate {
            return Vec::new();
        }
        self.state.panel_mut(kind, id).source = Some(text.clone());
        vec![UiUpdate::PanelSource {
            kind,
            request_id: id,
            text,
        }]
    }

    fn on_partial(&mut self, id: RequestId, fragment: String) -> Vec<UiUpdate> {
        match self.state.chat.pending.as_mut() {
            Some(pending) if pending.request_id == id => {
                pending.answer.push_str(&fragment);
                vec![UiUpdate::ChatFragment(fragment)]
            }
            _ => Vec::new(),
        }
    }

    fn on_translated(
        &mut self,
        id: RequestId,
        kind: RequestKind,
        text: String,
        target: String,
    ) -> Vec<UiUpdate> {
        match kind {
            RequestKind::Chat => self.finish_chat(id, text),
            RequestKind::DashboardRetranslate => self.finish_retranslate(id, text),
            _ => {
                let panel = self.state.panel_mut(kind, id);
                panel.busy = false;
                panel.result = Some(text.clone());
                let source = panel.source.clone().unwrap_or_default();

                self.state.last_context = Some(LastContext {
                    source: source.clone(),
                    translation: text.clone(),
                });

                let mut updates = vec![UiUpdate::PanelResult {
                    kind,
                    request_id: id,
                    text: text.clone(),
                    target,
                }];

                if kind.populates_dashboard() {
                    let record = DashboardRecord::new(source, text, kind, self.editable);
                    let index = self.state.dashboard.append(record.clone());
                    tracing::debug!("[PRESENTER] {} appended as dashboard record {}", id, index);
                    updates.push(UiUpdate::DashboardAppended { index, record });
                }
                updates
            }
        }
    }

    fn finish_chat(&mut self, id: RequestId, text: String) -> Vec<UiUpdate> {
        match self.state.chat.pending.take() {
            Some(pending) if pending.request_id == id => {
                self.state.chat.remember(pending.question, text.clone());
                vec![UiUpdate::ChatAnswer(text)]
            }
            other => {
                self.state.chat.pending = other;
                Vec::new()
            }
        }
    }

    fn finish_retranslate(&mut self, id: RequestId, text: String) -> Vec<UiUpdate> {
        let Some(index) = self.pending_retranslate.remove(&id) else {
            return Vec::new();
        };

        match self.state.dashboard.set_translation(index, text) {
            Ok(record) => vec![UiUpdate::DashboardUpdated {
                index,
                record: record.clone(),
            }],
            Err(e) => {
                tracing::warn!("[PRESENTER] retranslation {} lost: {}", id, e);
                Vec::new()
            }
        }
    }

    fn on_failed(
        &mut self,
        id: RequestId,
        kind: RequestKind,
        error: ErrorKind,
        detail: String,
    ) -> Vec<UiUpdate> {
        let message = if detail.is_empty() {
            error.user_message().to_string()
        } else {
            format!("{}: {}", error.user_message(), detail)
        };

        let mut updates = Vec::new();
        match kind {
            RequestKind::Chat => {
                if self.discard_pending_chat(id) {
                    updates.push(UiUpdate::ChatDiscarded);
                }
            }
            RequestKind::DashboardRetranslate => {
                self.pending_retranslate.remove(&id);
            }
            _ => {
                let panel = self.state.panel_mut(kind, id);
                panel.busy = false;
                panel.error = Some(message.clone());
            }
        }

        self.state.notice = Some(message.clone());
        updates.push(UiUpdate::PanelError {
            kind,
            request_id: id,
            message: message.clone(),
        });
        updates.push(UiUpdate::Notice(message));
        updates
    }

    fn on_cancelled(&mut self, id: RequestId, kind: RequestKind) {
        match kind {
            RequestKind::Chat => {
                self.discard_pending_chat(id);
            }
            RequestKind::DashboardRetranslate => {
                self.pending_retranslate.remove(&id);
            }
            _ => {
                if let Some(panel) = self.state.panels.get_mut(&kind) {
                    if panel.request_id == Some(id) {
                        panel.busy = false;
                    }
                }
            }
        }
    }

    fn discard_pending_chat(&mut self, id: RequestId) -> bool {
        match &self.state.chat.pending {
            Some(pending) if pending.request_id == id => {
                self.state.chat.pending = None;
                true
            }
            _ => false,
        }
    }

    fn start_chat(&mut self, question: String) -> Vec<UiUpdate> {
        let question = question.trim().to_string();
        let prompt = ChatPrompt {
            question: question.clone(),
            context: self.state.last_context.as_ref().map(LastContext::render),
            history: self.state.chat.history.clone(),
        };

        match self.dispatcher.submit(RequestKind::Chat, Payload::Chat(prompt)) {
            Ok(id) => {
                let mut updates = Vec::new();
                if self.state.chat.pending.take().is_some() {
                    updates.push(UiUpdate::ChatDiscarded);
                }
                self.state.chat.pending = Some(PendingAnswer {
                    request_id: id,
                    question: question.clone(),
                    answer: String::new(),
                });
                updates.push(UiUpdate::ChatQuestion(question));
                updates
            }
            Err(e) => {
                tracing::warn!("[PRESENTER] chat rejected: {}", e);
                vec![UiUpdate::Notice(e.kind().user_message().to_string())]
            }
        }
    }

    fn stop_chat(&mut self) -> Vec<UiUpdate> {
        let cancelled = self.dispatcher.cancel(RequestKind::Chat);
        tracing::debug!("[PRESENTER] stop chat: {:?}", cancelled);
        match self.state.chat.pending.take() {
            Some(_) => vec![UiUpdate::ChatDiscarded],
            None => Vec::new(),
        }
    }

    fn edit_record(&mut self, index: usize, fields: EditedFields) -> Vec<UiUpdate> {
        let outcome = match self.state.dashboard.update(index, fields) {
            Ok(outcome) => outcome,
            Err(e) => return vec![UiUpdate::Notice(e.to_string())],
        };

        let mut notices = Vec::new();
        if let UpdateOutcome::Retranslate { text } = outcome {
            // The retranslate slot holds one request; a newer edit evicts the older record's
            let evicted = self
                .dispatcher
                .active(RequestKind::DashboardRetranslate)
                .and_then(|old| self.pending_retranslate.remove(&old))
                .filter(|&old_index| old_index != index);

            match self
                .dispatcher
                .submit(RequestKind::DashboardRetranslate, Payload::Text(text))
            {
                Ok(id) => {
                    tracing::debug!("[PRESENTER] record {} retranslating as {}", index, id);
                    self.pending_retranslate.insert(id, index);
                }
                Err(e) => {
                    tracing::warn!("[PRESENTER] retranslation rejected: {}", e);
                    notices.push(UiUpdate::Notice(e.kind().user_message().to_string()));
                }
            }

            if let Some(old_index) = evicted {
                tracing::debug!("[PRESENTER] retranslation of record {} replaced", old_index);
                let message = format!(
                    "Retranslation of record {old_index} was replaced; its translation is stale"
                );
                self.state.notice = Some(message.clone());
                notices.push(UiUpdate::Notice(message));
            }
        }

        let mut updates = match self.state.dashboard.get(index) {
            Some(record) => vec![UiUpdate::DashboardUpdated {
                index,
                record: record.clone(),
            }],
            None => Vec::new(),
        };
        updates.extend(notices);
        updates
    }
}
