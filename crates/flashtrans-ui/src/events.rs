use flashtrans_types::{RequestId, RequestKind};

use crate::dashboard::{DashboardRecord, EditedFields};

/// Requests from the host UI, handled on the presenter task
#[derive(Debug, Clone)]
pub enum UiCommand {
    Chat(String),
    StopChat,
    EditRecord { index: usize, fields: EditedFields },
    ClearDashboard,
    Snapshot,
}

/// Changes to render, in the order they were applied
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    /// Request accepted and running
    PanelBusy { kind: RequestKind, request_id: RequestId },
    /// Text the request is working on (selection, typed or recognized)
    PanelSource {
        kind: RequestKind,
        request_id: RequestId,
        text: String,
    },
    PanelResult {
        kind: RequestKind,
        request_id: RequestId,
        text: String,
        target: String,
    },
    PanelError {
        kind: RequestKind,
        request_id: RequestId,
        message: String,
    },
    Notice(String),
    ChatQuestion(String),
    ChatFragment(String),
    ChatAnswer(String),
    /// In-progress answer abandoned; fragments shown so far are void
    ChatDiscarded,
    DashboardAppended { index: usize, record: DashboardRecord },
    DashboardUpdated { index: usize, record: DashboardRecord },
    DashboardCleared,
    Snapshot(Vec<DashboardRecord>),
}
