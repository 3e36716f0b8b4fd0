use std::sync::Arc;
use std::time::Duration;

use flashtrans_config::Config;
use flashtrans_config::translator::TranslatorProvider;
use flashtrans_core::{Backends, Pipeline, build_pipeline};
use flashtrans_ocr::{DummyRecognizer, OcrError, Recognition, Recognizer, RgbaImage};
use flashtrans_translator::{
    ChatModel, ChatStream, DummyTranslator, FragmentStream, ProviderMetadata, TranslateError,
    Translation, Translator,
};
use flashtrans_types::{
    ChatPrompt, ErrorKind, LanguageCode, Payload, PipelineStage, RequestKind, StageProgress,
};
use flashtrans_ui::{DashboardRecord, DashboardStore, EditedFields, Presenter, UiCommand, UiUpdate};
use tokio::time::timeout;

use super::{WAIT, drive, pattern_image};

/// Blocks inside `recognize` until the test opens the gate
struct GatedRecognizer {
    started: kanal::Sender<()>,
    gate: kanal::Receiver<()>,
}

impl Recognizer for GatedRecognizer {
    fn recognize(&self, image: &RgbaImage) -> Result<Recognition, OcrError> {
        let _ = self.started.send(());
        let _ = self.gate.recv();
        Ok(Recognition {
            text: format!("gated {}x{}", image.width(), image.height()),
            confidence: 0.8,
        })
    }

    fn name(&self) -> &str {
        "gated"
    }
}

/// Chat model whose fragments are handed over one by one by the test
struct GatedChat {
    fragments: kanal::AsyncReceiver<String>,
}

struct GatedFragments {
    fragments: kanal::AsyncReceiver<String>,
}

#[async_trait::async_trait]
impl FragmentStream for GatedFragments {
    async fn next_fragment(&mut self) -> Option<Result<String, TranslateError>> {
        self.fragments.recv().await.ok().map(Ok)
    }
}

#[async_trait::async_trait]
impl Translator for GatedChat {
    async fn translate(
        &self,
        _text: &str,
        _from: Option<LanguageCode>,
        _to: LanguageCode,
    ) -> Result<Translation, TranslateError> {
        Err(TranslateError::ApiError("translate unused".into()))
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "gated-chat".into(),
            requires_api_key: false,
            local: true,
        }
    }

    fn chat(&self) -> Option<&dyn ChatModel> {
        Some(self)
    }
}

#[async_trait::async_trait]
impl ChatModel for GatedChat {
    async fn infer(&self, _prompt: &ChatPrompt) -> Result<ChatStream, TranslateError> {
        Ok(Box::new(GatedFragments {
            fragments: self.fragments.clone(),
        }))
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.ocr.upscale_below_px = 0;
    config
}

fn start(config: &Config, backends: Backends) -> (Pipeline, Presenter) {
    let pipeline = build_pipeline(config, backends);
    let presenter = Presenter::new(pipeline.dispatcher.clone(), &config.dashboard);
    (pipeline, presenter)
}

fn dummy_backends() -> Backends {
    Backends::new(Arc::new(DummyRecognizer), Arc::new(DummyTranslator::default()))
}

#[tokio::test]
async fn test_selection_translation_reaches_dashboard() {
    let (pipeline, mut presenter) = start(&config(), dummy_backends());

    let id = pipeline
        .dispatcher
        .submit(RequestKind::SelectionTranslate, Payload::text("hello"))
        .unwrap();
    let (stages, updates) = drive(&pipeline, &mut presenter, &[id]).await;

    assert_eq!(
        stages[&id].last(),
        Some(&PipelineStage::Translated {
            text: "[T]hello".into(),
            target: "zh".into()
        })
    );
    assert!(updates.iter().any(|u| matches!(
        u,
        UiUpdate::DashboardAppended { index: 0, record } if record.translated_text == "[T]hello"
    )));

    let records = presenter.state().dashboard.to_ordered_sequence();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].original_text, "hello");
    assert_eq!(records[0].kind, RequestKind::SelectionTranslate);
    assert_eq!(pipeline.dispatcher.active(RequestKind::SelectionTranslate), None);
}

#[tokio::test]
async fn test_second_region_capture_supersedes_first() {
    let (started_tx, started_rx) = kanal::unbounded();
    let started_rx = started_rx.to_async();
    let (gate_tx, gate_rx) = kanal::unbounded();
    let recognizer = GatedRecognizer {
        started: started_tx,
        gate: gate_rx,
    };
    let backends = Backends::new(Arc::new(recognizer), Arc::new(DummyTranslator::default()));
    let (pipeline, mut presenter) = start(&config(), backends);

    let first = pipeline
        .dispatcher
        .submit(RequestKind::RegionOcrTranslate, Payload::Image(pattern_image(4, 3)))
        .unwrap();
    timeout(WAIT, started_rx.recv()).await.unwrap().unwrap();

    let second = pipeline
        .dispatcher
        .submit(RequestKind::RegionOcrTranslate, Payload::Image(pattern_image(6, 2)))
        .unwrap();
    timeout(WAIT, started_rx.recv()).await.unwrap().unwrap();

    gate_tx.send(()).unwrap();
    gate_tx.send(()).unwrap();

    let (stages, _updates) = drive(&pipeline, &mut presenter, &[first, second]).await;

    assert_eq!(stages[&first].last(), Some(&PipelineStage::Cancelled));
    assert!(
        !stages[&first]
            .iter()
            .any(|s| matches!(s, PipelineStage::Translated { .. })),
        "cancelled capture was translated: {:?}",
        stages[&first]
    );
    assert!(matches!(
        stages[&second].last(),
        Some(PipelineStage::Translated { text, .. }) if text == "[T]gated 6x2"
    ));

    let records = presenter.state().dashboard.to_ordered_sequence();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].original_text, "gated 6x2");
}

#[tokio::test]
async fn test_missing_local_model_fails_without_touching_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config();
    config.translator.provider = TranslatorProvider::Local;
    config.translator.local.model_path = dir
        .path()
        .join("missing.gguf")
        .to_string_lossy()
        .into_owned();

    let backends = Backends::from_config(&config);
    assert!(!backends.translator.is_ready());
    let (pipeline, mut presenter) = start(&config, backends);

    let id = pipeline
        .dispatcher
        .submit(RequestKind::TypedTranslate, Payload::text("hello"))
        .unwrap();
    let (stages, updates) = drive(&pipeline, &mut presenter, &[id]).await;

    assert!(matches!(
        stages[&id].last(),
        Some(PipelineStage::Failed { kind: ErrorKind::ModelNotLoaded, message })
            if message == "Missing local model file: missing.gguf"
    ));
    assert!(updates.contains(&UiUpdate::Notice(
        "Model not loaded: Missing local model file: missing.gguf".into()
    )));
    assert!(presenter.state().dashboard.is_empty());
}

#[tokio::test]
async fn test_stopped_chat_stream_records_nothing() {
    let (fragments_tx, fragments_rx) = kanal::unbounded_async();
    let chat = GatedChat {
        fragments: fragments_rx,
    };
    let backends = Backends::new(Arc::new(DummyRecognizer), Arc::new(chat));
    let (pipeline, mut presenter) = start(&config(), backends);

    presenter.handle_command(UiCommand::Chat("hi".into()));
    let chat_id = pipeline.dispatcher.active(RequestKind::Chat).unwrap();

    fragments_tx.send("one ".to_string()).await.unwrap();
    let fragment = timeout(WAIT, async {
        loop {
            let event = pipeline.events.recv().await.unwrap();
            if let Some(update) = presenter.apply(event).into_iter().next() {
                return update;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(fragment, UiUpdate::ChatFragment("one ".into()));

    assert_eq!(
        presenter.handle_command(UiCommand::StopChat),
        vec![UiUpdate::ChatDiscarded]
    );

    // No further fragment arrives; the stop alone releases the worker
    let (stages, updates) = drive(&pipeline, &mut presenter, &[chat_id]).await;

    assert_eq!(stages[&chat_id], vec![PipelineStage::Cancelled]);
    assert!(updates.is_empty());
    assert!(presenter.state().chat.history.is_empty());
    assert!(presenter.state().chat.pending.is_none());
    drop(fragments_tx);
}

#[tokio::test]
async fn test_evicted_retranslation_leaves_record_flagged() {
    let config = config();
    let pipeline = build_pipeline(&config, dummy_backends());
    let records = vec![
        DashboardRecord::new("hello", "[T]hello", RequestKind::SelectionTranslate, true),
        DashboardRecord::new("sun", "[T]sun", RequestKind::TypedTranslate, true),
    ];
    let mut presenter = Presenter::with_dashboard(
        pipeline.dispatcher.clone(),
        &config.dashboard,
        DashboardStore::from_records(records),
    );

    let mut ids = Vec::new();
    let mut edit_updates = Vec::new();
    for (index, text) in [(0, "goodbye"), (1, "moon")] {
        edit_updates.extend(presenter.handle_command(UiCommand::EditRecord {
            index,
            fields: EditedFields {
                original_text: Some(text.into()),
                ..Default::default()
            },
        }));
        ids.push(
            pipeline
                .dispatcher
                .active(RequestKind::DashboardRetranslate)
                .unwrap(),
        );
    }
    assert!(edit_updates
        .iter()
        .any(|update| matches!(update, UiUpdate::Notice(message) if message.contains("record 0"))));

    let (stages, updates) = drive(&pipeline, &mut presenter, &ids).await;
    assert_eq!(stages[&ids[0]], vec![PipelineStage::Cancelled]);
    let refreshed: Vec<_> = updates
        .iter()
        .filter_map(|update| match update {
            UiUpdate::DashboardUpdated { index, record } => Some((*index, record.translated_text.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(refreshed, vec![(1, "[T]moon")]);

    let dashboard = presenter.state().dashboard.to_ordered_sequence();
    assert_eq!(
        (dashboard[0].original_text.as_str(), dashboard[0].translated_text.as_str()),
        ("goodbye", "[T]hello")
    );
    assert!(dashboard[0].stale);
    assert_eq!(dashboard[1].original_text, "moon");
    assert!(!dashboard[1].stale);
}

#[tokio::test]
async fn test_only_last_submit_reaches_dashboard() {
    let backends = Backends::new(
        Arc::new(DummyRecognizer),
        Arc::new(DummyTranslator::new(Duration::from_millis(10))),
    );
    let (pipeline, mut presenter) = start(&config(), backends);

    let ids: Vec<_> = (0..5)
        .map(|i| {
            pipeline
                .dispatcher
                .submit(RequestKind::TypedTranslate, Payload::text(format!("draft {i}")))
                .unwrap()
        })
        .collect();

    let (stages, _updates) = drive(&pipeline, &mut presenter, &ids).await;

    // Superseded drafts end cancelled or with a result nobody records
    for id in &ids[..4] {
        assert!(stages[id].last().is_some_and(PipelineStage::is_terminal));
    }

    let records = presenter.state().dashboard.to_ordered_sequence();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].original_text, "draft 4");
    assert_eq!(records[0].translated_text, "[T]draft 4");
}

#[tokio::test]
async fn test_every_kind_ends_with_one_terminal_stage() {
    let (pipeline, mut presenter) = start(&config(), dummy_backends());
    let dispatcher = &pipeline.dispatcher;

    let ids = vec![
        dispatcher
            .submit(RequestKind::SelectionTranslate, Payload::text("selected"))
            .unwrap(),
        dispatcher
            .submit(RequestKind::TypedTranslate, Payload::text("typed"))
            .unwrap(),
        dispatcher
            .submit(RequestKind::RegionOcrTranslate, Payload::Image(pattern_image(5, 5)))
            .unwrap(),
        dispatcher
            .submit(RequestKind::Chat, Payload::Chat(ChatPrompt::new("hi there")))
            .unwrap(),
        dispatcher
            .submit(RequestKind::DashboardRetranslate, Payload::text("again"))
            .unwrap(),
    ];

    let (stages, _updates) = drive(&pipeline, &mut presenter, &ids).await;

    for id in &ids {
        let sequence = &stages[id];
        let mut progress = StageProgress::default();
        for stage in sequence {
            assert!(progress.advance(stage), "{id} regressed: {sequence:?}");
        }
        assert!(progress.is_finished(), "{id} unfinished: {sequence:?}");
        assert_eq!(
            sequence.iter().filter(|s| s.is_terminal()).count(),
            1,
            "{id}: {sequence:?}"
        );
        assert!(sequence.last().is_some_and(PipelineStage::is_terminal));
    }

    // Chat answers stream before they complete
    let chat = &stages[&ids[3]];
    let partials: Vec<_> = chat
        .iter()
        .filter_map(|s| match s {
            PipelineStage::Partial(fragment) => Some(fragment.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(partials.concat(), "[Chat] hi there");

    assert_eq!(presenter.state().dashboard.len(), 3);
}

#[tokio::test]
async fn test_dummy_backends_are_idempotent() {
    let (pipeline, mut presenter) = start(&config(), dummy_backends());

    let mut results = Vec::new();
    for _ in 0..2 {
        let text_id = pipeline
            .dispatcher
            .submit(RequestKind::TypedTranslate, Payload::text("same input"))
            .unwrap();
        let image_id = pipeline
            .dispatcher
            .submit(RequestKind::RegionOcrTranslate, Payload::Image(pattern_image(8, 2)))
            .unwrap();

        let (stages, _updates) = drive(&pipeline, &mut presenter, &[text_id, image_id]).await;
        results.push((
            stages[&text_id].last().cloned(),
            stages[&image_id].last().cloned(),
        ));
    }

    assert_eq!(results[0], results[1]);
    assert!(matches!(
        &results[0].1,
        Some(PipelineStage::Translated { text, .. }) if text == "[T][OCR 8x2]"
    ));
}

#[tokio::test]
async fn test_shutdown_cancels_and_stops_workers() {
    let backends = Backends::new(
        Arc::new(DummyRecognizer),
        Arc::new(DummyTranslator::new(Duration::from_millis(200))),
    );
    let pipeline = build_pipeline(&config(), backends);
    pipeline
        .dispatcher
        .submit(RequestKind::TypedTranslate, Payload::text("slow"))
        .unwrap();

    let dispatcher = pipeline.dispatcher.clone();
    timeout(WAIT, pipeline.shutdown()).await.unwrap();

    assert!(dispatcher.is_closed());
    assert_eq!(dispatcher.active(RequestKind::TypedTranslate), None);
    assert!(dispatcher
        .submit(RequestKind::TypedTranslate, Payload::text("late"))
        .is_err());
}
