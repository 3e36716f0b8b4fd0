use std::sync::Arc;

use flashtrans_ocr::{OcrError, Recognizer, RgbaImage, normalize_capture};
use flashtrans_translator::{ThinkFilter, TranslateError, Translator, strip_think};
use flashtrans_types::{
    CapturedImage, ChatPrompt, ErrorKind, LanguageCode, Payload, PipelineEvent, PipelineStage,
    TargetLanguage,
};
use kanal::AsyncSender;

use crate::language::resolve_target;
use crate::preprocess::{OcrPreprocessor, Preprocessor, TextPreprocessor, tidy_translation};
use crate::request::Request;

/// Shared, read-only inputs of every worker
pub struct StageContext {
    pub recognizer: Arc<dyn Recognizer>,
    pub translator: Arc<dyn Translator>,
    pub source_language: Option<LanguageCode>,
    pub upscale_below_px: u32,
}

/// Early exit from a request
#[derive(Debug, PartialEq)]
pub(crate) enum Halt {
    Cancelled,
    Failed(ErrorKind, String),
}

impl From<OcrError> for Halt {
    fn from(e: OcrError) -> Self {
        Halt::Failed(e.kind(), e.to_string())
    }
}

impl From<TranslateError> for Halt {
    fn from(e: TranslateError) -> Self {
        Halt::Failed(e.kind(), e.detail())
    }
}

struct Emitter<'a> {
    request: &'a Request,
    events: &'a AsyncSender<PipelineEvent>,
}

impl Emitter<'_> {
    async fn emit(&self, stage: PipelineStage) {
        tracing::debug!(">>> [PIPELINE] {} {}", self.request.id, stage.name());
        let event = PipelineEvent {
            request_id: self.request.id,
            kind: self.request.kind,
            stage,
        };
        if self.events.send(event).await.is_err() {
            tracing::debug!("[PIPELINE] event channel closed, {} dropped", self.request.id);
        }
    }

    fn checkpoint(&self) -> Result<(), Halt> {
        if self.request.is_cancelled() {
            Err(Halt::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Run one request end-to-end; always emits exactly one terminal stage
pub(crate) async fn run_request(
    ctx: &StageContext,
    request: Request,
    events: &AsyncSender<PipelineEvent>,
) {
    let emitter = Emitter {
        request: &request,
        events,
    };

    let terminal = match execute(ctx, &emitter).await {
        Ok(stage) => stage,
        Err(Halt::Cancelled) => {
            tracing::debug!("[PIPELINE] {} cancelled after {:?}", request.id, request.age());
            PipelineStage::Cancelled
        }
        Err(Halt::Failed(kind, message)) => {
            tracing::warn!("[PIPELINE] {} failed ({}): {}", request.id, kind, message);
            PipelineStage::Failed { kind, message }
        }
    };

    emitter.emit(terminal).await;
}

enum Prepared {
    Text(String),
    Image(RgbaImage),
    Chat(ChatPrompt),
}

async fn execute(ctx: &StageContext, emitter: &Emitter<'_>) -> Result<PipelineStage, Halt> {
    let request = emitter.request;
    emitter.checkpoint()?;

    let prepared = capture(ctx, &request.payload).await?;
    emitter.checkpoint()?;

    match prepared {
        Prepared::Text(text) => {
            emitter.emit(PipelineStage::Captured(Payload::Text(text.clone()))).await;
            translate(ctx, emitter, text).await
        }
        Prepared::Image(image) => {
            emitter.emit(PipelineStage::Captured(request.payload.clone())).await;
            emitter.checkpoint()?;

            let (text, confidence) = recognize(ctx, image).await?;
            emitter.checkpoint()?;

            emitter
                .emit(PipelineStage::Recognized {
                    text: text.clone(),
                    confidence,
                })
                .await;
            emitter.checkpoint()?;

            translate(ctx, emitter, text).await
        }
        Prepared::Chat(prompt) => {
            emitter.emit(PipelineStage::Captured(Payload::Chat(prompt.clone()))).await;
            chat(ctx, emitter, prompt).await
        }
    }
}

async fn capture(ctx: &StageContext, payload: &Payload) -> Result<Prepared, Halt> {
    match payload {
        Payload::Text(text) => {
            let text = TextPreprocessor.process(text);
            if text.is_empty() {
                return Err(Halt::Failed(ErrorKind::InvalidInput, "empty text".to_string()));
            }
            Ok(Prepared::Text(text))
        }
        Payload::Image(image) => Ok(Prepared::Image(
            normalize_image(image.clone(), ctx.upscale_below_px).await?,
        )),
        Payload::Chat(prompt) => {
            let mut prompt = prompt.clone();
            prompt.question = TextPreprocessor.process(&prompt.question);
            Ok(Prepared::Chat(prompt))
        }
    }
}

async fn normalize_image(image: CapturedImage, upscale_below_px: u32) -> Result<RgbaImage, Halt> {
    let result =
        tokio::task::spawn_blocking(move || normalize_capture(&image, upscale_below_px)).await;

    match result {
        Ok(Ok(image)) => Ok(image),
        Ok(Err(e)) => Err(Halt::Failed(ErrorKind::InvalidInput, e.to_string())),
        Err(e) => Err(Halt::Failed(
            ErrorKind::InvalidInput,
            format!("capture normalization task failed: {}", e),
        )),
    }
}

async fn recognize(ctx: &StageContext, image: RgbaImage) -> Result<(String, f32), Halt> {
    let recognizer = ctx.recognizer.clone();
    tracing::debug!(
        ">>> [OCR] {} on {}x{}",
        recognizer.name(),
        image.width(),
        image.height()
    );

    let result = tokio::task::spawn_blocking(move || recognizer.recognize(&image)).await;

    let recognition = match result {
        Ok(recognition) => recognition?,
        Err(e) => {
            tracing::error!(">>> [OCR] Task error: {}", e);
            return Err(Halt::Failed(
                ErrorKind::OcrUnavailable,
                format!("recognizer task failed: {}", e),
            ));
        }
    };

    let text = OcrPreprocessor.process(&recognition.text);
    tracing::debug!(">>> [OCR] Got text: {} chars", text.len());
    if text.is_empty() {
        return Err(OcrError::NoTextFound.into());
    }

    Ok((text, recognition.confidence))
}

async fn translate(
    ctx: &StageContext,
    emitter: &Emitter<'_>,
    text: String,
) -> Result<PipelineStage, Halt> {
    emitter.checkpoint()?;

    let target = resolve_target(&emitter.request.target, &text);
    let translation = ctx
        .translator
        .translate(&text, ctx.source_language.clone(), target.clone())
        .await?;
    emitter.checkpoint()?;

    Ok(PipelineStage::Translated {
        text: tidy_translation(&translation.text),
        target,
    })
}

async fn chat(
    ctx: &StageContext,
    emitter: &Emitter<'_>,
    prompt: ChatPrompt,
) -> Result<PipelineStage, Halt> {
    emitter.checkpoint()?;

    let model = ctx.translator.chat().ok_or_else(|| {
        Halt::from(TranslateError::ChatUnsupported(ctx.translator.metadata().name))
    })?;

    let mut stream = model.infer(&prompt).await?;
    let mut answer = String::new();
    let mut think = ThinkFilter::default();

    loop {
        emitter.checkpoint()?;
        // A stopped chat must not wait for the backend's next chunk
        let next = tokio::select! {
            _ = emitter.request.cancel_token().cancelled() => return Err(Halt::Cancelled),
            next = stream.next_fragment() => next,
        };
        let Some(fragment) = next else {
            break;
        };
        let fragment = fragment?;
        emitter.checkpoint()?;

        answer.push_str(&fragment);
        let visible = think.push(&fragment);
        if !visible.is_empty() {
            emitter.emit(PipelineStage::Partial(visible)).await;
        }
    }

    let tail = think.finish();
    if !tail.is_empty() {
        emitter.emit(PipelineStage::Partial(tail)).await;
    }

    let target = match &emitter.request.target {
        TargetLanguage::Fixed(code) => code.clone(),
        TargetLanguage::Auto => "auto".to_string(),
    };

    Ok(PipelineStage::Translated {
        text: strip_think(&answer),
        target,
    })
}
