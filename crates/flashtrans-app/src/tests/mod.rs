use std::collections::{HashMap, HashSet};
use std::time::Duration;

use flashtrans_core::Pipeline;
use flashtrans_types::{CapturedImage, PipelineEvent, PipelineStage, RequestId};
use flashtrans_ui::{Presenter, UiUpdate};
use tokio::time::timeout;

mod pipeline_scenarios;

const WAIT: Duration = Duration::from_secs(5);

/// Feed pipeline events to the presenter until every id in `ids` is terminal
///
/// Returns the stages seen per request and every update the presenter produced.
async fn drive(
    pipeline: &Pipeline,
    presenter: &mut Presenter,
    ids: &[RequestId],
) -> (HashMap<RequestId, Vec<PipelineStage>>, Vec<UiUpdate>) {
    let mut waiting: HashSet<RequestId> = ids.iter().copied().collect();
    let mut stages: HashMap<RequestId, Vec<PipelineStage>> = HashMap::new();
    let mut updates = Vec::new();

    while !waiting.is_empty() {
        let event: PipelineEvent = timeout(WAIT, pipeline.events.recv())
            .await
            .expect("timed out waiting for pipeline event")
            .unwrap();

        if event.stage.is_terminal() {
            waiting.remove(&event.request_id);
        }
        stages
            .entry(event.request_id)
            .or_default()
            .push(event.stage.clone());
        updates.extend(presenter.apply(event));
    }

    (stages, updates)
}

fn pattern_image(width: u32, height: u32) -> CapturedImage {
    let mut pixels = vec![255u8; (width * height * 4) as usize];
    pixels[0] = 0;
    CapturedImage::new(width, height, pixels)
}
