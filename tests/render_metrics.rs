use std::collections::HashMap;

use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use mdrender::application::render::{ComrakRenderService, RenderRequest, RenderService};

#[test]
fn render_records_latency_and_escaped_tags() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let service = ComrakRenderService::default();

    metrics::with_local_recorder(&recorder, || {
        service
            .render(&RenderRequest::new("<script>a()</script>\n\n<iframe></iframe>"))
            .expect("render succeeds");
        service
            .render(&RenderRequest::new("# clean"))
            .expect("render succeeds");
    });

    let values: HashMap<String, DebugValue> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, value)| (composite_key.key().name().to_string(), value))
        .collect();

    match values.get("mdrender_escaped_tags_total") {
        Some(DebugValue::Counter(count)) => assert_eq!(*count, 2),
        other => panic!("unexpected escaped tag metric: {other:?}"),
    }
    match values.get("mdrender_render_ms") {
        Some(DebugValue::Histogram(samples)) => assert_eq!(samples.len(), 2),
        other => panic!("unexpected latency metric: {other:?}"),
    }
}
