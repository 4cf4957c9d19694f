//! Replay of the bundled document churn scenario

use blockframe_core::scenario::{replay, ReplayReport, Scenario};
use blockframe_core::{EmbedConfig, Phase, Presentation};
use blockframe_protocol::ErrorClass;
use blockframe_test_utils::src;
use pretty_assertions::assert_eq;

const DOCUMENT_CHURN: &str = include_str!("../demos/document-churn.json");

fn phases_of(report: &ReplayReport, mount: &str) -> Vec<(u64, Phase)> {
    report
        .timeline
        .iter()
        .filter(|e| e.mount == mount)
        .map(|e| (e.at, e.phase))
        .collect()
}

#[test]
fn document_churn_replay() {
    let scenario = Scenario::from_json(DOCUMENT_CHURN).unwrap();
    let report = replay(&scenario, EmbedConfig::default()).unwrap();

    assert!(report.rejected.is_empty(), "{:?}", report.rejected);

    // Moving the report reuses its frame: one fetch, ready on mount.
    assert_eq!(phases_of(&report, "report-moved"), vec![(450, Phase::Ready)]);
    assert_eq!(report.stats.total_reused, 1);

    assert_eq!(
        phases_of(&report, "chart"),
        vec![(0, Phase::Loading), (5_000, Phase::Ready)]
    );
    assert_eq!(
        phases_of(&report, "widget"),
        vec![(600, Phase::Loading), (2_000, Phase::Error)]
    );
    let widget_last = report
        .timeline
        .iter()
        .rev()
        .find(|e| e.mount == "widget")
        .unwrap();
    assert_eq!(
        widget_last.presentation,
        Presentation::ErrorPanel { can_fix: true }
    );

    // Report ready, one debounced theme broadcast, chart soft ready.
    assert_eq!(report.theme_pushes, 3);

    // The first report's pending write died with it; the moved one landed.
    let writes: Vec<_> = report
        .height_writes
        .iter()
        .map(|w| (w.src.clone(), w.height))
        .collect();
    assert_eq!(writes, vec![(src("report-a"), 260.0)]);

    assert_eq!(report.fix_requests.len(), 1);
    let request = &report.fix_requests[0];
    assert_eq!(request.src, src("flaky-widget"));
    assert_eq!(request.classification, ErrorClass::RenderError);
    assert_eq!(request.line, Some(8));
}

#[test]
fn report_renders_as_text() {
    let scenario = Scenario::from_json(DOCUMENT_CHURN).unwrap();
    let text = replay(&scenario, EmbedConfig::default()).unwrap().to_string();

    assert!(text.starts_with("timeline:"));
    assert!(text.contains("theme pushes: 3"));
    assert!(text.ends_with("fix requests: 1"));
}
