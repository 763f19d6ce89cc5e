use std::path::PathBuf;

use triage_core::{Intent, TriageConfig, build_dispatcher};

fn bundled_config() -> TriageConfig {
    let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../data");
    TriageConfig {
        conditions_path: data.join("conditions.json"),
        intents_path: data.join("intents.json"),
        ..TriageConfig::default()
    }
}

#[tokio::test]
async fn bundled_data_builds_a_working_dispatcher() {
    let dispatcher = build_dispatcher(&bundled_config()).unwrap();

    assert_eq!(dispatcher.index().len(), 18);

    let flu = dispatcher.index().lookup("flu");
    assert_eq!(flu.matched_disease.as_deref(), Some("Flu"));
    assert!(flu.symptoms.contains(&"fever".to_string()));

    let greeting = dispatcher.classify("hello").await.unwrap();
    assert_eq!(greeting.intent, Intent::Greet);
}
