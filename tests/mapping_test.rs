mod helpers;

use capmap::error::MappingError;
use capmap::mapping::types::{CodeArtifact, EnrichedNode, NodeType, Taxonomy};
use capmap::mapping::{CapabilityMapper, MappingOptions, DEFAULT_GENERATOR};
use helpers::{response_json, FailingCompletions, RecordingEmbedder, ScriptedCompletions};

fn mapper(names: &[&str]) -> CapabilityMapper {
    CapabilityMapper::new(&Taxonomy::from_names(names), MappingOptions::default()).unwrap()
}

#[tokio::test]
async fn auth_billing_scenario() {
    let mapper = mapper(&["auth", "billing"]);
    let artifacts = vec![CodeArtifact::new("src/login.rs", "fn login() {}")];
    let completions = ScriptedCompletions::new(vec![response_json(&[
        ("Auth", "handles login"),
        ("logging", "writes logs"),
    ])]);
    let embedder = RecordingEmbedder::new(8);

    let outcome = mapper.run(&artifacts, &completions, &embedder).await.unwrap();

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].artifact_id, "src/login.rs");
    assert_eq!(outcome.matches[0].capability, "Auth");
    assert_eq!(outcome.matches[0].description, "handles login");
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].reported.capability, "logging");

    assert_eq!(outcome.nodes.len(), 2);
    assert_eq!(outcome.nodes[0].node_type(), NodeType::Capability);
    assert_eq!(outcome.nodes[1].node_type(), NodeType::CapabilitySummary);
    for node in &outcome.nodes {
        assert_eq!(node.display_name(), "Auth");
        assert_eq!(node.related_to_id(), &["src/login.rs".to_string()]);
        assert_eq!(node.provenance().generator, DEFAULT_GENERATOR);
    }

    match &outcome.nodes[1] {
        EnrichedNode::CapabilitySummary(summary) => {
            assert_eq!(summary.summary, "handles login");
            assert_eq!(summary.summary_vector, embedder.vector_for("handles login"));
        }
        other => panic!("expected summary node, got {other:?}"),
    }
}

#[tokio::test]
async fn one_prompt_per_artifact_in_one_batch() {
    let mapper = mapper(&["auth"]);
    let artifacts: Vec<CodeArtifact> = (0..5)
        .map(|i| CodeArtifact::new(format!("a{i}"), format!("fn f{i}() {{}}")))
        .collect();
    let completions = ScriptedCompletions::new(vec![response_json(&[]); 5]);
    let embedder = RecordingEmbedder::new(4);

    mapper.run(&artifacts, &completions, &embedder).await.unwrap();

    let batches = completions.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 5);
    for (i, prompt) in batches[0].iter().enumerate() {
        assert!(prompt.user.contains(&format!("fn f{i}()")));
    }
}

#[tokio::test]
async fn zero_valid_matches_never_calls_embedder() {
    let mapper = mapper(&["auth"]);
    let artifacts = vec![CodeArtifact::new("a1", ""), CodeArtifact::new("a2", "")];
    let completions = ScriptedCompletions::new(vec![
        response_json(&[]),
        response_json(&[("payments", "not in the taxonomy")]),
    ]);
    let embedder = RecordingEmbedder::new(4);

    let outcome = mapper.run(&artifacts, &completions, &embedder).await.unwrap();

    assert!(outcome.nodes.is_empty());
    assert!(outcome.matches.is_empty());
    assert_eq!(outcome.rejected.len(), 1);
    assert!(embedder.call_sizes().is_empty());
}

#[tokio::test]
async fn many_matches_embed_in_balanced_ordered_chunks() {
    let mapper = mapper(&["auth"]);
    let descriptions: Vec<String> = (0..250).map(|i| format!("description {i}")).collect();
    let pairs: Vec<(&str, &str)> = descriptions.iter().map(|d| ("auth", d.as_str())).collect();
    let artifacts = vec![CodeArtifact::new("a1", "")];
    let completions = ScriptedCompletions::new(vec![response_json(&pairs)]);
    let embedder = RecordingEmbedder::new(16);

    let outcome = mapper.run(&artifacts, &completions, &embedder).await.unwrap();

    assert_eq!(embedder.call_sizes(), vec![84, 83, 83]);
    let sent: Vec<String> = embedder.calls.lock().unwrap().concat();
    assert_eq!(sent, descriptions);

    assert_eq!(outcome.nodes.len(), 500);
    let summaries: Vec<_> = outcome
        .nodes
        .iter()
        .filter_map(|n| match n {
            EnrichedNode::CapabilitySummary(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(summaries.len(), 250);
    for (summary, description) in summaries.iter().zip(&descriptions) {
        assert_eq!(&summary.summary, description);
        assert_eq!(summary.summary_vector, embedder.vector_for(description));
    }
}

#[tokio::test]
async fn case_insensitive_match_keeps_reported_name() {
    let mapper = mapper(&["data validation"]);
    let artifacts = vec![CodeArtifact::new("a1", "")];
    let completions =
        ScriptedCompletions::new(vec![response_json(&[("Data Validation", "checks inputs")])]);
    let embedder = RecordingEmbedder::new(4);

    let outcome = mapper.run(&artifacts, &completions, &embedder).await.unwrap();

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.nodes[0].id(), "Data Validation");
}

#[tokio::test]
async fn malformed_response_fails_the_run() {
    let mapper = mapper(&["auth"]);
    let artifacts = vec![CodeArtifact::new("a1", ""), CodeArtifact::new("a2", "")];
    let completions = ScriptedCompletions::new(vec![
        response_json(&[("auth", "fine")]),
        "Sorry, I cannot help with that.".to_string(),
    ]);
    let embedder = RecordingEmbedder::new(4);

    let err = mapper
        .run(&artifacts, &completions, &embedder)
        .await
        .unwrap_err();

    match err {
        MappingError::MalformedResponse { artifact_id, .. } => assert_eq!(artifact_id, "a2"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(embedder.call_sizes().is_empty());
}

#[tokio::test]
async fn transport_error_propagates() {
    let mapper = mapper(&["auth"]);
    let artifacts = vec![CodeArtifact::new("a1", "")];
    let embedder = RecordingEmbedder::new(4);

    let err = mapper
        .run(&artifacts, &FailingCompletions, &embedder)
        .await
        .unwrap_err();

    assert!(matches!(err, MappingError::Transport(_)));
    assert!(err.to_string().contains("connection reset by peer"));
}

#[tokio::test]
async fn generator_is_stamped_on_every_node() {
    let options = MappingOptions {
        language: "English".into(),
        generator: Some("weekly-refresh".into()),
    };
    let mapper = CapabilityMapper::new(&Taxonomy::from_names(&["auth", "billing"]), options).unwrap();
    let artifacts = vec![CodeArtifact::new("a1", "")];
    let completions = ScriptedCompletions::new(vec![response_json(&[
        ("auth", "x"),
        ("billing", "y"),
    ])]);
    let embedder = RecordingEmbedder::new(4);

    let outcome = mapper.run(&artifacts, &completions, &embedder).await.unwrap();

    assert_eq!(outcome.nodes.len(), 4);
    for node in &outcome.nodes {
        assert_eq!(node.provenance().generator, "weekly-refresh");
        assert_eq!(node.provenance().latest_update_generator, "weekly-refresh");
    }
}
