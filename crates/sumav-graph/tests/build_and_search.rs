//! End-to-end build/search scenarios over a real in-memory cozo store,
//! exercising the same `sumav_graph::{Builder, Searcher}` surface the CLI
//! binary uses.

use sumav_core::{DetectionId, Md5Hash, Sha256Hash};
use sumav_graph::searcher::RepresentativeTokenOptions;
use sumav_graph::tokenizer::{make_tokens, make_unique_tokens};
use sumav_graph::{Builder, CozoStore, Searcher};

fn detection(id: u64, verdicts: &[&str]) -> sumav_core::Detection {
    let opt_verdicts: Vec<Option<&str>> = verdicts.iter().map(|v| Some(*v)).collect();
    sumav_core::Detection {
        id: DetectionId(id),
        md5: Md5Hash::from_hex(&format!("{id:032x}")).expect("valid md5 hex"),
        sha256: Sha256Hash::from_hex(&format!("{id:064x}")).expect("valid sha256 hex"),
        submission_date: chrono::Utc::now(),
        verdicts: verdicts
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("engine{i}"), Some(v.to_string())))
            .collect(),
        tokens: Some(make_tokens(&opt_verdicts)),
        unique_tokens: Some(make_unique_tokens(&opt_verdicts)),
        ground_truth: None,
        predicted_label: None,
    }
}

#[test]
fn build_from_a_single_detection_links_virlock_and_win32() {
    let store = CozoStore::open_in_memory().expect("open store");
    store
        .put_detection(&detection(
            1,
            &["Win32/Nabucur", "Win32:VirLock", "Win32.Virus.Virlock.a"],
        ))
        .expect("seed detection");

    let builder = Builder::new(&store, &store, 0.8);
    let report = builder.build_graph().expect("build graph");
    assert_eq!(report.detections_scanned, 1);
    assert!(report.nodes_written > 0);

    let nodes = store.load_all_nodes().expect("load nodes");
    let tokens: Vec<&str> = nodes.iter().map(|n| n.token.as_str()).collect();
    assert!(tokens.contains(&"win32"));
    assert!(tokens.contains(&"virlock"));
    assert!(tokens.contains(&"virus"));

    let edge = store
        .get_edge("virlock", "win32")
        .expect("query edge")
        .expect("edge exists");
    assert_eq!(edge.intersection_row_count, 1);
    assert_eq!(edge.p_a_given_b, 1.0);
    assert_eq!(edge.p_b_given_a, 1.0);
}

#[test]
fn representative_token_picks_virlock_for_a_family_of_labels() {
    let store = CozoStore::open_in_memory().expect("open store");

    let corpus: &[&[&str]] = &[
        &["Win32/Nabucur", "Win32:VirLock", "Win32.Virus.Virlock.a"],
        &["Win32.VirLock.1", "Win32/VirLock.gen"],
        &["Win32.Virlock.b", "Trojan.Virlock"],
        &["Packed.Win32.Graybird.B", "W32/S-Eldorado"],
        &["Win32/Ransom.Virlock", "Generic.Ransom"],
    ];
    for (i, verdicts) in corpus.iter().enumerate() {
        store
            .put_detection(&detection(i as u64 + 1, verdicts))
            .expect("seed detection");
    }

    let builder = Builder::new(&store, &store, 0.8);
    builder.build_graph().expect("build graph");

    let searcher = Searcher::load(&store, &store, 0.8).expect("load searcher");
    let opts = RepresentativeTokenOptions {
        weight_param: 4.1,
        general_param: 225.0,
        ..Default::default()
    };
    let labels = vec![
        "Win32/Nabucur".to_string(),
        "Win32:VirLock".to_string(),
        "Win32.Virus.Virlock.a".to_string(),
        "Win32.VirLock.1".to_string(),
    ];
    let ranked = searcher.representative_tokens_top_n(&labels, Some(3), &opts);
    assert!(!ranked.is_empty());
    assert_eq!(ranked[0].token, "virlock");
}

#[test]
fn searcher_load_fails_cleanly_on_an_empty_graph() {
    let store = CozoStore::open_in_memory().expect("open store");
    let err = Searcher::load(&store, &store, 0.8).expect_err("empty graph must error");
    assert!(matches!(err, sumav_graph::GraphError::GraphNotLoaded));
}
