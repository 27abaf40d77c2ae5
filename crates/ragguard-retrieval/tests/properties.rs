mod common;

use common::scripted_corpus;
use proptest::prelude::*;
use ragguard_core::config::RetrievalSettings;
use ragguard_core::{Department, Role};

const DEPARTMENTS: [&str; 5] = ["finance", "marketing", "hr", "engineering", "general"];
const ROLES: [&str; 7] = ["finance", "marketing", "hr", "engineering", "employee", "c-level", "visitor"];

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().expect("runtime")
}

/// Corpus of `doc-i` documents tagged from `departments`, ranked by the index
/// in identifier order with strictly decreasing scores.
fn run(departments: &[usize], role: &str, top_k: usize) -> (Vec<(String, Department, f32)>, usize) {
    let ids: Vec<String> = (0..departments.len()).map(|i| format!("doc-{i}")).collect();
    let docs: Vec<(&str, &str)> =
        ids.iter().zip(departments).map(|(id, d)| (id.as_str(), DEPARTMENTS[*d])).collect();
    let (corpus, index) = scripted_corpus(&docs);
    let ranking: Vec<(&str, f32)> =
        ids.iter().enumerate().map(|(i, id)| (id.as_str(), 1.0 - i as f32 / 1000.0)).collect();
    index.script(&ranking);

    let settings = RetrievalSettings::default();
    let window = settings.over_fetch(top_k);
    let retriever = corpus.retriever(settings);
    let result = runtime().block_on(retriever.retrieve("query", &Role::new(role), top_k)).expect("retrieve");

    let role = Role::new(role);
    let visible_in_window = docs
        .iter()
        .take(window)
        .filter(|(id, _)| corpus.policy().is_visible(&role, &corpus.registry().lookup(id).expect("registered")))
        .count();
    let items = result.items.into_iter().map(|d| (d.id.to_string(), d.department, d.score)).collect();
    (items, visible_in_window)
}

proptest! {
    #[test]
    fn property_results_never_include_hidden_documents(
        departments in prop::collection::vec(0usize..5, 0..24),
        role in 0usize..ROLES.len(),
        top_k in 1usize..8,
    ) {
        let role_name = ROLES[role];
        let (items, _) = run(&departments, role_name, top_k);
        for (_, department, _) in &items {
            let visible = role_name == "c-level"
                || department.as_str() == role_name
                || (department.as_str() == "general" && role_name != "visitor");
            prop_assert!(visible, "{} saw a {} document", role_name, department);
        }
    }

    #[test]
    fn property_results_are_truncated_and_filled(
        departments in prop::collection::vec(0usize..5, 0..24),
        role in 0usize..ROLES.len(),
        top_k in 1usize..8,
    ) {
        let (items, visible_in_window) = run(&departments, ROLES[role], top_k);
        prop_assert!(items.len() <= top_k);
        prop_assert_eq!(items.len(), visible_in_window.min(top_k));
    }

    #[test]
    fn property_primary_department_comes_first(
        departments in prop::collection::vec(0usize..5, 0..24),
        role in 0usize..4,
        top_k in 1usize..8,
    ) {
        let role_name = ROLES[role];
        let (items, _) = run(&departments, role_name, top_k);
        let first_other = items.iter().position(|(_, d, _)| d.as_str() != role_name).unwrap_or(items.len());
        prop_assert!(items[first_other..].iter().all(|(_, d, _)| d.as_str() != role_name));
        for part in [&items[..first_other], &items[first_other..]] {
            for pair in part.windows(2) {
                prop_assert!(pair[0].2 > pair[1].2, "similarity order kept inside a partition");
            }
        }
    }

    #[test]
    fn property_roles_without_primary_department_keep_similarity_order(
        departments in prop::collection::vec(0usize..5, 0..24),
        role in 4usize..ROLES.len(),
        top_k in 1usize..8,
    ) {
        let (items, _) = run(&departments, ROLES[role], top_k);
        for pair in items.windows(2) {
            prop_assert!(pair[0].2 > pair[1].2);
        }
    }
}
