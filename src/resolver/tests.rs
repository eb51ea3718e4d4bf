use super::*;
use crate::model::Step;
use crate::repository::MemoryRepository;

fn definition(name: &str, steps: &[&str]) -> MacroDefinition {
    MacroDefinition::new(name, steps.iter().map(|s| Step::new(*s)).collect(), None)
}

async fn resolver_with(macros: &[(&str, &[&str])]) -> Resolver {
    let repo = Arc::new(MemoryRepository::new());
    for (name, steps) in macros {
        repo.insert(definition(name, steps)).await.unwrap();
    }
    Resolver::new(repo)
}

fn expect_run(action: ResolvedAction) -> ResolvedRun {
    match action {
        ResolvedAction::Run(run) => run,
        other => panic!("expected a run, got {other:?}"),
    }
}

#[tokio::test]
async fn test_exact_name_runs_stored_steps_unchanged() {
    let steps: &[&str] = &["echo {not a placeholder}", "ls  -la   /tmp"];
    let resolver = resolver_with(&[("list tmp", steps)]).await;

    let run = expect_run(resolver.resolve("  LIST   tmp ").await.unwrap());
    assert_eq!(run.name, "list tmp");
    assert_eq!(run.steps, steps);
    assert!(run.binding.is_empty());
}

#[tokio::test]
async fn test_two_placeholder_template_binds_and_substitutes() {
    let resolver = resolver_with(&[(
        "{a} and {b}",
        &["echo {a}", "echo {b} {a}", "echo plain"],
    )])
    .await;

    let run = expect_run(resolver.resolve("x and y").await.unwrap());
    assert_eq!(run.binding.get("a"), Some("x"));
    assert_eq!(run.binding.get("b"), Some("y"));
    assert_eq!(run.steps, vec!["echo x", "echo y x", "echo plain"]);
}

#[tokio::test]
async fn test_final_slot_takes_the_rest() {
    let resolver = resolver_with(&[("commit {message}", &["git commit -m \"{message}\""])]).await;

    let run = expect_run(resolver.resolve("commit fix the  build").await.unwrap());
    assert_eq!(run.steps, vec!["git commit -m \"fix the  build\""]);
}

#[tokio::test]
async fn test_first_template_in_repository_order_wins() {
    let resolver = resolver_with(&[
        ("kill port {port}", &["fuser -k {port}/tcp"]),
        ("kill {what}", &["pkill {what}"]),
    ])
    .await;

    let run = expect_run(resolver.resolve("kill port 8080").await.unwrap());
    assert_eq!(run.name, "kill port {port}");
    assert_eq!(run.steps, vec!["fuser -k 8080/tcp"]);
}

#[tokio::test]
async fn test_reject_ambiguous_policy() {
    let resolver = resolver_with(&[
        ("kill port {port}", &["fuser -k {port}/tcp"]),
        ("kill {what}", &["pkill {what}"]),
    ])
    .await
    .with_match_policy(MatchPolicy::RejectAmbiguous);

    let err = resolver.resolve("kill port 8080").await.unwrap_err();
    match err {
        MacroError::AmbiguousMatch { candidates, .. } => {
            assert_eq!(candidates, vec!["kill port {port}", "kill {what}"]);
        }
        other => panic!("unexpected error {other}"),
    }

    // A single match is still fine under this policy.
    let run = expect_run(resolver.resolve("kill node").await.unwrap());
    assert_eq!(run.steps, vec!["pkill node"]);
}

#[tokio::test]
async fn test_literals_are_case_sensitive_in_templates() {
    let resolver = resolver_with(&[("greet {name}", &["echo Hi {name}"])]).await;
    assert!(matches!(
        resolver.resolve("GREET bob").await.unwrap(),
        ResolvedAction::Suggest { .. } | ResolvedAction::Unrecognized
    ));
}

#[tokio::test]
async fn test_fuzzy_suggestion() {
    let resolver = resolver_with(&[("hello world", &["echo hello"])]).await;

    match resolver.resolve("helo wrld").await.unwrap() {
        ResolvedAction::Suggest { candidate, score } => {
            assert_eq!(candidate, "hello world");
            assert!(score > 0.75);
        }
        other => panic!("expected a suggestion, got {other:?}"),
    }

    assert_eq!(
        resolver.resolve("xyz completely unrelated").await.unwrap(),
        ResolvedAction::Unrecognized
    );
}

#[tokio::test]
async fn test_threshold_is_configurable() {
    let resolver = resolver_with(&[("hello world", &["echo hello"])])
        .await
        .with_fuzzy_threshold(0.95);
    assert_eq!(
        resolver.resolve("helo wrld").await.unwrap(),
        ResolvedAction::Unrecognized
    );
}

#[tokio::test]
async fn test_definition_takes_precedence() {
    let resolver = resolver_with(&[]).await;
    match resolver
        .resolve(r#"remember: "greet {name}" -> echo Hi {name}"#)
        .await
        .unwrap()
    {
        ResolvedAction::Define(def) => {
            assert_eq!(def.name, "greet {name}");
            assert_eq!(def.step_texts(), vec!["echo Hi {name}"]);
        }
        other => panic!("expected a definition, got {other:?}"),
    }

    let err = resolver
        .resolve(r#"remember: "greet" -> echo Hi {missing}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, MacroError::MalformedDefinition(_)));
}

#[tokio::test]
async fn test_management_precedes_macro_names() {
    let resolver = resolver_with(&[("macros list", &["echo shadowed"])]).await;
    assert_eq!(
        resolver.resolve("macros list").await.unwrap(),
        ResolvedAction::Manage(ManagementOp::List)
    );
    assert_eq!(
        resolver.resolve("macros delete build").await.unwrap(),
        ResolvedAction::Manage(ManagementOp::Delete("build".to_string()))
    );
}

#[tokio::test]
async fn test_empty_input_and_empty_repository() {
    let resolver = resolver_with(&[]).await;
    assert_eq!(resolver.resolve("   ").await.unwrap(), ResolvedAction::Unrecognized);
    assert_eq!(
        resolver.resolve("anything").await.unwrap(),
        ResolvedAction::Unrecognized
    );
}

#[tokio::test]
async fn test_templated_exact_name_is_not_run_verbatim() {
    let resolver = resolver_with(&[("greet {name}", &["echo Hi {name}"])]).await;

    // Typing the template itself binds the literal text; it never skips substitution.
    let run = expect_run(resolver.resolve("greet {name}").await.unwrap());
    assert_eq!(run.binding.get("name"), Some("{name}"));

    let run = expect_run(resolver.resolve("greet Ada Lovelace").await.unwrap());
    assert_eq!(run.steps, vec!["echo Hi Ada Lovelace"]);
}

#[tokio::test]
async fn test_define_then_find_exact_round_trip() {
    let resolver = resolver_with(&[]).await;
    let ResolvedAction::Define(def) = resolver
        .resolve(r#"remember "ship it": cargo test ; cargo publish"#)
        .await
        .unwrap()
    else {
        panic!("expected a definition");
    };
    resolver.repository().insert(def.clone()).await.unwrap();

    let stored = resolver
        .repository()
        .find_exact("ship it")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, def.name);
    assert_eq!(stored.steps, def.steps);
}
