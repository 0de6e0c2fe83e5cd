use proptest::prelude::*;

use runwatch::watch::IgnoreMatcher;

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}"
}

fn rel_path() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(segment(), 1..5)
}

fn with_rules(rules: &str) -> IgnoreMatcher {
    IgnoreMatcher::parse("/root", rules).expect("rules compile")
}

proptest! {
    #[test]
    fn empty_rules_never_match(parts in rel_path(), absolute in any::<bool>()) {
        let m = IgnoreMatcher::empty("/root");
        let rel = parts.join("/");
        let path = if absolute { format!("/root/{rel}") } else { rel };
        prop_assert!(!m.matches(&path));
    }

    #[test]
    fn everything_under_an_ignored_directory_is_ignored(dir in segment(), rest in rel_path()) {
        let m = with_rules(&format!("{dir}/\n"));
        let path = format!("{dir}/{}", rest.join("/"));
        prop_assert!(m.matches(&path));
    }

    #[test]
    fn extension_rule_matches_at_every_depth(parts in rel_path()) {
        let m = with_rules("*.tmp\n");
        let tmp = format!("{}.tmp", parts.join("/"));
        let src = format!("{}.go", parts.join("/"));
        prop_assert!(m.matches(&tmp));
        prop_assert!(!m.matches(&src));
    }

    #[test]
    fn paths_outside_root_never_match(parts in rel_path()) {
        let m = with_rules("*\n");
        let path = format!("/elsewhere/{}", parts.join("/"));
        prop_assert!(!m.matches(&path));
    }
}
