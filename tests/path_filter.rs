// tests/path_filter.rs
mod common;
use crate::common::init_tracing;

use std::path::PathBuf;

use proptest::prelude::*;

use devreload::watch::PathFilter;

#[test]
fn excludes_matching_component_at_any_depth() {
    init_tracing();
    let filter = PathFilter::new("node_modules");

    assert!(filter.is_excluded("node_modules/pkg/index.ts"));
    assert!(filter.is_excluded("scripts/node_modules/x.ts"));
    assert!(filter.is_excluded("/abs/project/scripts/a/b/node_modules/c/d.ts"));
    assert!(filter.is_excluded("scripts/Node_Modules/x.ts"));
    assert!(filter.is_excluded("scripts/NODE_MODULES"));
}

#[test]
fn keeps_siblings_sharing_a_prefix() {
    let filter = PathFilter::new("node_modules");

    assert!(!filter.is_excluded("node_modules2/x.ts"));
    assert!(!filter.is_excluded("scripts/my_node_modules/x.ts"));
    assert!(!filter.is_excluded("scripts/node_modules.ts"));
    assert!(!filter.is_excluded("scripts/app.ts"));
}

#[test]
fn configured_name_is_case_insensitive_too() {
    let filter = PathFilter::new("Vendor");
    assert_eq!(filter.excluded_dir(), "vendor");
    assert!(filter.is_excluded("src/VENDOR/lib.ts"));
}

#[test]
fn rooted_filter_only_inspects_components_below_the_root() {
    let filter = PathFilter::new("node_modules").relative_to("/work/node_modules/app/scripts");

    assert!(!filter.is_excluded("/work/node_modules/app/scripts/main.ts"));
    assert!(!filter.is_excluded("/work/node_modules/app/scripts/lib/util.ts"));
    assert!(filter.is_excluded("/work/node_modules/app/scripts/node_modules/dep/index.ts"));
    // Outside the root the whole path counts.
    assert!(filter.is_excluded("/work/node_modules/other.ts"));
    assert!(filter.is_excluded("lib/node_modules/x.ts"));
}

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}".prop_filter("not the excluded name", |s| s != "node_modules")
}

fn mixed_case(name: &str, mask: Vec<bool>) -> String {
    name.chars()
        .zip(mask.into_iter().chain(std::iter::repeat(false)))
        .map(|(c, upper)| if upper { c.to_ascii_uppercase() } else { c })
        .collect()
}

proptest! {
    #[test]
    fn excluded_wherever_the_component_appears(
        before in proptest::collection::vec(segment(), 0..5),
        after in proptest::collection::vec(segment(), 0..5),
        mask in proptest::collection::vec(any::<bool>(), 12),
    ) {
        let filter = PathFilter::new("node_modules");
        let mut path: PathBuf = before.iter().collect();
        path.push(mixed_case("node_modules", mask));
        for s in &after {
            path.push(s);
        }
        prop_assert!(filter.is_excluded(&path));
    }

    #[test]
    fn never_excluded_without_the_component(
        segments in proptest::collection::vec(segment(), 1..8),
        suffix in "[a-z0-9]{1,3}",
    ) {
        let filter = PathFilter::new("node_modules");
        let mut path: PathBuf = segments.iter().collect();
        // Names that merely start with the excluded name.
        path.push(format!("node_modules{suffix}"));
        prop_assert!(!filter.is_excluded(&path));
    }
}
