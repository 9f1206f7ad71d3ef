//! Property tests: random sequences of tagging, navigation, moves and deletes
//! keep every phase's sets and counters in agreement with the items' tags.

use curate_core::config::WorkflowConfig;
use curate_core::phase::PhaseSpec;
use curate_core::{ItemId, OrganizeError, Organizer, PhaseId, SignedTag};
use proptest::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TAGS: [&str; 2] = ["cleaned", "named"];
const CATEGORIES: [&str; 2] = [".", "letters"];
const NAMES: [&str; 3] = ["alpha", "beta", "scan-00"];

#[derive(Debug, Clone)]
enum Op {
    Tag { item: usize, add: bool, tag: usize },
    Next(usize),
    Prev(usize),
    NextWork(usize),
    PrevWork(usize),
    Delete(usize),
    Categorize { item: usize, category: usize },
    Rename { item: usize, name: usize },
}

fn arb_op(items: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..items, any::<bool>(), 0..TAGS.len())
            .prop_map(|(item, add, tag)| Op::Tag { item, add, tag }),
        1 => (0..2usize).prop_map(Op::Next),
        1 => (0..2usize).prop_map(Op::Prev),
        1 => (0..2usize).prop_map(Op::NextWork),
        1 => (0..2usize).prop_map(Op::PrevWork),
        1 => (0..items).prop_map(Op::Delete),
        1 => (0..items, 0..CATEGORIES.len())
            .prop_map(|(item, category)| Op::Categorize { item, category }),
        1 => (0..items, 0..NAMES.len()).prop_map(|(item, name)| Op::Rename { item, name }),
    ]
}

fn two_phase_config() -> WorkflowConfig {
    let phase = |name: &str, raw: &[&str]| PhaseSpec {
        name: name.into(),
        tags: raw.iter().map(|t| t.parse().expect("valid tag")).collect(),
        extras: vec![],
        actions: vec![],
    };
    WorkflowConfig {
        phases: vec![
            phase("Clean", &["-cleaned"]),
            phase("Name", &["+cleaned", "-named"]),
        ],
        ..WorkflowConfig::default()
    }
}

fn load(count: usize) -> (TempDir, Organizer, Vec<ItemId>) {
    let dir = TempDir::new().expect("tempdir");
    fs::create_dir(dir.path().join("letters")).expect("mkdir");
    for n in 0..count {
        fs::write(dir.path().join(format!("scan-{n:02}.png")), b"img").expect("write image");
    }
    let org = Organizer::open(dir.path(), &two_phase_config()).expect("open");
    let ids = (0..count)
        .map(|n| {
            org.item_by_path(Path::new(&format!("scan-{n:02}.png")))
                .expect("item loaded")
        })
        .collect();
    (dir, org, ids)
}

fn phase_ids(org: &Organizer) -> Vec<PhaseId> {
    org.phases().map(|p| p.id()).collect()
}

/// `loaded` counts every image seen at open; deleted ones stay observed as
/// finished.
fn check_invariants(org: &Organizer, loaded: usize) -> Result<(), TestCaseError> {
    org.assert_consistent();
    for phase in org.phases() {
        let progress = phase.progress();
        prop_assert_eq!(progress.todo, phase.work().count());
        prop_assert_eq!(progress.observed(), loaded);
        for id in phase.work() {
            prop_assert!(phase.in_full(id));
        }
        for id in phase.full() {
            prop_assert!(org.item(id).is_ok(), "{} still references deleted {}", phase.name(), id);
        }
        if let Some(cursor) = phase.cursor() {
            prop_assert!(phase.in_full(cursor));
        }
        for item in org.items() {
            prop_assert_eq!(
                phase.in_work(item.id()),
                item.matches(phase.predicates()),
                "work membership disagrees with tags for {}",
                item.id()
            );
        }
    }
    Ok(())
}

/// Moves may collide with another image; anything else is a failure.
fn allow_clobbering(result: curate_core::error::Result<()>) -> Result<(), TestCaseError> {
    match result {
        Ok(()) | Err(OrganizeError::Clobbering { .. }) => Ok(()),
        Err(e) => Err(TestCaseError::fail(format!("unexpected error: {e}"))),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sets_and_counters_track_tags(
        count in 1usize..6,
        ops in prop::collection::vec(arb_op(6), 0..40),
    ) {
        let (_dir, mut org, ids) = load(count);
        let phases = phase_ids(&org);
        check_invariants(&org, count)?;

        for op in ops {
            let id = |item: usize| ids[item % count];
            match op {
                Op::Tag { item, .. }
                | Op::Delete(item)
                | Op::Categorize { item, .. }
                | Op::Rename { item, .. } if org.item(id(item)).is_err() => {}
                Op::Tag { item, add, tag } => {
                    let id = id(item);
                    let signed = if add {
                        SignedTag::add(TAGS[tag])
                    } else {
                        SignedTag::remove(TAGS[tag])
                    };
                    org.tag(id, &signed).expect("tag");
                }
                Op::Next(p) => { org.next(phases[p]).expect("next"); }
                Op::Prev(p) => { org.prev(phases[p]).expect("prev"); }
                Op::NextWork(p) => { org.next_work(phases[p]).expect("next_work"); }
                Op::PrevWork(p) => { org.prev_work(phases[p]).expect("prev_work"); }
                Op::Delete(item) => org.delete(id(item)).expect("delete"),
                Op::Categorize { item, category } => {
                    allow_clobbering(org.save_category(id(item), Some(CATEGORIES[category])))?;
                }
                Op::Rename { item, name } => {
                    allow_clobbering(org.save_name(id(item), Some(NAMES[name])))?;
                }
            }
            check_invariants(&org, count)?;
        }
    }

    #[test]
    fn next_then_prev_returns_to_start(
        count in 1usize..6,
        steps in 0usize..8,
    ) {
        let (_dir, mut org, _ids) = load(count);
        let clean = phase_ids(&org)[0];
        for _ in 0..steps {
            org.next(clean).expect("next");
        }
        let start = org.phase(clean).expect("phase").cursor();
        prop_assert!(start.is_some());

        org.next(clean).expect("next");
        org.prev(clean).expect("prev");
        prop_assert_eq!(org.phase(clean).expect("phase").cursor(), start);

        // A full lap wraps back to the same image.
        for _ in 0..count {
            org.next(clean).expect("next");
        }
        prop_assert_eq!(org.phase(clean).expect("phase").cursor(), start);
    }
}
