//! Phases: a tag predicate plus the bookkeeping derived from it.
//!
//! Each phase keeps two id-ordered sets. The *full* set holds every item that
//! has matched the predicate while the phase was watching (items that later
//! leave stay there so they can still be browsed). The *work* set is the subset
//! that still matches and needs action. The counters partition every observed
//! item into todo, finished, or skipped.

use crate::item::ItemId;
use crate::tag::SignedTag;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Bound::{Excluded, Unbounded};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PhaseId(pub(crate) usize);

impl PhaseId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Optional panels a collaborator shows next to the image for a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extra {
    CategoryPicker,
    MetadataDisplay,
    Rename,
    ShowCategory,
    Transcribe,
}

/// One step of a phase action (a button).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Tag(SignedTag),
    SaveCategory,
    SaveName,
    SaveTranscription,
    Next,
    Prev,
    NextWork,
    PrevWork,
    RotateLeft,
    RotateRight,
    Crop,
}

impl Step {
    /// Steps that run an external program and are left to the collaborator.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::RotateLeft | Self::RotateRight | Self::Crop)
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with(['+', '-']) {
            return s.parse().map(Self::Tag).map_err(|e| e.to_string());
        }
        match s {
            "save_category" => Ok(Self::SaveCategory),
            "save_name" => Ok(Self::SaveName),
            "save_transcription" => Ok(Self::SaveTranscription),
            "next" => Ok(Self::Next),
            "prev" => Ok(Self::Prev),
            "next_work" => Ok(Self::NextWork),
            "prev_work" => Ok(Self::PrevWork),
            "rotate_left" => Ok(Self::RotateLeft),
            "rotate_right" => Ok(Self::RotateRight),
            "crop" => Ok(Self::Crop),
            other => Err(format!("unknown action step '{other}'")),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => write!(f, "{tag}"),
            Self::SaveCategory => f.write_str("save_category"),
            Self::SaveName => f.write_str("save_name"),
            Self::SaveTranscription => f.write_str("save_transcription"),
            Self::Next => f.write_str("next"),
            Self::Prev => f.write_str("prev"),
            Self::NextWork => f.write_str("next_work"),
            Self::PrevWork => f.write_str("prev_work"),
            Self::RotateLeft => f.write_str("rotate_left"),
            Self::RotateRight => f.write_str("rotate_right"),
            Self::Crop => f.write_str("crop"),
        }
    }
}

impl Serialize for Step {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A labelled sequence of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub label: String,
    pub steps: Vec<Step>,
}

impl Action {
    #[must_use]
    pub fn new(label: &str, steps: Vec<Step>) -> Self {
        Self {
            label: label.to_string(),
            steps,
        }
    }
}

/// Static declaration of a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub name: String,
    pub tags: Vec<SignedTag>,
    #[serde(default)]
    pub extras: Vec<Extra>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl PhaseSpec {
    #[must_use]
    pub fn action(&self, label: &str) -> Option<&Action> {
        self.actions
            .iter()
            .find(|a| a.label.eq_ignore_ascii_case(label.trim()))
    }
}

/// Running counters for a phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub todo: usize,
    pub finished: usize,
    pub skipped: usize,
}

impl Progress {
    /// Share of matched items that are finished, as a whole percentage.
    #[must_use]
    pub const fn percent_done(&self) -> usize {
        let matched = self.todo + self.finished;
        if matched == 0 {
            100
        } else {
            self.finished * 100 / matched
        }
    }

    #[must_use]
    pub const fn observed(&self) -> usize {
        self.todo + self.finished + self.skipped
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}% done | {} complete | {} incomplete | {} skipped",
            self.percent_done(),
            self.finished,
            self.todo,
            self.skipped
        )
    }
}

fn decrement(counter: &mut usize, what: &str, phase: &str) {
    assert!(*counter > 0, "phase '{phase}': {what} counter would go negative");
    *counter -= 1;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Step from `from` to the adjacent member of `set`, wrapping around.
///
/// `from` does not have to be a member: the nearest member by id in the
/// requested direction is used, falling back to the minimum (or maximum).
fn step(set: &BTreeSet<ItemId>, from: Option<ItemId>, direction: Direction) -> Option<ItemId> {
    match (from, direction) {
        (None, Direction::Forward) => set.first().copied(),
        (None, Direction::Backward) => set.last().copied(),
        (Some(from), Direction::Forward) => set
            .range((Excluded(from), Unbounded))
            .next()
            .or_else(|| set.first())
            .copied(),
        (Some(from), Direction::Backward) => set
            .range(..from)
            .next_back()
            .or_else(|| set.last())
            .copied(),
    }
}

/// Result of an item leaving or being removed from a phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Departure {
    /// The cursor moved off the departing item.
    pub cursor_moved: bool,
    /// The work set became empty.
    pub emptied: bool,
}

/// Snapshot of a phase for collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseInfo {
    pub id: PhaseId,
    pub name: String,
    pub predicates: Vec<SignedTag>,
    pub cursor: Option<ItemId>,
    pub full: Vec<ItemId>,
    pub work: Vec<ItemId>,
    pub progress: Progress,
    pub complete: bool,
}

#[derive(Debug, Clone)]
pub struct Phase {
    id: PhaseId,
    spec: PhaseSpec,
    full: BTreeSet<ItemId>,
    work: BTreeSet<ItemId>,
    cursor: Option<ItemId>,
    progress: Progress,
    complete: bool,
}

impl Phase {
    pub(crate) fn new(id: PhaseId, spec: PhaseSpec) -> Self {
        Self {
            id,
            spec,
            full: BTreeSet::new(),
            work: BTreeSet::new(),
            cursor: None,
            progress: Progress {
                todo: 0,
                finished: 0,
                skipped: 0,
            },
            complete: false,
        }
    }

    #[must_use]
    pub const fn id(&self) -> PhaseId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    #[must_use]
    pub const fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    #[must_use]
    pub fn predicates(&self) -> &[SignedTag] {
        &self.spec.tags
    }

    #[must_use]
    pub const fn cursor(&self) -> Option<ItemId> {
        self.cursor
    }

    #[must_use]
    pub const fn progress(&self) -> Progress {
        self.progress
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    #[must_use]
    pub fn has_work(&self) -> bool {
        !self.work.is_empty()
    }

    #[must_use]
    pub fn in_full(&self, id: ItemId) -> bool {
        self.full.contains(&id)
    }

    #[must_use]
    pub fn in_work(&self, id: ItemId) -> bool {
        self.work.contains(&id)
    }

    pub fn full(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.full.iter().copied()
    }

    pub fn work(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.work.iter().copied()
    }

    #[must_use]
    pub fn info(&self) -> PhaseInfo {
        PhaseInfo {
            id: self.id,
            name: self.spec.name.clone(),
            predicates: self.spec.tags.clone(),
            cursor: self.cursor,
            full: self.full().collect(),
            work: self.work().collect(),
            progress: self.progress,
            complete: self.complete,
        }
    }

    pub(crate) fn mark_complete(&mut self) {
        self.complete = true;
    }

    /// Count a newly loaded item. Returns true if it became the cursor.
    pub(crate) fn observe(&mut self, id: ItemId, matched: bool) -> bool {
        if !matched {
            self.progress.skipped += 1;
            return false;
        }
        let first_work = self.work.is_empty() && self.cursor.is_none();
        self.full.insert(id);
        self.work.insert(id);
        self.progress.todo += 1;
        self.complete = false;
        if first_work {
            self.cursor = Some(id);
        }
        first_work
    }

    /// The item started matching. Returns true if it became the cursor
    /// because the phase had no outstanding work.
    pub(crate) fn enter(&mut self, id: ItemId) -> bool {
        let was_idle = self.work.is_empty();
        assert!(
            self.work.insert(id),
            "phase '{}': item {id} entered while already in the work set",
            self.spec.name
        );
        self.progress.todo += 1;
        if self.full.insert(id) {
            decrement(&mut self.progress.skipped, "skipped", &self.spec.name);
        } else {
            decrement(&mut self.progress.finished, "finished", &self.spec.name);
        }
        if was_idle {
            self.cursor = Some(id);
            self.complete = false;
        }
        was_idle
    }

    /// The item stopped matching: it is finished here.
    pub(crate) fn leave(&mut self, id: ItemId) -> Departure {
        decrement(&mut self.progress.todo, "todo", &self.spec.name);
        self.progress.finished += 1;
        let cursor_moved = self.advance_off(id);
        self.work.remove(&id);
        Departure {
            cursor_moved,
            emptied: self.settle_if_empty(),
        }
    }

    /// The item is being deleted: drop it from both sets.
    pub(crate) fn forget(&mut self, id: ItemId) -> Departure {
        let cursor_moved = self.cursor == Some(id);
        let was_work = self.work.remove(&id);
        if was_work {
            decrement(&mut self.progress.todo, "todo", &self.spec.name);
            self.progress.finished += 1;
        }
        self.full.remove(&id);
        if cursor_moved {
            // Next pending item first; with no work left, the nearest browsable one.
            self.cursor = step(&self.work, Some(id), Direction::Forward)
                .or_else(|| step(&self.full, Some(id), Direction::Forward));
        }
        Departure {
            cursor_moved,
            emptied: was_work && self.settle_if_empty(),
        }
    }

    fn advance_off(&mut self, id: ItemId) -> bool {
        if self.cursor != Some(id) {
            return false;
        }
        self.cursor = step(&self.work, Some(id), Direction::Forward);
        true
    }

    fn settle_if_empty(&mut self) -> bool {
        if !self.work.is_empty() {
            return false;
        }
        self.cursor = None;
        self.complete = true;
        true
    }

    pub(crate) fn next(&mut self) -> Option<ItemId> {
        self.cursor = step(&self.full, self.cursor, Direction::Forward);
        self.cursor
    }

    pub(crate) fn prev(&mut self) -> Option<ItemId> {
        self.cursor = step(&self.full, self.cursor, Direction::Backward);
        self.cursor
    }

    pub(crate) fn next_work(&mut self) -> Option<ItemId> {
        self.cursor = step(&self.work, self.cursor, Direction::Forward);
        self.cursor
    }

    pub(crate) fn prev_work(&mut self) -> Option<ItemId> {
        self.cursor = step(&self.work, self.cursor, Direction::Backward);
        self.cursor
    }

    /// Point the cursor at an item of the full set. Returns false otherwise.
    pub(crate) fn set_cursor(&mut self, id: ItemId) -> bool {
        if !self.full.contains(&id) {
            return false;
        }
        self.cursor = Some(id);
        true
    }

    /// Panic if the bookkeeping disagrees with itself.
    pub fn assert_consistent(&self) {
        assert!(
            self.work.is_subset(&self.full),
            "phase '{}': work set escapes full set",
            self.spec.name
        );
        assert_eq!(
            self.progress.todo,
            self.work.len(),
            "phase '{}': todo counter out of sync",
            self.spec.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase() -> Phase {
        Phase::new(
            PhaseId(0),
            PhaseSpec {
                name: "Clean".into(),
                tags: vec![SignedTag::remove("cleaned")],
                extras: vec![],
                actions: vec![],
            },
        )
    }

    fn loaded(ids: &[usize]) -> Phase {
        let mut p = phase();
        for &id in ids {
            p.observe(ItemId(id), true);
        }
        p
    }

    #[test]
    fn first_matching_item_becomes_cursor() {
        let mut p = phase();
        p.observe(ItemId(0), false);
        assert_eq!(p.cursor(), None);
        assert!(p.observe(ItemId(1), true));
        assert!(!p.observe(ItemId(2), true));
        assert_eq!(p.cursor(), Some(ItemId(1)));
        assert_eq!(
            p.progress(),
            Progress {
                todo: 2,
                finished: 0,
                skipped: 1
            }
        );
    }

    #[test]
    fn navigation_wraps() {
        let mut p = loaded(&[1, 4, 7]);
        assert_eq!(p.next(), Some(ItemId(4)));
        assert_eq!(p.next(), Some(ItemId(7)));
        assert_eq!(p.next(), Some(ItemId(1)));
        assert_eq!(p.prev(), Some(ItemId(7)));
    }

    #[test]
    fn work_navigation_from_non_member_uses_nearest_id() {
        let mut p = loaded(&[1, 4, 7]);
        p.leave(ItemId(4));
        p.set_cursor(ItemId(4));
        assert_eq!(p.next_work(), Some(ItemId(7)));
        p.set_cursor(ItemId(4));
        assert_eq!(p.prev_work(), Some(ItemId(1)));
    }

    #[test]
    fn navigation_on_empty_set_clears_cursor() {
        let mut p = phase();
        assert_eq!(p.next(), None);
        assert_eq!(p.prev_work(), None);
    }

    #[test]
    fn leave_moves_cursor_then_removes() {
        let mut p = loaded(&[1, 2, 3]);
        p.set_cursor(ItemId(3));
        let out = p.leave(ItemId(3));
        assert!(out.cursor_moved);
        assert!(!out.emptied);
        assert_eq!(p.cursor(), Some(ItemId(1)));
        assert!(p.in_full(ItemId(3)));
        assert!(!p.in_work(ItemId(3)));
        p.assert_consistent();
    }

    #[test]
    fn last_leave_completes_phase() {
        let mut p = loaded(&[1]);
        let out = p.leave(ItemId(1));
        assert!(out.emptied);
        assert!(p.is_complete());
        assert_eq!(p.cursor(), None);
        assert_eq!(p.progress().finished, 1);
        assert_eq!(p.progress().todo, 0);
    }

    #[test]
    fn reentry_takes_from_finished() {
        let mut p = loaded(&[1, 2]);
        p.leave(ItemId(1));
        p.enter(ItemId(1));
        assert_eq!(
            p.progress(),
            Progress {
                todo: 2,
                finished: 0,
                skipped: 0
            }
        );
        p.assert_consistent();
    }

    #[test]
    fn entry_into_idle_phase_takes_cursor() {
        let mut p = phase();
        p.observe(ItemId(5), false);
        assert!(p.enter(ItemId(5)));
        assert_eq!(p.cursor(), Some(ItemId(5)));
        assert_eq!(p.progress().skipped, 0);
        assert!(!p.is_complete());
    }

    #[test]
    #[should_panic(expected = "already in the work set")]
    fn double_entry_is_a_defect() {
        let mut p = loaded(&[1]);
        p.enter(ItemId(1));
    }

    #[test]
    fn forget_removes_from_both_sets() {
        let mut p = loaded(&[1, 2, 3]);
        p.set_cursor(ItemId(2));
        let out = p.forget(ItemId(2));
        assert!(out.cursor_moved);
        assert_eq!(p.cursor(), Some(ItemId(3)));
        assert!(!p.in_full(ItemId(2)));
        assert_eq!(p.progress().observed(), 3);
        p.assert_consistent();
    }

    #[test]
    fn forget_finished_item_under_cursor_lands_on_neighbour() {
        let mut p = loaded(&[1, 2]);
        p.leave(ItemId(2));
        p.leave(ItemId(1));
        p.set_cursor(ItemId(1));
        let out = p.forget(ItemId(1));
        assert!(!out.emptied);
        assert_eq!(p.cursor(), Some(ItemId(2)));
    }

    #[test]
    fn progress_line_format() {
        let progress = Progress {
            todo: 3,
            finished: 1,
            skipped: 2,
        };
        assert_eq!(
            progress.to_string(),
            "25% done | 1 complete | 3 incomplete | 2 skipped"
        );
        assert_eq!(Progress::default().percent_done(), 100);
    }

    #[test]
    fn steps_parse_from_config_strings() {
        let steps: Vec<Step> =
            serde_json::from_str(r#"["save_name", "+named", "rotate_left"]"#).unwrap();
        assert_eq!(
            steps,
            vec![
                Step::SaveName,
                Step::Tag(SignedTag::add("named")),
                Step::RotateLeft
            ]
        );
        assert!(steps[2].is_external());
        assert!("explode".parse::<Step>().is_err());
    }
}
