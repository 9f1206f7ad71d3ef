//! The workflow engine.
//!
//! [`Organizer`] owns every item, category, and phase. All mutations go
//! through it so the per-phase sets, counters, and cursors are recomputed in
//! one place. Collaborators drain [`Notification`]s after each call to learn
//! which phase views need refreshing.

use crate::category::{Category, CategoryId, CategoryRegistry};
use crate::config::WorkflowConfig;
use crate::discover::discover;
use crate::error::{OrganizeError, Result};
use crate::item::{Item, ItemId};
use crate::phase::{Phase, PhaseId, PhaseInfo, PhaseSpec, Step};
use crate::recent::RecentCategories;
use crate::tag::SignedTag;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Something a collaborator should react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// The phase's current item changed (or was modified on disk).
    CurrentChanged {
        phase: PhaseId,
        item: Option<ItemId>,
        is_work: bool,
    },
    /// The phase has no outstanding work. `announce` is set once, when a
    /// user action finished the last item.
    PhaseComplete { phase: PhaseId, announce: bool },
    /// Auto-selection picked this phase.
    PhaseSelected { phase: PhaseId },
}

/// Free-form input gathered by the collaborator for save steps.
#[derive(Debug, Clone, Default)]
pub struct ActionInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub transcription: Option<String>,
}

/// What a single action step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    /// The step runs outside the engine; the collaborator must handle it.
    External,
}

#[derive(Debug)]
pub struct Organizer {
    image_extensions: Vec<String>,
    sidecar_extension: String,
    items: BTreeMap<ItemId, Item>,
    next_item: usize,
    categories: CategoryRegistry,
    recent: RecentCategories,
    phases: Vec<Phase>,
    active: Option<PhaseId>,
    notifications: Vec<Notification>,
}

impl Organizer {
    /// An empty engine with the configured phases and no items.
    #[must_use]
    pub fn new(root: &Path, config: &WorkflowConfig) -> Self {
        let mut organizer = Self {
            image_extensions: config.image_extensions.clone(),
            sidecar_extension: config.sidecar_extension.clone(),
            items: BTreeMap::new(),
            next_item: 0,
            categories: CategoryRegistry::new(root),
            recent: RecentCategories::with_capacity(config.recent_capacity),
            phases: Vec::new(),
            active: None,
            notifications: Vec::new(),
        };
        for spec in &config.phases {
            organizer.add_phase(spec.clone());
        }
        organizer
    }

    /// Discover `root`, load every image, and auto-select a phase.
    pub fn open(root: &Path, config: &WorkflowConfig) -> Result<Self> {
        let found = discover(root, config)?;
        let mut organizer = Self::new(root, config);
        for dir in found.dirs {
            organizer.add_category(dir);
        }
        for image in found.images {
            organizer.add_image(image)?;
        }
        organizer.autoselect_phase();
        info!(
            root = %root.display(),
            items = organizer.items.len(),
            categories = organizer.categories.len(),
            "workflow loaded"
        );
        Ok(organizer)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.categories.root()
    }

    // -- registration -----------------------------------------------------

    /// Declare a phase. Items already loaded are classified immediately.
    pub fn add_phase(&mut self, spec: PhaseSpec) -> PhaseId {
        let id = PhaseId(self.phases.len());
        let mut phase = Phase::new(id, spec);
        for (item_id, item) in &self.items {
            phase.observe(*item_id, item.matches(phase.predicates()));
        }
        self.phases.push(phase);
        id
    }

    pub fn add_category(&mut self, path: impl Into<PathBuf>) -> CategoryId {
        self.categories.add(path)
    }

    /// Load one image and classify it into every phase.
    pub fn add_image(&mut self, path: impl Into<PathBuf>) -> Result<ItemId> {
        let path = path.into();
        let id = ItemId(self.next_item);
        let category = self.categories.find_narrowest(&path);
        let item = Item::load(id, path, &self.sidecar_extension, category)?;
        self.next_item += 1;

        for phase in &mut self.phases {
            if phase.observe(id, item.matches(phase.predicates())) {
                self.notifications.push(current_of(phase));
            }
        }
        self.items.insert(id, item);
        Ok(id)
    }

    // -- queries ----------------------------------------------------------

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn item(&self, id: ItemId) -> Result<&Item> {
        self.items
            .get(&id)
            .ok_or_else(|| OrganizeError::UnknownItem(id.to_string()))
    }

    /// Find an item by absolute path or path relative to the root.
    pub fn item_by_path(&self, path: &Path) -> Result<ItemId> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root().join(path)
        };
        self.items
            .values()
            .find(|item| item.image_path() == absolute)
            .map(Item::id)
            .ok_or_else(|| OrganizeError::UnknownItem(path.display().to_string()))
    }

    /// Path of an item relative to the root.
    pub fn relative_path(&self, id: ItemId) -> Result<PathBuf> {
        let item = self.item(id)?;
        Ok(item
            .image_path()
            .strip_prefix(self.root())
            .unwrap_or_else(|_| item.image_path())
            .to_path_buf())
    }

    pub fn phases(&self) -> impl Iterator<Item = &Phase> {
        self.phases.iter()
    }

    pub fn phase(&self, id: PhaseId) -> Result<&Phase> {
        self.phases
            .get(id.0)
            .ok_or_else(|| OrganizeError::UnknownPhase(id.0.to_string()))
    }

    /// Resolve a phase by 1-based number, full name, or the name after `:`.
    pub fn phase_by_name(&self, query: &str) -> Result<PhaseId> {
        let query = query.trim();
        if let Ok(number) = query.parse::<usize>() {
            if (1..=self.phases.len()).contains(&number) {
                return Ok(PhaseId(number - 1));
            }
        }
        self.phases
            .iter()
            .find(|p| {
                let name = p.name();
                let short = name.rsplit(':').next().unwrap_or(name).trim();
                name.eq_ignore_ascii_case(query) || short.eq_ignore_ascii_case(query)
            })
            .map(Phase::id)
            .ok_or_else(|| OrganizeError::UnknownPhase(query.to_string()))
    }

    pub fn phase_info(&self, id: PhaseId) -> Result<PhaseInfo> {
        Ok(self.phase(id)?.info())
    }

    #[must_use]
    pub const fn active_phase(&self) -> Option<PhaseId> {
        self.active
    }

    pub fn select_phase(&mut self, id: PhaseId) -> Result<()> {
        self.phase(id)?;
        self.active = Some(id);
        Ok(())
    }

    #[must_use]
    pub const fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    pub fn category_by_name(&self, name: &str) -> Result<CategoryId> {
        self.categories
            .by_name(name)
            .ok_or_else(|| OrganizeError::UnknownCategory(name.trim().to_string()))
    }

    pub fn category_of(&self, id: ItemId) -> Result<Option<&Category>> {
        Ok(self.item(id)?.category().map(|c| self.categories.get(c)))
    }

    pub fn recent_categories(&self) -> impl Iterator<Item = &Category> {
        self.recent.iter().map(|id| self.categories.get(id))
    }

    /// Mark a category as recently used (e.g. when restoring a session).
    pub fn touch_recent(&mut self, id: CategoryId) {
        self.recent.touch(id);
    }

    #[must_use]
    pub const fn image_extensions(&self) -> &[String] {
        self.image_extensions.as_slice()
    }

    /// Drain pending notifications, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // -- selection and navigation ------------------------------------------

    /// Mark idle phases complete and select the last declared phase with work.
    /// Selects nothing when no phase has work left.
    pub fn autoselect_phase(&mut self) -> Option<PhaseId> {
        let mut best = None;
        for phase in self.phases.iter_mut().rev() {
            if phase.has_work() {
                best.get_or_insert(phase.id());
            } else if !phase.is_complete() {
                phase.mark_complete();
                self.notifications.push(Notification::PhaseComplete {
                    phase: phase.id(),
                    announce: false,
                });
            }
        }
        self.active = best;
        if let Some(phase) = best {
            self.notifications.push(Notification::PhaseSelected { phase });
        }
        debug!(selected = ?best, "auto-selected phase");
        best
    }

    /// Point a phase's cursor at an item of its full set.
    pub fn set_image(&mut self, phase: PhaseId, item: ItemId) -> Result<()> {
        self.item(item)?;
        let target = self.phase_mut(phase)?;
        if !target.set_cursor(item) {
            return Err(OrganizeError::validation(
                "item",
                format!("{item} is not part of phase '{}'", target.name()),
            ));
        }
        let notification = current_of(target);
        self.notifications.push(notification);
        Ok(())
    }

    /// Re-announce an item whose image changed outside the engine.
    pub fn reload_image(&mut self, item: ItemId) -> Result<()> {
        self.item(item)?;
        for phase in &self.phases {
            if phase.cursor() == Some(item) {
                self.notifications.push(current_of(phase));
            }
        }
        Ok(())
    }

    pub fn next(&mut self, phase: PhaseId) -> Result<Option<ItemId>> {
        self.navigate(phase, Phase::next)
    }

    pub fn prev(&mut self, phase: PhaseId) -> Result<Option<ItemId>> {
        self.navigate(phase, Phase::prev)
    }

    pub fn next_work(&mut self, phase: PhaseId) -> Result<Option<ItemId>> {
        self.navigate(phase, Phase::next_work)
    }

    pub fn prev_work(&mut self, phase: PhaseId) -> Result<Option<ItemId>> {
        self.navigate(phase, Phase::prev_work)
    }

    fn navigate(
        &mut self,
        phase: PhaseId,
        step: fn(&mut Phase) -> Option<ItemId>,
    ) -> Result<Option<ItemId>> {
        let target = self.phase_mut(phase)?;
        let cursor = step(target);
        let notification = current_of(target);
        self.notifications.push(notification);
        Ok(cursor)
    }

    // -- mutations ----------------------------------------------------------

    /// Add or remove one tag and update every phase the item enters or leaves.
    pub fn tag(&mut self, id: ItemId, signed: &SignedTag) -> Result<()> {
        let category_name = self.category_name(id)?;
        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| OrganizeError::UnknownItem(id.to_string()))?;

        let before: Vec<bool> = self
            .phases
            .iter()
            .map(|p| item.matches(p.predicates()))
            .collect();
        item.tag(signed, category_name.as_deref())?;
        let after: Vec<bool> = self
            .phases
            .iter()
            .map(|p| item.matches(p.predicates()))
            .collect();
        debug!(item = %id, tag = %signed, "tagged");

        let mut emptied = false;
        for (phase, (was, is)) in self.phases.iter_mut().zip(before.into_iter().zip(after)) {
            match (was, is) {
                (false, true) => {
                    debug!(phase = phase.name(), item = %id, "entered");
                    if phase.enter(id) {
                        self.notifications.push(current_of(phase));
                    }
                }
                (true, false) => {
                    debug!(phase = phase.name(), item = %id, "left");
                    let departure = phase.leave(id);
                    if departure.cursor_moved || departure.emptied {
                        self.notifications.push(current_of(phase));
                    }
                    if departure.emptied {
                        self.notifications.push(Notification::PhaseComplete {
                            phase: phase.id(),
                            announce: true,
                        });
                        emptied = true;
                    }
                }
                _ => {}
            }
        }

        if emptied {
            self.autoselect_phase();
        }
        Ok(())
    }

    /// Remove an item from every phase, then delete its files.
    ///
    /// The item is tagged `deleted` and its files removed before any phase
    /// bookkeeping changes, so a filesystem failure leaves the phases intact.
    pub fn delete(&mut self, id: ItemId) -> Result<()> {
        let category_name = self.category_name(id)?;
        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| OrganizeError::UnknownItem(id.to_string()))?;
        item.tag(&SignedTag::add("deleted"), category_name.as_deref())?;
        item.remove_files()?;
        info!(item = %id, path = %item.image_path().display(), "deleted image");

        let mut emptied = false;
        for phase in &mut self.phases {
            let departure = phase.forget(id);
            if departure.cursor_moved || departure.emptied {
                self.notifications.push(current_of(phase));
            }
            if departure.emptied {
                self.notifications.push(Notification::PhaseComplete {
                    phase: phase.id(),
                    announce: true,
                });
                emptied = true;
            }
        }
        self.items.remove(&id);

        if emptied {
            self.autoselect_phase();
        }
        Ok(())
    }

    /// Move an item into a category directory and record the category.
    pub fn save_category(&mut self, id: ItemId, category: Option<&str>) -> Result<()> {
        let name = category.map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(OrganizeError::validation("category", "no category selected"));
        }
        let category_id = self.category_by_name(name)?;
        let category = self.categories.get(category_id).clone();

        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| OrganizeError::UnknownItem(id.to_string()))?;
        let dest = category.path.join(item.file_name());
        item.check_move(&dest)?;
        item.move_to(&dest)?;
        item.set_category(Some(category_id));
        item.save(Some(&category.name))?;
        self.recent.touch(category_id);
        info!(item = %id, category = %category.name, "categorized");

        self.refresh_cursor_views(id);
        Ok(())
    }

    /// Rename an item's file within its directory.
    pub fn save_name(&mut self, id: ItemId, name: Option<&str>) -> Result<()> {
        let name = name.unwrap_or_default();
        let category_name = self.category_name(id)?;
        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| OrganizeError::UnknownItem(id.to_string()))?;
        let dest = item.rename_target(name, &self.image_extensions)?;
        item.check_move(&dest)?;
        let had_sidecar = item.has_sidecar_file();
        if item.move_to(&dest)? && had_sidecar {
            item.save(category_name.as_deref())?;
        }
        self.refresh_cursor_views(id);
        Ok(())
    }

    /// Store transcription text as the sidecar body.
    pub fn save_transcription(&mut self, id: ItemId, text: Option<&str>) -> Result<()> {
        let text = text.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(OrganizeError::validation("transcription", "text is blank"));
        }
        let category_name = self.category_name(id)?;
        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| OrganizeError::UnknownItem(id.to_string()))?;
        item.set_transcription(text, category_name.as_deref())?;
        self.refresh_cursor_views(id);
        Ok(())
    }

    pub fn create_category(&mut self, name: &str) -> Result<CategoryId> {
        self.categories.create(name)
    }

    /// Rename a category directory and re-home every item below it.
    pub fn rename_category(&mut self, id: CategoryId, new_name: &str) -> Result<()> {
        if id.index() >= self.categories.len() {
            return Err(OrganizeError::UnknownCategory(id.index().to_string()));
        }
        let (old_dir, new_dir) = self.categories.rename(id, new_name)?;

        let mut moved = Vec::new();
        let mut first_error = None;
        for item in self.items.values_mut() {
            if !item.rebase(&old_dir, &new_dir) {
                continue;
            }
            moved.push(item.id());
            let Some(category) = item.category() else {
                continue;
            };
            let category = self.categories.get(category);
            if category.path.starts_with(&new_dir) && item.has_sidecar_file() {
                if let Err(e) = item.save(Some(&category.name)) {
                    warn!(item = %item.id(), error = %e, "failed to rewrite sidecar after category rename");
                    first_error.get_or_insert(e);
                }
            }
        }
        info!(
            from = %old_dir.display(),
            to = %new_dir.display(),
            items = moved.len(),
            "re-homed items"
        );

        for item in moved {
            self.refresh_cursor_views(item);
        }
        first_error.map_or(Ok(()), Err)
    }

    // -- actions ------------------------------------------------------------

    /// Steps of a configured phase action, looked up by label.
    pub fn action_steps(&self, phase: PhaseId, label: &str) -> Result<Vec<Step>> {
        let phase = self.phase(phase)?;
        phase
            .spec()
            .action(label)
            .map(|a| a.steps.clone())
            .ok_or_else(|| {
                OrganizeError::validation(
                    "action",
                    format!("phase '{}' has no action '{}'", phase.name(), label.trim()),
                )
            })
    }

    /// Execute one action step for `item` in the context of `phase`.
    pub fn perform(
        &mut self,
        phase: PhaseId,
        item: ItemId,
        step: &Step,
        input: &ActionInput,
    ) -> Result<StepOutcome> {
        match step {
            Step::Tag(signed) => self.tag(item, signed)?,
            Step::SaveCategory => self.save_category(item, input.category.as_deref())?,
            Step::SaveName => self.save_name(item, input.name.as_deref())?,
            Step::SaveTranscription => {
                self.save_transcription(item, input.transcription.as_deref())?;
            }
            Step::Next => {
                self.next(phase)?;
            }
            Step::Prev => {
                self.prev(phase)?;
            }
            Step::NextWork => {
                self.next_work(phase)?;
            }
            Step::PrevWork => {
                self.prev_work(phase)?;
            }
            Step::RotateLeft | Step::RotateRight | Step::Crop => {
                return Ok(StepOutcome::External);
            }
        }
        Ok(StepOutcome::Done)
    }

    /// Panic if any phase disagrees with itself or references a missing item.
    pub fn assert_consistent(&self) {
        for phase in &self.phases {
            phase.assert_consistent();
            for id in phase.full() {
                assert!(
                    self.items.contains_key(&id),
                    "phase '{}' references deleted item {id}",
                    phase.name()
                );
            }
        }
    }

    // -- helpers ------------------------------------------------------------

    fn phase_mut(&mut self, id: PhaseId) -> Result<&mut Phase> {
        self.phases
            .get_mut(id.0)
            .ok_or_else(|| OrganizeError::UnknownPhase(id.0.to_string()))
    }

    fn category_name(&self, id: ItemId) -> Result<Option<String>> {
        Ok(self.category_of(id)?.map(|c| c.name.clone()))
    }

    fn refresh_cursor_views(&mut self, item: ItemId) {
        for phase in &self.phases {
            if phase.cursor() == Some(item) {
                self.notifications.push(current_of(phase));
            }
        }
    }
}

fn current_of(phase: &Phase) -> Notification {
    let item = phase.cursor();
    Notification::CurrentChanged {
        phase: phase.id(),
        item,
        is_work: item.is_some_and(|i| phase.in_work(i)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::Progress;
    use std::fs;
    use tempfile::TempDir;

    fn workspace(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for rel in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"img").unwrap();
        }
        dir
    }

    fn clean_only() -> WorkflowConfig {
        WorkflowConfig {
            phases: vec![PhaseSpec {
                name: "Clean".into(),
                tags: vec![SignedTag::remove("cleaned")],
                extras: vec![],
                actions: vec![],
            }],
            ..WorkflowConfig::default()
        }
    }

    fn open(dir: &TempDir, config: &WorkflowConfig) -> Organizer {
        let mut organizer = Organizer::open(dir.path(), config).unwrap();
        organizer.take_notifications();
        organizer
    }

    fn clean() -> PhaseId {
        PhaseId(0)
    }

    #[test]
    fn untagged_item_is_pending_until_cleaned() {
        let dir = workspace(&["a.png"]);
        let mut org = open(&dir, &clean_only());
        let a = org.item_by_path(Path::new("a.png")).unwrap();

        let info = org.phase_info(clean()).unwrap();
        assert_eq!(info.full, vec![a]);
        assert_eq!(info.work, vec![a]);
        assert_eq!(info.progress.todo, 1);
        assert_eq!(org.active_phase(), Some(clean()));

        org.tag(a, &SignedTag::add("cleaned")).unwrap();
        let info = org.phase_info(clean()).unwrap();
        assert_eq!(
            info.progress,
            Progress {
                todo: 0,
                finished: 1,
                skipped: 0
            }
        );
        assert!(info.work.is_empty());
        assert_eq!(info.full, vec![a]);
        assert!(info.complete);
        assert_eq!(info.cursor, None);
        assert_eq!(org.active_phase(), None);

        let notes = org.take_notifications();
        assert!(notes.contains(&Notification::PhaseComplete {
            phase: clean(),
            announce: true
        }));
        org.assert_consistent();
    }

    #[test]
    fn finishing_a_phase_selects_the_last_phase_with_work() {
        let dir = workspace(&["a.png"]);
        let mut org = open(&dir, &WorkflowConfig::default());
        let a = org.item_by_path(Path::new("a.png")).unwrap();
        let tagging = org.phase_by_name("tagging").unwrap();
        assert_eq!(org.active_phase(), Some(tagging));

        org.tag(a, &SignedTag::add("no_text")).unwrap();
        assert_eq!(org.active_phase(), Some(org.phase_by_name("2").unwrap()));
        assert!(org.take_notifications().contains(&Notification::PhaseSelected {
            phase: PhaseId(1)
        }));
    }

    #[test]
    fn idempotent_tag_changes_no_counters_and_rewrites_identically() {
        let dir = workspace(&["a.png"]);
        let mut org = open(&dir, &clean_only());
        let a = org.item_by_path(Path::new("a.png")).unwrap();

        org.tag(a, &SignedTag::add("cleaned")).unwrap();
        let sidecar = org.item(a).unwrap().sidecar_path().to_path_buf();
        let first = fs::read(&sidecar).unwrap();
        let progress = org.phase(clean()).unwrap().progress();

        org.tag(a, &SignedTag::add("cleaned")).unwrap();
        org.tag(a, &SignedTag::remove("never-there")).unwrap();
        assert_eq!(fs::read(&sidecar).unwrap(), first);
        assert_eq!(org.phase(clean()).unwrap().progress(), progress);
    }

    #[test]
    fn reentry_restores_work_and_cursor() {
        let dir = workspace(&["a.png", "b.png"]);
        let mut org = open(&dir, &clean_only());
        let a = org.item_by_path(Path::new("a.png")).unwrap();
        let b = org.item_by_path(Path::new("b.png")).unwrap();

        org.tag(a, &SignedTag::add("cleaned")).unwrap();
        org.tag(b, &SignedTag::add("cleaned")).unwrap();
        assert!(org.phase(clean()).unwrap().is_complete());

        org.tag(a, &SignedTag::remove("cleaned")).unwrap();
        let phase = org.phase(clean()).unwrap();
        assert!(!phase.is_complete());
        assert_eq!(phase.cursor(), Some(a));
        assert_eq!(phase.progress().finished, 1);
        assert_eq!(phase.progress().todo, 1);
        org.assert_consistent();
    }

    #[test]
    fn leaving_item_under_cursor_advances_in_work_order() {
        let dir = workspace(&["a.png", "b.png", "c.png"]);
        let mut org = open(&dir, &clean_only());
        let a = org.item_by_path(Path::new("a.png")).unwrap();
        let b = org.item_by_path(Path::new("b.png")).unwrap();
        let c = org.item_by_path(Path::new("c.png")).unwrap();

        org.set_image(clean(), b).unwrap();
        org.tag(b, &SignedTag::add("cleaned")).unwrap();
        assert_eq!(org.phase(clean()).unwrap().cursor(), Some(c));
        org.tag(c, &SignedTag::add("cleaned")).unwrap();
        assert_eq!(org.phase(clean()).unwrap().cursor(), Some(a));
    }

    #[test]
    fn navigation_round_trips_and_notifies() {
        let dir = workspace(&["a.png", "b.png", "c.png"]);
        let mut org = open(&dir, &clean_only());
        let start = org.phase(clean()).unwrap().cursor();

        let moved = org.next(clean()).unwrap();
        assert_ne!(moved, start);
        assert_eq!(org.prev(clean()).unwrap(), start);
        org.next_work(clean()).unwrap();
        assert_eq!(org.prev_work(clean()).unwrap(), start);

        let notes = org.take_notifications();
        assert_eq!(notes.len(), 4);
        assert!(matches!(
            notes[0],
            Notification::CurrentChanged { is_work: true, .. }
        ));
    }

    #[test]
    fn set_image_outside_full_set_is_rejected() {
        let dir = workspace(&["a.png", "b.png"]);
        let mut org = open(&dir, &WorkflowConfig::default());
        let a = org.item_by_path(Path::new("a.png")).unwrap();
        let renaming = org.phase_by_name("Phase 3: Renaming").unwrap();
        let err = org.set_image(renaming, a).unwrap_err();
        assert!(matches!(err, OrganizeError::Validation { field: "item", .. }));
    }

    #[test]
    fn rename_onto_existing_file_changes_nothing() {
        let dir = workspace(&["a.png", "b.png"]);
        let mut org = open(&dir, &clean_only());
        let a = org.item_by_path(Path::new("a.png")).unwrap();
        org.tag(a, &SignedTag::add("cleaned")).unwrap();
        let before = org.phase_info(clean()).unwrap();
        let sidecar = fs::read(org.item(a).unwrap().sidecar_path()).unwrap();

        let err = org.save_name(a, Some("b")).unwrap_err();
        assert!(matches!(err, OrganizeError::Clobbering { .. }));

        let item = org.item(a).unwrap();
        assert_eq!(item.image_path(), dir.path().join("a.png"));
        assert_eq!(fs::read(item.sidecar_path()).unwrap(), sidecar);
        let after = org.phase_info(clean()).unwrap();
        assert_eq!(after.full, before.full);
        assert_eq!(after.work, before.work);
        assert_eq!(after.progress, before.progress);
    }

    const PRECIOUS: &str = "---\nfilename: a.jpg\ntags:\n- cleaned\n---\n\nprecious text";

    #[test]
    fn categorize_without_sidecar_keeps_foreign_sidecar() {
        let dir = workspace(&["a.png", "letters/a.jpg"]);
        fs::write(dir.path().join("letters/a.txt"), PRECIOUS).unwrap();
        let mut org = open(&dir, &clean_only());
        let a = org.item_by_path(Path::new("a.png")).unwrap();
        assert!(!org.item(a).unwrap().has_sidecar_file());

        let err = org.save_category(a, Some("letters")).unwrap_err();
        assert!(matches!(err, OrganizeError::Clobbering { .. }));
        assert_eq!(fs::read_to_string(dir.path().join("letters/a.txt")).unwrap(), PRECIOUS);
        assert!(dir.path().join("a.png").exists());
        assert!(!dir.path().join("letters/a.png").exists());
        assert_eq!(org.item(a).unwrap().category(), org.category_by_name(".").ok());
        org.assert_consistent();
    }

    #[test]
    fn rename_without_sidecar_keeps_foreign_sidecar() {
        let dir = workspace(&["a.png", "b.jpg"]);
        fs::write(dir.path().join("b.txt"), PRECIOUS).unwrap();
        let mut org = open(&dir, &clean_only());
        let a = org.item_by_path(Path::new("a.png")).unwrap();

        let err = org.save_name(a, Some("b")).unwrap_err();
        assert!(matches!(err, OrganizeError::Clobbering { .. }));
        assert_eq!(fs::read_to_string(dir.path().join("b.txt")).unwrap(), PRECIOUS);
        assert_eq!(org.item(a).unwrap().image_path(), dir.path().join("a.png"));
    }

    #[test]
    fn rename_without_sidecar_does_not_create_one() {
        let dir = workspace(&["a.png"]);
        let mut org = open(&dir, &clean_only());
        let a = org.item_by_path(Path::new("a.png")).unwrap();
        org.save_name(a, Some("b")).unwrap();
        assert!(dir.path().join("b.png").exists());
        assert!(!dir.path().join("b.txt").exists());
    }

    #[test]
    fn hidden_category_is_refused() {
        let dir = workspace(&["a.png"]);
        let mut org = open(&dir, &clean_only());
        assert!(matches!(
            org.create_category(".private"),
            Err(OrganizeError::Validation { field: "category", .. })
        ));
        assert!(!dir.path().join(".private").exists());

        let reopened = open(&dir, &clean_only());
        assert_eq!(reopened.items().count(), 1);
    }

    #[test]
    fn rename_moves_image_and_sidecar() {
        let dir = workspace(&["a.PNG"]);
        let mut org = open(&dir, &clean_only());
        let a = org.item_by_path(Path::new("a.PNG")).unwrap();
        org.tag(a, &SignedTag::add("cleaned")).unwrap();

        org.save_name(a, Some("harbour.png")).unwrap();
        let item = org.item(a).unwrap();
        assert_eq!(item.image_path(), dir.path().join("harbour.png"));
        assert!(dir.path().join("harbour.txt").exists());
        assert!(!dir.path().join("a.txt").exists());
        let text = fs::read_to_string(item.sidecar_path()).unwrap();
        assert!(text.contains("filename: harbour.png"));
    }

    #[test]
    fn blank_inputs_are_validation_errors() {
        let dir = workspace(&["a.png"]);
        let mut org = open(&dir, &clean_only());
        let a = org.item_by_path(Path::new("a.png")).unwrap();

        assert!(matches!(
            org.save_name(a, Some("  ")),
            Err(OrganizeError::Validation { field: "name", .. })
        ));
        assert!(matches!(
            org.save_category(a, None),
            Err(OrganizeError::Validation { field: "category", .. })
        ));
        assert!(matches!(
            org.save_transcription(a, Some("\n")),
            Err(OrganizeError::Validation {
                field: "transcription",
                ..
            })
        ));
        assert!(!org.item(a).unwrap().has_sidecar_file());
    }

    #[test]
    fn deleting_cursor_item_moves_to_remaining_work() {
        let dir = workspace(&["a.png", "b.png"]);
        let mut org = open(&dir, &clean_only());
        let a = org.item_by_path(Path::new("a.png")).unwrap();
        let b = org.item_by_path(Path::new("b.png")).unwrap();
        assert_eq!(org.phase(clean()).unwrap().cursor(), Some(a));

        org.delete(a).unwrap();
        let phase = org.phase(clean()).unwrap();
        assert_eq!(phase.cursor(), Some(b));
        assert!(!phase.in_full(a));
        assert!(!phase.in_work(a));
        assert_eq!(phase.progress().todo, 1);
        assert_eq!(phase.progress().finished, 1);
        assert!(!dir.path().join("a.png").exists());
        assert!(!dir.path().join("a.txt").exists());
        assert!(org.item(a).is_err());
        org.assert_consistent();
    }

    #[test]
    fn deleting_last_work_item_completes_phase() {
        let dir = workspace(&["a.png"]);
        let mut org = open(&dir, &clean_only());
        let a = org.item_by_path(Path::new("a.png")).unwrap();
        org.delete(a).unwrap();

        let phase = org.phase(clean()).unwrap();
        assert!(phase.is_complete());
        assert_eq!(phase.cursor(), None);
        assert!(org.take_notifications().contains(&Notification::PhaseComplete {
            phase: clean(),
            announce: true
        }));
    }

    #[test]
    fn categorize_moves_into_directory_and_records_recent() {
        let dir = workspace(&["a.png", "letters/.keep.png"]);
        let mut org = open(&dir, &WorkflowConfig::default());
        let a = org.item_by_path(Path::new("a.png")).unwrap();

        assert!(matches!(
            org.save_category(a, Some("nowhere")),
            Err(OrganizeError::UnknownCategory(_))
        ));

        org.save_category(a, Some("letters")).unwrap();
        let item = org.item(a).unwrap();
        assert_eq!(item.image_path(), dir.path().join("letters/a.png"));
        let text = fs::read_to_string(item.sidecar_path()).unwrap();
        assert!(text.contains("category: letters"));
        let recent: Vec<_> = org.recent_categories().map(|c| c.name.clone()).collect();
        assert_eq!(recent, vec!["letters".to_string()]);
    }

    #[test]
    fn categorize_action_runs_all_steps() {
        let dir = workspace(&["a.png"]);
        let mut org = open(&dir, &WorkflowConfig::default());
        org.create_category("photos").unwrap();
        let a = org.item_by_path(Path::new("a.png")).unwrap();
        let categorize = org.phase_by_name("categorize").unwrap();

        let input = ActionInput {
            category: Some("photos".into()),
            ..ActionInput::default()
        };
        for step in org.action_steps(categorize, "Categorize").unwrap() {
            assert_eq!(
                org.perform(categorize, a, &step, &input).unwrap(),
                StepOutcome::Done
            );
        }
        assert!(org.item(a).unwrap().has_tag("categorized"));
        let renaming = org.phase_by_name("renaming").unwrap();
        assert!(org.phase(renaming).unwrap().in_work(a));
        assert_eq!(org.phase(renaming).unwrap().progress().skipped, 0);
        org.assert_consistent();
    }

    #[test]
    fn external_steps_are_left_to_the_caller() {
        let dir = workspace(&["a.png"]);
        let mut org = open(&dir, &WorkflowConfig::default());
        let a = org.item_by_path(Path::new("a.png")).unwrap();
        let outcome = org
            .perform(clean(), a, &Step::Crop, &ActionInput::default())
            .unwrap();
        assert_eq!(outcome, StepOutcome::External);
        assert!(org.action_steps(clean(), "Explode").is_err());
    }

    #[test]
    fn duplicate_category_is_rejected() {
        let dir = workspace(&["letters/a.png"]);
        let mut org = open(&dir, &clean_only());
        assert!(matches!(
            org.create_category("letters"),
            Err(OrganizeError::DuplicateCategory { .. })
        ));
    }

    #[test]
    fn category_rename_rehomes_every_item() {
        let dir = workspace(&["letters/a.png", "letters/b.png", "letters/c.png", "d.png"]);
        let mut org = open(&dir, &clean_only());
        let ids: Vec<_> = ["letters/a.png", "letters/b.png", "letters/c.png"]
            .iter()
            .map(|p| org.item_by_path(Path::new(p)).unwrap())
            .collect();
        for id in &ids {
            org.tag(*id, &SignedTag::add("cleaned")).unwrap();
        }
        let letters = org.category_by_name("letters").unwrap();

        org.rename_category(letters, "mail").unwrap();
        assert!(!dir.path().join("letters").exists());
        for (id, name) in ids.iter().zip(["a", "b", "c"]) {
            let item = org.item(*id).unwrap();
            assert_eq!(item.image_path(), dir.path().join(format!("mail/{name}.png")));
            assert!(item.has_tag("cleaned"));
            let text = fs::read_to_string(item.sidecar_path()).unwrap();
            assert!(text.contains("category: mail"));
        }
        assert_eq!(org.categories().get(letters).name, "mail");
        assert!(org.item_by_path(Path::new("d.png")).is_ok());
    }

    #[test]
    fn category_rename_onto_existing_directory_clobbers() {
        let dir = workspace(&["letters/a.png", "mail/b.png"]);
        let mut org = open(&dir, &clean_only());
        let letters = org.category_by_name("letters").unwrap();
        assert!(matches!(
            org.rename_category(letters, "mail"),
            Err(OrganizeError::Clobbering { .. })
        ));
        let a = org.item_by_path(Path::new("letters/a.png")).unwrap();
        assert!(org.item(a).unwrap().image_path().exists());
    }

    #[test]
    fn phase_lookup_accepts_number_and_names() {
        let dir = workspace(&[]);
        let org = open(&dir, &WorkflowConfig::default());
        assert_eq!(org.phase_by_name("1").unwrap(), PhaseId(0));
        assert_eq!(org.phase_by_name("Phase 5: Transcription").unwrap(), PhaseId(4));
        assert_eq!(org.phase_by_name("TAGGING").unwrap(), PhaseId(3));
        assert!(matches!(
            org.phase_by_name("9"),
            Err(OrganizeError::UnknownPhase(_))
        ));
    }

    #[test]
    fn empty_root_completes_every_phase_quietly() {
        let dir = workspace(&[]);
        let mut org = Organizer::open(dir.path(), &WorkflowConfig::default()).unwrap();
        assert_eq!(org.active_phase(), None);
        let notes = org.take_notifications();
        assert_eq!(notes.len(), 5);
        assert!(notes.iter().all(|n| matches!(
            n,
            Notification::PhaseComplete { announce: false, .. }
        )));
    }

    #[test]
    fn phase_added_late_classifies_loaded_items() {
        let dir = workspace(&["a.png", "b.png"]);
        let mut org = open(&dir, &clean_only());
        let a = org.item_by_path(Path::new("a.png")).unwrap();
        org.tag(a, &SignedTag::add("cleaned")).unwrap();

        let review = org.add_phase(PhaseSpec {
            name: "Review".into(),
            tags: vec![SignedTag::add("cleaned")],
            extras: vec![],
            actions: vec![],
        });
        let info = org.phase_info(review).unwrap();
        assert_eq!(info.work, vec![a]);
        assert_eq!(info.progress.skipped, 1);
        assert_eq!(info.cursor, Some(a));
    }
}
