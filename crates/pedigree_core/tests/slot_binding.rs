use pedigree_core::{
    build_pedigree, resolve_slot, seed_if_empty, BindingStore, CommandBridge, PersonDirectory,
    PersonDraft, PersonRecord, PersonSummary, PresetPicker, Slot, SlotResolution,
};
use std::cell::Cell;
use std::sync::Arc;

fn open_bridge(dir: &std::path::Path) -> CommandBridge {
    let bridge = CommandBridge::new(Arc::new(PresetPicker::default()), dir);
    bridge.project_new();
    bridge
}

/// Directory that counts calls and can be told to fail creates.
struct CountingDirectory {
    inner: CommandBridge,
    fail_create: bool,
    lists: Cell<usize>,
    creates: Cell<usize>,
}

impl CountingDirectory {
    fn new(inner: CommandBridge) -> Self {
        Self {
            inner,
            fail_create: false,
            lists: Cell::new(0),
            creates: Cell::new(0),
        }
    }
}

impl PersonDirectory for CountingDirectory {
    type Error = String;

    fn list_people(&self) -> Result<Vec<PersonSummary>, String> {
        self.lists.set(self.lists.get() + 1);
        self.inner.list_people().map_err(|err| err.to_string())
    }

    fn create_person(&self, draft: &PersonDraft) -> Result<PersonRecord, String> {
        self.creates.set(self.creates.get() + 1);
        if self.fail_create {
            return Err("disk full".to_string());
        }
        self.inner.create_person(draft).map_err(|err| err.to_string())
    }
}

#[test]
fn bound_slot_resolves_without_touching_storage() {
    let dir = tempfile::tempdir().unwrap();
    let directory = CountingDirectory::new(open_bridge(dir.path()));
    let mut store = BindingStore::in_memory();
    store.bind(Slot::Father, 41).unwrap();

    let resolution = resolve_slot(&directory, &mut store, Slot::Father, Some("Father")).unwrap();
    assert_eq!(resolution, SlotResolution::AlreadyBound(41));
    assert_eq!(directory.lists.get(), 0);
    assert_eq!(directory.creates.get(), 0);
}

#[test]
fn unbound_slot_matches_existing_person_by_label() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = open_bridge(dir.path());
    let mother = bridge
        .create_person(&PersonDraft::named("  mother ", ""))
        .unwrap();
    let directory = CountingDirectory::new(bridge);
    let mut store = BindingStore::in_memory();

    let resolution = resolve_slot(&directory, &mut store, Slot::Mother, None).unwrap();
    assert_eq!(resolution, SlotResolution::Matched(mother.person.id));
    assert_eq!(store.get(Slot::Mother), Some(mother.person.id));
    assert_eq!(directory.creates.get(), 0);
}

#[test]
fn unmatched_comma_label_creates_family_given_person() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = open_bridge(dir.path());
    bridge
        .create_person(&PersonDraft::named("Ada", "Lovelace"))
        .unwrap();
    let mut store = BindingStore::in_memory();

    let resolution = resolve_slot(
        &bridge,
        &mut store,
        Slot::MaternalGrandfather,
        Some("Maternal, Grandfather"),
    )
    .unwrap();
    assert!(resolution.created());

    let record = bridge.get_person(resolution.person_id()).unwrap();
    assert_eq!(record.names[0].given, "Grandfather");
    assert_eq!(record.names[0].family, "Maternal");
    assert_eq!(store.get(Slot::MaternalGrandfather), Some(record.person.id));

    // Second selection reuses the binding.
    let again = resolve_slot(&bridge, &mut store, Slot::MaternalGrandfather, None).unwrap();
    assert_eq!(again, SlotResolution::AlreadyBound(record.person.id));
    assert_eq!(bridge.list_people().unwrap().len(), 2);
}

#[test]
fn you_label_creates_person_named_you() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = open_bridge(dir.path());
    let mut store = BindingStore::in_memory();

    let resolution = resolve_slot(&bridge, &mut store, Slot::You, Some("you")).unwrap();
    let record = bridge.get_person(resolution.person_id()).unwrap();
    assert_eq!(record.names[0].given, "You");
    assert_eq!(record.names[0].family, "");
}

#[test]
fn failed_create_leaves_slot_unbound() {
    let dir = tempfile::tempdir().unwrap();
    let mut directory = CountingDirectory::new(open_bridge(dir.path()));
    directory.fail_create = true;
    let mut store = BindingStore::in_memory();

    let err = resolve_slot(&directory, &mut store, Slot::PaternalGrandmother, None).unwrap_err();
    assert!(err.to_string().contains("disk full"));
    assert!(err.to_string().contains("gmP"));
    assert_eq!(store.get(Slot::PaternalGrandmother), None);
}

#[test]
fn resolving_without_open_project_fails_and_stays_unbound() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = CommandBridge::new(Arc::new(PresetPicker::default()), dir.path());
    let mut store = BindingStore::in_memory();

    let err = resolve_slot(&bridge, &mut store, Slot::You, None).unwrap_err();
    assert!(err.to_string().contains("No project is open"));
    assert!(store.map().is_empty());
}

#[test]
fn seeding_binds_all_slots_once() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = open_bridge(dir.path());
    let mut store = BindingStore::load(dir.path().join("bindings.json")).unwrap();

    let seeded = seed_if_empty(&bridge, &mut store).unwrap().unwrap();
    assert_eq!(seeded.len(), Slot::ALL.len());
    assert!(seeded.iter().all(|(_, resolution)| resolution.created()));
    assert_eq!(bridge.list_people().unwrap().len(), 7);

    let reloaded = BindingStore::load(dir.path().join("bindings.json")).unwrap();
    assert_eq!(reloaded.map(), store.map());

    assert!(seed_if_empty(&bridge, &mut store).unwrap().is_none());
    assert_eq!(bridge.list_people().unwrap().len(), 7);

    let tree = build_pedigree(&bridge.list_people().unwrap(), store.map());
    let titles: Vec<_> = tree.walk().iter().map(|node| node.title.clone()).collect();
    assert_eq!(
        titles,
        vec![
            "You",
            "Mother",
            "Grandmother Maternal",
            "Grandfather Maternal",
            "Father",
            "Grandmother Paternal",
            "Grandfather Paternal",
        ]
    );
}

#[test]
fn seeding_skips_projects_with_people() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = open_bridge(dir.path());
    bridge
        .create_person(&PersonDraft::named("Ada", "Lovelace"))
        .unwrap();
    let mut store = BindingStore::in_memory();

    assert!(seed_if_empty(&bridge, &mut store).unwrap().is_none());
    assert!(store.map().is_empty());
}
