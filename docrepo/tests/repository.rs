//! End-to-end repository behavior against the in-memory backend.

use std::{
    sync::atomic::{AtomicU32, Ordering},
    thread,
    time::Duration,
};

use async_trait::async_trait;
use futures::executor::block_on;

use docrepo::memory::InMemoryStore;
use docrepo::prelude::*;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Entity)]
#[entity(collection = "people")]
struct Person {
    #[serde(rename = "_id")]
    id: ObjectId,
    created_at: Option<DateTime>,
    modified_at: DateTime,
    name: String,
    age: i32,
}

impl Person {
    fn new(name: &str, age: i32) -> Self {
        Self {
            id: ObjectId::new(),
            created_at: None,
            modified_at: DateTime::now(),
            name: name.to_string(),
            age,
        }
    }
}

/// Resolves the derive's emitted paths through the umbrella crate instead of
/// the default core crate.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Entity)]
#[entity(crate = "docrepo", collection = "notes")]
struct Note {
    #[serde(rename = "_id")]
    id: ObjectId,
    created_at: Option<DateTime>,
    modified_at: DateTime,
    body: String,
}

fn repo() -> Repository<InMemoryStore, Person> {
    Repository::new(InMemoryStore::new())
}

fn seeded() -> Repository<InMemoryStore, Person> {
    let repo = repo();
    let people = vec![
        Person::new("alice", 30),
        Person::new("bob", 25),
        Person::new("carol", 41),
    ];
    block_on(repo.insert_many(&people)).unwrap();

    repo
}

fn names(people: &[Person]) -> Vec<&str> {
    people.iter().map(|p| p.name.as_str()).collect()
}

#[test]
fn insert_and_get_round_trip() {
    let repo = repo();
    let person = Person::new("alice", 30);

    block_on(repo.insert(&person)).unwrap();
    let found = block_on(repo.get(person.id)).unwrap().unwrap();

    assert_eq!(found.name, "alice");
    assert_eq!(found.age, 30);
    assert_eq!(found.id, person.id);
}

#[test]
fn get_of_absent_identity_is_none() {
    let repo = repo();

    assert!(block_on(repo.get(ObjectId::new())).unwrap().is_none());
}

#[test]
fn created_at_is_derived_from_identity() {
    let repo = repo();
    let person = Person::new("alice", 30);

    block_on(repo.insert(&person)).unwrap();
    let found = block_on(repo.get(person.id)).unwrap().unwrap();

    assert_eq!(found.created_at, None);
    assert_eq!(found.effective_created_at(), person.id.timestamp());
}

#[test]
fn first_and_last_follow_insertion_order() {
    let repo = seeded();

    assert_eq!(block_on(repo.first()).unwrap().unwrap().name, "alice");
    assert_eq!(block_on(repo.last()).unwrap().unwrap().name, "carol");
}

#[test]
fn first_and_last_are_none_on_empty_collection() {
    let repo = repo();

    assert!(block_on(repo.first()).unwrap().is_none());
    assert!(block_on(repo.last()).unwrap().is_none());
}

#[test]
fn last_is_first_under_the_inverted_direction() {
    let repo = seeded();

    for descending in [false, true] {
        let last = block_on(repo.last_where(None, Some("age"), descending))
            .unwrap()
            .unwrap();
        let first_inverted = block_on(repo.first_where(None, Some("age"), !descending))
            .unwrap()
            .unwrap();

        assert_eq!(last.id, first_inverted.id);
        assert_eq!(last.name, if descending { "bob" } else { "carol" });
    }
}

#[test]
fn explicit_sort_without_direction_is_descending() {
    let repo = seeded();
    let found = block_on(repo.find(None, FindOptions::new().sort_by("age"))).unwrap();

    assert_eq!(names(&found), vec!["carol", "alice", "bob"]);
}

#[test]
fn ascending_sort_is_opt_in() {
    let repo = seeded();
    let found = block_on(repo.find(None, FindOptions::new().sort_by("age").ascending())).unwrap();

    assert_eq!(names(&found), vec!["bob", "alice", "carol"]);
}

#[test]
fn filtered_find_matches_predicate() {
    let repo = seeded();
    let found = block_on(repo.find(
        Some(Filter::gt("age", 26)),
        FindOptions::new().sort_by("age").ascending(),
    ))
    .unwrap();

    assert_eq!(names(&found), vec!["alice", "carol"]);
}

#[test]
fn concatenated_pages_equal_the_full_result() {
    let repo = repo();
    let people: Vec<Person> = (0..7).map(|i| Person::new(&format!("p{i}"), i)).collect();
    block_on(repo.insert_many(&people)).unwrap();

    let everything = block_on(repo.find_all()).unwrap();
    let mut paged = Vec::new();

    for index in 0..4 {
        let page = block_on(repo.find_page(
            None,
            FindOptions::new(),
            PageRequest::new(index, 2),
        ))
        .unwrap();

        assert_eq!(page.total, 7);
        paged.extend(page.items);
    }

    assert_eq!(names(&paged), names(&everything));
}

#[test]
fn page_metadata_reflects_position() {
    let repo = seeded();

    let first = block_on(repo.find_page(None, FindOptions::new(), PageRequest::new(0, 2))).unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.next_page, Some(1));
    assert_eq!(first.previous_page, None);

    let last = block_on(repo.find_page(None, FindOptions::new(), PageRequest::new(1, 2))).unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.next_page, None);
    assert_eq!(last.previous_page, Some(0));
}

#[test]
fn update_sets_fields_and_advances_modified_at() {
    let repo = repo();
    let person = Person::new("alice", 30);
    block_on(repo.insert(&person)).unwrap();

    thread::sleep(Duration::from_millis(10));
    assert!(block_on(repo.update(person.id, [UpdateOp::set("age", 31)])).unwrap());

    let updated = block_on(repo.get(person.id)).unwrap().unwrap();
    assert_eq!(updated.age, 31);
    assert!(updated.modified_at > person.modified_at);
}

#[test]
fn touch_advances_only_the_modification_timestamp() {
    let repo = repo();
    let person = Person::new("alice", 30);
    block_on(repo.insert(&person)).unwrap();

    thread::sleep(Duration::from_millis(10));
    assert!(block_on(repo.touch(person.id)).unwrap());

    let touched = block_on(repo.get(person.id)).unwrap().unwrap();
    assert_eq!(touched.name, person.name);
    assert_eq!(touched.age, person.age);
    assert!(touched.modified_at > person.modified_at);
}

#[test]
fn caller_cannot_pin_the_modification_timestamp() {
    let repo = repo();
    let person = Person::new("alice", 30);
    block_on(repo.insert(&person)).unwrap();

    thread::sleep(Duration::from_millis(10));
    let pinned = DateTime::from_millis(0);
    block_on(repo.update(person.id, [UpdateOp::set("modified_at", pinned)])).unwrap();

    let updated = block_on(repo.get(person.id)).unwrap().unwrap();
    assert!(updated.modified_at > person.modified_at);
}

#[test]
fn update_where_applies_to_every_match() {
    let repo = seeded();

    block_on(repo.update_where(Filter::lt("age", 35), [UpdateOp::set("age", 99)])).unwrap();

    assert_eq!(
        block_on(repo.count_where(Some(Filter::eq("age", 99)))).unwrap(),
        2
    );
}

#[test]
fn update_field_is_single_field_sugar() {
    let repo = repo();
    let person = Person::new("alice", 30);
    block_on(repo.insert(&person)).unwrap();

    assert!(block_on(repo.update_field(person.id, "name", "alicia")).unwrap());
    assert_eq!(
        block_on(repo.get(person.id)).unwrap().unwrap().name,
        "alicia"
    );
}

#[test]
fn replace_overwrites_the_stored_entity() {
    let repo = repo();
    let mut person = Person::new("alice", 30);
    block_on(repo.insert(&person)).unwrap();

    person.name = "alicia".to_string();
    person.age = 31;
    assert!(block_on(repo.replace(&person)).unwrap());

    let replaced = block_on(repo.get(person.id)).unwrap().unwrap();
    assert_eq!(replaced.name, "alicia");
    assert_eq!(replaced.age, 31);
}

#[test]
fn replace_many_overwrites_each_entity() {
    let repo = repo();
    let mut people = vec![Person::new("alice", 30), Person::new("bob", 25)];
    block_on(repo.insert_many(&people)).unwrap();

    for person in &mut people {
        person.age += 1;
    }
    assert!(block_on(repo.replace_many(&people)).unwrap());

    let found = block_on(repo.find(None, FindOptions::new().sort_by("age").ascending())).unwrap();
    assert_eq!(found[0].age, 26);
    assert_eq!(found[1].age, 31);
}

#[test]
fn delete_removes_one_entity_by_identity() {
    let repo = seeded();
    let victim = block_on(repo.first()).unwrap().unwrap();

    assert!(block_on(repo.delete(victim.id)).unwrap());
    assert!(block_on(repo.get(victim.id)).unwrap().is_none());
    assert_eq!(block_on(repo.count()).unwrap(), 2);
}

#[test]
fn delete_where_and_delete_all_clear_matches() {
    let repo = seeded();

    assert!(block_on(repo.delete_where(Filter::gte("age", 30))).unwrap());
    assert_eq!(block_on(repo.count()).unwrap(), 1);

    assert!(block_on(repo.delete_all()).unwrap());
    assert_eq!(block_on(repo.count()).unwrap(), 0);
    assert!(!block_on(repo.any()).unwrap());
}

#[test]
fn any_agrees_with_count() {
    let repo = seeded();

    assert!(block_on(repo.any()).unwrap());
    assert!(block_on(repo.any_where(Some(Filter::eq("name", "bob")))).unwrap());
    assert!(!block_on(repo.any_where(Some(Filter::eq("name", "zed")))).unwrap());
    assert_eq!(block_on(repo.estimated_count()).unwrap(), 3);
}

#[test]
fn index_administration_round_trips() {
    let repo = seeded();

    block_on(repo.create_indexes(&[IndexSpec::unique("name"), IndexSpec::new("age")])).unwrap();
    block_on(repo.drop_index("age")).unwrap();
    block_on(repo.drop_all_indexes()).unwrap();
}

#[test]
fn duplicate_insert_is_rejected() {
    let repo = repo();
    let person = Person::new("alice", 30);

    block_on(repo.insert(&person)).unwrap();
    let result = block_on(repo.insert(&person));

    assert!(matches!(result, Err(RepositoryError::DuplicateIdentity(..))));
}

#[test]
fn collection_binding_comes_from_the_entity_attribute() {
    let repo = repo();

    assert_eq!(repo.collection_name(), "people");
}

#[test]
fn derive_works_through_the_umbrella_crate_path() {
    let notes: Repository<InMemoryStore, Note> = Repository::new(InMemoryStore::new());
    let note = Note {
        id: ObjectId::new(),
        created_at: None,
        modified_at: DateTime::now(),
        body: "remember the milk".to_string(),
    };

    assert_eq!(notes.collection_name(), "notes");
    block_on(notes.insert(&note)).unwrap();
    assert_eq!(
        block_on(notes.get(note.id)).unwrap().unwrap().body,
        "remember the milk"
    );
}

/// Backend decorator that fails the first N find calls with a connectivity
/// error, for observing retry behavior through the facade.
#[derive(Debug)]
struct Flaky {
    inner: InMemoryStore,
    remaining_failures: AtomicU32,
    calls: AtomicU32,
}

impl Flaky {
    fn new(inner: InMemoryStore, failures: u32) -> Self {
        Self {
            inner,
            remaining_failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl StoreBackend for Flaky {
    async fn find_many(
        &self,
        collection: &str,
        query: Query,
    ) -> RepositoryResult<Vec<bson::Bson>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RepositoryError::Connection("connection reset".to_string()));
        }

        self.inner.find_many(collection, query).await
    }

    async fn insert_one(&self, collection: &str, document: bson::Bson) -> RepositoryResult<()> {
        self.inner.insert_one(collection, document).await
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<bson::Bson>,
    ) -> RepositoryResult<()> {
        self.inner.insert_many(collection, documents).await
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Expr,
        document: bson::Bson,
    ) -> RepositoryResult<bool> {
        self.inner.replace_one(collection, filter, document).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Option<Expr>,
        update: UpdateSpec,
    ) -> RepositoryResult<bool> {
        self.inner.update_many(collection, filter, update).await
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: Option<Expr>,
    ) -> RepositoryResult<bool> {
        self.inner.delete_many(collection, filter).await
    }

    async fn count(&self, collection: &str, filter: Option<Expr>) -> RepositoryResult<u64> {
        self.inner.count(collection, filter).await
    }

    async fn estimated_count(&self, collection: &str) -> RepositoryResult<u64> {
        self.inner.estimated_count(collection).await
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> RepositoryResult<()> {
        self.inner.create_index(collection, index).await
    }

    async fn drop_index(&self, collection: &str, field: &str) -> RepositoryResult<()> {
        self.inner.drop_index(collection, field).await
    }

    async fn drop_all_indexes(&self, collection: &str) -> RepositoryResult<()> {
        self.inner.drop_all_indexes(collection).await
    }
}

#[test]
fn transient_failures_are_retried_up_to_three_attempts() {
    let backend = Flaky::new(InMemoryStore::new(), 2);
    let repo: Repository<_, Person> = Repository::new(backend);
    let person = Person::new("alice", 30);

    block_on(repo.insert(&person)).unwrap();
    let found = block_on(repo.get(person.id)).unwrap().unwrap();

    assert_eq!(found.id, person.id);
    assert_eq!(repo.backend().calls.load(Ordering::SeqCst), 3);
}

#[test]
fn persistent_transient_failure_surfaces_after_exhaustion() {
    let backend = Flaky::new(InMemoryStore::new(), u32::MAX);
    let repo: Repository<_, Person> = Repository::new(backend);

    let result = block_on(repo.find_all());

    assert!(matches!(result, Err(RepositoryError::Connection(_))));
    assert_eq!(repo.backend().calls.load(Ordering::SeqCst), 3);
}

#[test]
fn blocking_facade_mirrors_the_async_surface() {
    let repo: BlockingRepository<_, Person> =
        BlockingRepository::new(InMemoryStore::new()).unwrap();
    let person = Person::new("alice", 30);

    repo.insert(&person).unwrap();
    assert_eq!(repo.count().unwrap(), 1);
    assert_eq!(repo.get(person.id).unwrap().unwrap().name, "alice");

    thread::sleep(Duration::from_millis(10));
    assert!(repo.touch(person.id).unwrap());
    assert!(repo.get(person.id).unwrap().unwrap().modified_at > person.modified_at);

    assert!(repo.delete(person.id).unwrap());
    assert!(!repo.any().unwrap());
}
