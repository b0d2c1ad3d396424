use fetchkit::{
    AmbiguityPolicy, EntityDef, FetchRequest, InMemoryObjectStore, Lifecycle, ObjectStore,
    RelationKind, Resolver, ResolverConfig, Schema, StoreError, Value, ValueKind,
};

fn library_schema() -> Schema {
    Schema::new()
        .entity(
            EntityDef::new("track")
                .field("isrc", ValueKind::String)
                .field("title", ValueKind::String)
                .relation("tags", RelationKind::Set, "tag")
                .relation("credits", RelationKind::OrderedSet, "artist"),
        )
        .entity(
            EntityDef::new("tag")
                .field("name", ValueKind::String)
                .field("weight", ValueKind::Int)
                .field("score", ValueKind::Float),
        )
        .entity(EntityDef::new("artist").field("name", ValueKind::String))
}

#[test]
fn resolve_one_is_idempotent_until_delete() {
    let store = InMemoryObjectStore::new(library_schema());
    let resolver = Resolver::new();

    let first = resolver
        .resolve_one(&store, "track", "isrc", Value::from("USRC17607839"))
        .unwrap();
    let second = resolver
        .resolve_one(&store, "track", "isrc", Value::from("USRC17607839"))
        .unwrap();
    assert_eq!(first, second);

    resolver.save_changes(&store).unwrap();
    let third = resolver
        .resolve_one(&store, "track", "isrc", Value::from("USRC17607839"))
        .unwrap();
    assert_eq!(first, third);

    resolver.delete_record(&store, &first).unwrap();
    resolver.save_changes(&store).unwrap();
    let fourth = resolver
        .resolve_one(&store, "track", "isrc", Value::from("USRC17607839"))
        .unwrap();
    assert_ne!(first, fourth);
}

#[test]
fn bulk_resolution_creates_no_duplicates_within_one_call() {
    let store = InMemoryObjectStore::new(library_schema());
    let resolver = Resolver::new();

    // V = [7, 3, 7] with nothing pre-existing: exactly two new records.
    let results = resolver
        .resolve_many(
            &store,
            "tag",
            "weight",
            &[Value::Int(7), Value::Int(3), Value::Int(7)],
        )
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0], results[2]);
    assert_ne!(results[0], results[1]);

    let all = store.fetch(&FetchRequest::new("tag")).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn bulk_resolution_treats_signed_zeros_as_one_key() {
    let store = InMemoryObjectStore::new(library_schema());
    let resolver = Resolver::new();

    // 0.0 and -0.0 compare equal as floats, so they are one candidate key.
    let results = resolver
        .resolve_many(
            &store,
            "tag",
            "score",
            &[Value::Float(0.0), Value::Float(-0.0)],
        )
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0], results[1]);
    assert_eq!(store.fetch(&FetchRequest::new("tag")).unwrap().len(), 1);

    // A later single lookup of either zero finds that record, not ambiguity.
    let again = resolver
        .resolve_one(&store, "tag", "score", Value::Float(-0.0))
        .unwrap();
    assert_eq!(again, results[0]);
}

#[test]
fn bulk_resolution_mixes_existing_and_created() {
    let store = InMemoryObjectStore::new(library_schema());
    let resolver = Resolver::new();

    let jazz = resolver
        .resolve_one(&store, "tag", "name", Value::from("jazz"))
        .unwrap();
    resolver.save_changes(&store).unwrap();

    let results = resolver
        .resolve_many(
            &store,
            "tag",
            "name",
            &[
                Value::from("bebop"),
                Value::from("jazz"),
                Value::from("modal"),
                Value::from("jazz"),
            ],
        )
        .unwrap();

    assert_eq!(results.len(), 4);
    assert_eq!(results[1], jazz);
    assert_eq!(results[3], jazz);
    assert_eq!(store.fetch(&FetchRequest::new("tag")).unwrap().len(), 3);
}

#[test]
fn deleted_record_is_absent_from_later_matches() {
    let store = InMemoryObjectStore::new(library_schema());
    let resolver = Resolver::new();

    let record = resolver
        .resolve_one(&store, "tag", "name", Value::from("ephemeral"))
        .unwrap();
    resolver.save_changes(&store).unwrap();

    resolver.delete_record(&store, &record).unwrap();
    resolver.save_changes(&store).unwrap();
    assert_eq!(store.lifecycle(&record).unwrap(), Lifecycle::Deleted);

    let results = resolver
        .resolve_many(&store, "tag", "name", &[Value::from("ephemeral")])
        .unwrap();
    assert_ne!(results[0], record);
    assert_eq!(store.lifecycle(&results[0]).unwrap(), Lifecycle::Transient);
}

#[test]
fn rollback_one_restores_prior_value_and_spares_other_records() {
    let store = InMemoryObjectStore::new(library_schema());
    let resolver = Resolver::new();

    let a = resolver
        .resolve_one(&store, "tag", "name", Value::from("a"))
        .unwrap();
    let b = resolver
        .resolve_one(&store, "tag", "name", Value::from("b"))
        .unwrap();
    resolver.save_changes(&store).unwrap();

    resolver
        .set_property(&store, &a, "weight", Value::Int(1))
        .unwrap();
    resolver
        .set_property(&store, &b, "weight", Value::Int(2))
        .unwrap();

    resolver.rollback_one(&store, &a).unwrap();

    assert_eq!(
        resolver.get_property(&store, &a, "weight").unwrap(),
        Value::Null
    );
    // b's pending edit is untouched.
    assert_eq!(
        resolver.get_property(&store, &b, "weight").unwrap(),
        Value::Int(2)
    );
}

#[test]
fn refresh_merge_semantics() {
    let store = InMemoryObjectStore::new(library_schema());
    let resolver = Resolver::new();

    let record = resolver
        .resolve_one(&store, "track", "isrc", Value::from("X"))
        .unwrap();
    resolver
        .set_property(&store, &record, "title", Value::from("committed"))
        .unwrap();
    resolver.save_changes(&store).unwrap();

    resolver
        .set_property(&store, &record, "title", Value::from("edited"))
        .unwrap();
    resolver.refresh(&store, &record, true).unwrap();
    assert_eq!(
        resolver.get_property(&store, &record, "title").unwrap(),
        Value::from("edited")
    );

    resolver.refresh(&store, &record, false).unwrap();
    assert_eq!(
        resolver.get_property(&store, &record, "title").unwrap(),
        Value::from("committed")
    );
}

#[test]
fn batch_relation_mutation_equals_sequential_for_all_n() {
    let store = InMemoryObjectStore::new(library_schema());
    let resolver = Resolver::new();

    for n in 0..4usize {
        let batch_track = store.create("track").unwrap();
        let loop_track = store.create("track").unwrap();

        let artists: Vec<_> = (0..n)
            .map(|i| {
                resolver
                    .resolve_one(&store, "artist", "name", Value::from(format!("artist-{n}-{i}")))
                    .unwrap()
            })
            .collect();

        resolver
            .add_related(&store, &batch_track, "credits", &artists)
            .unwrap();
        for artist in &artists {
            resolver
                .add_one_related(&store, &loop_track, "credits", artist)
                .unwrap();
        }

        assert_eq!(
            store.relation_members(&batch_track, "credits").unwrap(),
            store.relation_members(&loop_track, "credits").unwrap(),
            "batch and sequential membership diverge for n = {n}"
        );
    }
}

#[test]
fn ordered_relation_preserves_insertion_order_across_save() {
    let store = InMemoryObjectStore::new(library_schema());
    let resolver = Resolver::new();

    let track = store.create("track").unwrap();
    let credits = resolver
        .resolve_many(
            &store,
            "artist",
            "name",
            &[Value::from("davis"), Value::from("evans"), Value::from("coltrane")],
        )
        .unwrap();
    resolver
        .add_related(&store, &track, "credits", &credits)
        .unwrap();
    resolver.save_changes(&store).unwrap();

    let expected: Vec<_> = credits.iter().map(fetchkit::Record::id).collect();
    assert_eq!(store.relation_members(&track, "credits").unwrap(), expected);

    resolver
        .remove_one_related(&store, &track, "credits", &credits[1])
        .unwrap();
    resolver.save_changes(&store).unwrap();
    assert_eq!(
        store.relation_members(&track, "credits").unwrap(),
        vec![expected[0], expected[2]]
    );
}

#[test]
fn failed_save_leaves_pending_set_unchanged() {
    let store = InMemoryObjectStore::new(library_schema());
    let resolver = Resolver::new();

    let record = resolver
        .resolve_one(&store, "tag", "name", Value::from("pending"))
        .unwrap();
    store.inject_commit_fault("simulated device loss").unwrap();

    let err = resolver.save_changes(&store).unwrap_err();
    assert!(err.is_commit());
    assert_eq!(store.pending_count().unwrap(), 1);
    assert_eq!(store.lifecycle(&record).unwrap(), Lifecycle::Transient);

    // Caller chose retry; the record commits this time.
    resolver.save_changes(&store).unwrap();
    assert_eq!(store.lifecycle(&record).unwrap(), Lifecycle::Persisted);
}

#[test]
fn closed_store_surfaces_unavailable() {
    let store = InMemoryObjectStore::new(library_schema());
    let resolver = Resolver::new();
    store.close().unwrap();

    assert!(matches!(
        resolver.resolve_one(&store, "tag", "name", Value::from("x")),
        Err(StoreError::Unavailable { .. })
    ));
    assert!(matches!(
        resolver.resolve_many(&store, "tag", "name", &[Value::from("x")]),
        Err(StoreError::Unavailable { .. })
    ));
}

#[test]
fn ambiguity_policies_disagree_on_duplicate_keys() {
    let store = InMemoryObjectStore::new(library_schema());

    let first = store.create("tag").unwrap();
    store.set_field(&first, "name", Value::from("dup")).unwrap();
    let second = store.create("tag").unwrap();
    store
        .set_field(&second, "name", Value::from("dup"))
        .unwrap();
    store.save().unwrap();

    let lenient = Resolver::new();
    let resolved = lenient
        .resolve_one(&store, "tag", "name", Value::from("dup"))
        .unwrap();
    assert_eq!(resolved, first); // first in store (creation) order

    let strict = Resolver::with_config(ResolverConfig {
        ambiguity: AmbiguityPolicy::Reject,
    });
    assert!(matches!(
        strict.resolve_one(&store, "tag", "name", Value::from("dup")),
        Err(StoreError::AmbiguousMatch { matches: 2, .. })
    ));
}
