//! Performance benchmarks for Relata core operations
//!
//! Run with: `cargo bench -p relata-core`
//!
//! These benchmarks measure critical path performance:
//! - Place renumbering and next-place arithmetic
//! - Relationship creation with sibling renumbering (N authors)
//! - Relationship metadata projection for a heavily related item

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use relata_core::db::{MetadataFieldStore, PlaceOrderCalculator};
use relata_core::{
    ContentServices, Context, EntityType, Item, MetadataField, NewRelationship, RelationshipType,
    RepositoryConfig, Tilted,
};
use serde_json::json;
use tokio::runtime::Runtime;

fn author_type() -> RelationshipType {
    RelationshipType {
        id: 0,
        left_type: EntityType::new(0, "Publication"),
        right_type: EntityType::new(0, "Person"),
        leftward_type: "isAuthorOfPublication".to_string(),
        rightward_type: "isPublicationOfAuthor".to_string(),
        left_min_cardinality: None,
        left_max_cardinality: None,
        right_min_cardinality: None,
        right_max_cardinality: None,
        copy_to_left: false,
        copy_to_right: false,
        tilted: Tilted::None,
    }
}

fn config() -> RepositoryConfig {
    RepositoryConfig::from_json(
        &json!({
            "virtualMetadata": {
                "isAuthorOfPublication": {
                    "dc.contributor.author": {
                        "type": "concatenate",
                        "fields": ["person.familyName", "person.givenName"],
                        "useForPlace": true
                    }
                }
            }
        })
        .to_string(),
    )
    .unwrap()
}

async fn create_item(services: &ContentServices, metadata: &[(&str, &str)]) -> Item {
    let mut item = Item::new();
    for (key, value) in metadata {
        services
            .store
            .register_field(MetadataField::parse(key).unwrap())
            .await
            .unwrap();
        item.add_metadata(key, *value).unwrap();
    }
    services.items.create(item).await.unwrap()
}

/// Publication with `authors` related persons
async fn setup_publication(authors: usize) -> (ContentServices, Item) {
    let services = ContentServices::in_memory(config()).await.unwrap();
    let rt = services
        .register_relationship_type(author_type())
        .await
        .unwrap();
    let context = Context::anonymous();
    let _bypass = context.turn_off_authorization();

    let publication = create_item(&services, &[("dspace.entity.type", "Publication")]).await;
    for i in 0..authors {
        let family = format!("Author{}", i);
        let person = create_item(
            &services,
            &[
                ("dspace.entity.type", "Person"),
                ("person.familyName", family.as_str()),
                ("person.givenName", "Test"),
            ],
        )
        .await;
        services
            .relationships
            .create(
                &context,
                NewRelationship::new(rt.clone(), publication.id, person.id),
            )
            .await
            .unwrap();
    }
    (services, publication)
}

fn bench_place_arithmetic(c: &mut Criterion) {
    let places: Vec<i32> = (0..1000).rev().map(|i| i * 2).collect();

    c.bench_function("renumbering_order_1000", |b| {
        b.iter(|| PlaceOrderCalculator::renumbering_order(black_box(&places)))
    });

    c.bench_function("next_place_1000", |b| {
        b.iter(|| PlaceOrderCalculator::next_place(black_box(places.iter().copied())))
    });
}

fn bench_create_with_siblings(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("create_relationship");

    for authors in [10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(authors), &authors, |b, &authors| {
            b.iter(|| rt.block_on(setup_publication(black_box(authors))))
        });
    }
    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (services, publication) = rt.block_on(setup_publication(100));

    c.bench_function("get_relationship_metadata_100_authors", |b| {
        b.iter(|| {
            rt.block_on(async {
                services
                    .relationship_metadata
                    .get_relationship_metadata(black_box(&publication), true)
                    .await
                    .unwrap()
            })
        })
    });
}

criterion_group!(
    benches,
    bench_place_arithmetic,
    bench_create_with_siblings,
    bench_projection
);
criterion_main!(benches);
