//! Relation Resolution Performance Benchmarks
//!
//! Measures foreign key inference, effective relation folding across a type
//! hierarchy, and direct vs. through has-many resolution.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use docrel_orm::{
    humanize, Collection, Document, FindOptions, MemoryCollection, ModelType, RelationDescription,
    RelationRegistry, Selector,
};
use serde_json::json;

struct World {
    company: Arc<ModelType>,
    companies: Arc<MemoryCollection>,
}

fn generate_world(accounts_per_company: usize) -> World {
    let registry = Arc::new(RelationRegistry::new());
    let companies = Arc::new(MemoryCollection::new("companies"));
    let accounts = Arc::new(MemoryCollection::new("accounts"));
    let transactions = Arc::new(MemoryCollection::new("transactions"));

    for company in 0..10 {
        companies
            .insert_value(json!({ "_id": format!("company_{}", company) }))
            .unwrap();
        for account in 0..accounts_per_company {
            let id = format!("account_{}_{}", company, account);
            accounts
                .insert_value(json!({ "_id": id, "ownerId": format!("company_{}", company) }))
                .unwrap();
            transactions
                .insert_value(json!({ "targetAccountId": id, "amount": account }))
                .unwrap();
        }
    }

    let company = ModelType::builder("Company")
        .collection(companies.clone())
        .registry(registry)
        .build();
    company
        .has_many(
            "accounts",
            RelationDescription::to(accounts.clone()).foreign_key("owner"),
        )
        .unwrap();
    company
        .has_many(
            "incomingTransactions",
            RelationDescription::to(transactions)
                .through_collection(accounts)
                .through_foreign_key("owner")
                .foreign_key("targetAccountId"),
        )
        .unwrap();
    companies.bind_model(&company).unwrap();

    World { company, companies }
}

fn source(world: &World) -> Document {
    world
        .companies
        .find_one(&Selector::by_id("company_3"), &FindOptions::new())
        .unwrap()
        .unwrap()
}

fn bench_name_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("name_derivation");

    group.bench_function("humanize_memoized", |b| {
        b.iter(|| humanize(black_box("incomingTransactions")))
    });

    let world = generate_world(1);
    let accounts = world.company.has_many_relation("accounts").unwrap();
    group.bench_function("infer_foreign_key", |b| {
        b.iter(|| black_box(accounts.foreign_key().unwrap()))
    });

    group.finish();
}

fn bench_effective_relations(c: &mut Criterion) {
    let mut group = c.benchmark_group("effective_relations");

    for depth in [1usize, 4, 16] {
        let world = generate_world(1);
        let mut model = world.company.clone();
        for level in 0..depth {
            model = model.extend(format!("Level{}", level)).build();
        }

        group.bench_with_input(BenchmarkId::new("hierarchy_depth", depth), &model, |b, model| {
            b.iter(|| black_box(model.relations().len()))
        });
    }

    group.finish();
}

fn bench_has_many_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("has_many_resolution");

    for accounts_per_company in [10usize, 100] {
        let world = generate_world(accounts_per_company);
        let tyrell = source(&world);

        group.bench_with_input(
            BenchmarkId::new("direct", accounts_per_company),
            &tyrell,
            |b, company| {
                b.iter(|| {
                    let accounts = company.has_many_relation("accounts").unwrap();
                    black_box(accounts.find().unwrap().count())
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("through", accounts_per_company),
            &tyrell,
            |b, company| {
                b.iter(|| {
                    let incoming = company.has_many_relation("incomingTransactions").unwrap();
                    black_box(incoming.find().unwrap().count())
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_name_derivation,
    bench_effective_relations,
    bench_has_many_resolution
);
criterion_main!(benches);
