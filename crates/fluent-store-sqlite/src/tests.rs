//! Integration tests for `SqliteClient` with the ledger and the model runtime
//! against an in-memory database.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fluent_core::{
  ColumnType, DatabaseClient, Entity, Error, LEDGER_TABLE, Migration, Migrator, ModelDefinition,
  Registry, Rollback, Row, Runtime, SchemaDescriptor, SchemaMigration, Value,
  schema::OnDelete,
};

use crate::SqliteClient;

async fn client() -> Arc<SqliteClient> {
  Arc::new(
    SqliteClient::open_in_memory()
      .await
      .expect("in-memory client"),
  )
}

fn row(pairs: &[(&str, Value)]) -> Row {
  pairs
    .iter()
    .map(|(k, v)| ((*k).to_owned(), v.clone()))
    .collect()
}

// ─── Blog fixture ────────────────────────────────────────────────────────────

fn create_categories() -> Box<dyn Migration> {
  SchemaMigration::new("Categories1700000000001")
    .up(SchemaDescriptor::create_table("categories", |t| {
      t.id();
      t.string("name", 120).not_null();
    }))
    .down(SchemaDescriptor::drop_table("categories"))
    .boxed()
}

fn create_articles() -> Box<dyn Migration> {
  SchemaMigration::new("Articles1700000000002")
    .up(SchemaDescriptor::create_table("articles", |t| {
      t.id();
      t.string("title", 200).not_null();
      t.boolean("published").not_null().default(false);
      t.foreign_id("category_id")
        .references("categories", "id")
        .on_delete(OnDelete::Cascade);
      t.timestamps();
    }))
    .down(SchemaDescriptor::drop_table("articles"))
    .boxed()
}

fn create_tags() -> Box<dyn Migration> {
  SchemaMigration::new("Tags1700000000003")
    .up(SchemaDescriptor::create_table("tags", |t| {
      t.id();
      t.string("label", 40).not_null().unique();
    }))
    .down(SchemaDescriptor::drop_table("tags"))
    .boxed()
}

fn create_article_tag() -> Box<dyn Migration> {
  SchemaMigration::new("ArticleTag1700000000004")
    .up(SchemaDescriptor::create_table("article_tag", |t| {
      t.foreign_id("article_id")
        .not_null()
        .references("articles", "id")
        .on_delete(OnDelete::Cascade);
      t.foreign_id("tag_id")
        .not_null()
        .references("tags", "id")
        .on_delete(OnDelete::Cascade);
    }))
    .down(SchemaDescriptor::drop_table("article_tag"))
    .boxed()
}

fn blog_migrations() -> Vec<Box<dyn Migration>> {
  vec![create_categories(), create_articles(), create_tags(), create_article_tag()]
}

fn blog_models() -> Registry {
  Registry::new(vec![
    ModelDefinition::new("categories")
      .property("name", ColumnType::String(120))
      .has_many("articles", "articles")
      .has_one("feature", "articles"),
    ModelDefinition::new("articles")
      .property("title", ColumnType::String(200))
      .property("published", ColumnType::Boolean)
      .property("category_id", ColumnType::Integer)
      .timestamps()
      .belongs_to("category", "categories")
      .many_to_many("tags", "tags"),
    ModelDefinition::new("tags")
      .property("label", ColumnType::String(40))
      .many_to_many("articles", "articles"),
  ])
  .expect("blog registry")
}

/// Migrated blog database with two categories, four articles and three tags.
///
/// Category 1 owns articles 1–3, category 2 owns article 4. Article 1 is
/// tagged `rust` and `sql`, article 2 only `sql`.
async fn blog() -> Runtime<SqliteClient> {
  let client = client().await;
  Migrator::new(Arc::clone(&client), blog_migrations())
    .unwrap()
    .run()
    .await
    .unwrap();
  let runtime = Runtime::new(client, blog_models());

  let categories = runtime.model("categories").unwrap();
  for name in ["Systems", "Databases"] {
    categories.create(row(&[("name", Value::from(name))])).await.unwrap();
  }
  let articles = runtime.model("articles").unwrap();
  for (title, category) in [("Ownership", 1), ("Lifetimes", 1), ("Traits", 1), ("Indexes", 2)] {
    articles
      .create(row(&[
        ("title", Value::from(title)),
        ("category_id", Value::from(category)),
      ]))
      .await
      .unwrap();
  }
  let tags = runtime.model("tags").unwrap();
  for label in ["rust", "sql", "async"] {
    tags.create(row(&[("label", Value::from(label))])).await.unwrap();
  }
  for (article, tag) in [(1, 1), (1, 2), (2, 2)] {
    runtime
      .client()
      .execute(&fluent_core::Statement::Insert {
        table:  "article_tag".into(),
        values: row(&[("article_id", Value::from(article)), ("tag_id", Value::from(tag))]),
      })
      .await
      .unwrap();
  }
  runtime
}

fn titles(entities: &[Entity]) -> Vec<&str> {
  entities
    .iter()
    .filter_map(|e| e.value("title").and_then(Value::as_str))
    .collect()
}

// ─── Migration ledger ────────────────────────────────────────────────────────

#[tokio::test]
async fn run_then_rollback_leaves_table_absent() {
  let client = client().await;
  let migrator = Migrator::new(Arc::clone(&client), vec![create_categories()]).unwrap();

  let report = migrator.run().await.unwrap();
  assert_eq!(report.batch, Some(1));
  assert_eq!(client.table_columns("categories").await.unwrap(), ["id", "name"]);

  let outcome = migrator.rollback().await.unwrap();
  assert_eq!(outcome, Rollback::Batch {
    batch:    1,
    reverted: vec!["Categories1700000000001".into()],
  });
  assert!(client.table_columns("categories").await.unwrap().is_empty());
  assert!(migrator.applied().await.unwrap().is_empty());
}

#[tokio::test]
async fn ledger_table_has_exactly_four_columns() {
  let client = client().await;
  Migrator::new(Arc::clone(&client), Vec::new())
    .unwrap()
    .ensure_ledger()
    .await
    .unwrap();
  assert_eq!(client.table_columns(LEDGER_TABLE).await.unwrap(), [
    "id",
    "name",
    "batch",
    "migration_time"
  ]);
}

#[tokio::test]
async fn one_run_shares_a_batch_and_the_next_run_increments_it() {
  let client = client().await;
  Migrator::new(Arc::clone(&client), vec![create_categories(), create_articles()])
    .unwrap()
    .run()
    .await
    .unwrap();

  let migrator = Migrator::new(Arc::clone(&client), vec![
    create_categories(),
    create_articles(),
    create_tags(),
  ])
  .unwrap();
  let report = migrator.run().await.unwrap();
  assert_eq!(report.applied, ["Tags1700000000003"]);

  let records = migrator.applied().await.unwrap();
  let batches: Vec<i64> = records.iter().map(|r| r.batch).collect();
  assert_eq!(batches, [1, 1, 2]);
  assert_eq!(records[0].applied_at, records[1].applied_at);

  // Nothing left to do.
  assert_eq!(migrator.run().await.unwrap().batch, None);
  assert!(migrator.pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn fresh_reapplies_everything_as_batch_one() {
  let client = client().await;
  Migrator::new(Arc::clone(&client), vec![create_categories()])
    .unwrap()
    .run()
    .await
    .unwrap();
  let migrator = Migrator::new(Arc::clone(&client), blog_migrations()).unwrap();
  migrator.run().await.unwrap();

  let report = migrator.fresh().await.unwrap();
  assert_eq!(report.reverted.len(), 4);
  assert_eq!(report.run.applied.len(), 4);

  let records = migrator.applied().await.unwrap();
  assert_eq!(records.len(), 4);
  assert!(records.iter().all(|r| r.batch == 1));
}

#[tokio::test]
async fn status_lists_registered_migrations_in_order() {
  let client = client().await;
  Migrator::new(Arc::clone(&client), vec![create_categories()])
    .unwrap()
    .run()
    .await
    .unwrap();

  let migrator = Migrator::new(Arc::clone(&client), blog_migrations()).unwrap();
  let status = migrator.status().await.unwrap();
  let names: Vec<&str> = status.iter().map(|s| s.name.as_str()).collect();
  assert_eq!(names, [
    "Categories1700000000001",
    "Articles1700000000002",
    "Tags1700000000003",
    "ArticleTag1700000000004",
  ]);
  assert!(status[0].is_applied());
  assert_eq!(status[0].record.as_ref().map(|r| r.batch), Some(1));
  assert!(status[1..].iter().all(|s| !s.is_applied()));
  assert_eq!(status[1].to_string(), "Articles1700000000002  pending");

  assert_eq!(migrator.pending().await.unwrap(), [
    "Articles1700000000002",
    "Tags1700000000003",
    "ArticleTag1700000000004",
  ]);
}

#[tokio::test]
async fn rollback_of_empty_ledger_reports_nothing() {
  let migrator = Migrator::new(client().await, blog_migrations()).unwrap();
  assert_eq!(migrator.rollback().await.unwrap(), Rollback::Nothing);
}

#[tokio::test]
async fn failed_migration_keeps_earlier_ones_applied() {
  let client = client().await;
  let broken = SchemaMigration::new("Broken1700000000009")
    .up(SchemaDescriptor::drop_table("does_not_exist"))
    .down(SchemaDescriptor::drop_table_if_exists("does_not_exist"))
    .boxed();
  let migrator =
    Migrator::new(Arc::clone(&client), vec![create_categories(), broken, create_tags()]).unwrap();

  let err = migrator.run().await.unwrap_err();
  assert!(matches!(
    err,
    Error::MigrationFailed { ref name, ref completed, .. }
      if name == "Broken1700000000009" && completed == &["Categories1700000000001"]
  ));

  let status = migrator.status().await.unwrap();
  let applied: Vec<bool> = status.iter().map(|s| s.is_applied()).collect();
  assert_eq!(applied, [true, false, false]);
  assert!(!client.table_columns("categories").await.unwrap().is_empty());
  assert!(client.table_columns("tags").await.unwrap().is_empty());
}

#[tokio::test]
async fn rename_column_and_table() {
  let client = client().await;
  Migrator::new(Arc::clone(&client), vec![create_categories()])
    .unwrap()
    .run()
    .await
    .unwrap();
  let migrator = Migrator::new(Arc::clone(&client), vec![
    create_categories(),
    SchemaMigration::new("RenameCategories1700000000005")
      .up(SchemaDescriptor::alter_table("categories", |a| {
        a.rename_column("name", "title");
      }))
      .up(SchemaDescriptor::rename_table("categories", "sections"))
      .down(SchemaDescriptor::rename_table("sections", "categories"))
      .down(SchemaDescriptor::alter_table("categories", |a| {
        a.rename_column("title", "name");
      }))
      .boxed(),
  ])
  .unwrap();

  assert_eq!(migrator.run().await.unwrap().batch, Some(2));
  assert_eq!(client.table_columns("sections").await.unwrap(), ["id", "title"]);

  migrator.rollback().await.unwrap();
  assert_eq!(client.table_columns("categories").await.unwrap(), ["id", "name"]);
}

#[tokio::test]
async fn add_column_then_drop_it() {
  let client = client().await;
  Migrator::new(Arc::clone(&client), vec![create_tags()])
    .unwrap()
    .run()
    .await
    .unwrap();
  let migrator = Migrator::new(Arc::clone(&client), vec![
    create_tags(),
    SchemaMigration::new("TagColour1700000000006")
      .up(SchemaDescriptor::alter_table("tags", |a| {
        a.add_column("colour", ColumnType::String(7)).default("#000000");
      }))
      .down(SchemaDescriptor::alter_table("tags", |a| {
        a.drop_column("colour");
      }))
      .boxed(),
  ])
  .unwrap();

  assert_eq!(migrator.run().await.unwrap().batch, Some(2));
  assert_eq!(client.table_columns("tags").await.unwrap(), ["id", "label", "colour"]);
  migrator.rollback().await.unwrap();
  assert_eq!(client.table_columns("tags").await.unwrap(), ["id", "label"]);
}

#[tokio::test]
async fn rebuild_adds_foreign_key_and_not_null_keeping_rows() {
  let client = client().await;
  let loose = SchemaMigration::new("Comments1700000000007")
    .up(SchemaDescriptor::create_table("comments", |t| {
      t.id();
      t.text("body");
      t.foreign_id("category_id");
    }))
    .down(SchemaDescriptor::drop_table("comments"))
    .boxed();
  Migrator::new(Arc::clone(&client), vec![create_categories(), loose])
    .unwrap()
    .run()
    .await
    .unwrap();

  let runtime = Runtime::new(
    Arc::clone(&client),
    Registry::new(vec![
      ModelDefinition::new("categories").property("name", ColumnType::String(120)),
      ModelDefinition::new("comments")
        .property("body", ColumnType::Text)
        .property("category_id", ColumnType::Integer),
    ])
    .unwrap(),
  );
  runtime
    .model("categories")
    .unwrap()
    .create(row(&[("name", Value::from("General"))]))
    .await
    .unwrap();
  let comments = runtime.model("comments").unwrap();
  comments
    .create(row(&[("body", Value::from("first")), ("category_id", Value::from(1))]))
    .await
    .unwrap();

  let tighten = SchemaMigration::new("TightenComments1700000000008")
    .up(SchemaDescriptor::alter_table("comments", |a| {
      a.set_not_null("body");
      a.foreign_key("category_id", "categories", "id", OnDelete::Cascade);
    }))
    .down(SchemaDescriptor::drop_table("comments"))
    .boxed();
  Migrator::new(Arc::clone(&client), vec![
    create_categories(),
    SchemaMigration::new("Comments1700000000007").boxed(),
    tighten,
  ])
  .unwrap()
  .run()
  .await
  .unwrap();

  // Existing rows survive the rebuild.
  let all = comments.all().await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].value("body"), Some(&Value::from("first")));

  // NOT NULL is enforced.
  let err = comments
    .create(row(&[("body", Value::Null), ("category_id", Value::from(1))]))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Database(_)));

  // The foreign key is enforced.
  let err = comments
    .create(row(&[("body", Value::from("orphan")), ("category_id", Value::from(42))]))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Database(_)));
}

// ─── Finders and writes ──────────────────────────────────────────────────────

#[tokio::test]
async fn find_or_fail_on_missing_row() {
  let runtime = blog().await;
  let articles = runtime.model("articles").unwrap();

  assert!(articles.find(999).await.unwrap().is_none());
  let err = articles.find_or_fail(999).await.unwrap_err();
  assert!(matches!(err, Error::NotFound { ref table, .. } if table == "articles"));

  let found = articles.find_by_or_fail("title", "Traits").await.unwrap();
  assert_eq!(found.id().unwrap(), &Value::Integer(3));
  assert_eq!(articles.first_or_fail().await.unwrap().id().unwrap(), &Value::Integer(1));
}

#[tokio::test]
async fn first_or_fail_on_empty_table() {
  let client = client().await;
  Migrator::new(Arc::clone(&client), vec![create_tags()])
    .unwrap()
    .run()
    .await
    .unwrap();
  let runtime = Runtime::new(
    client,
    Registry::new(vec![ModelDefinition::new("tags").property("label", ColumnType::Text)]).unwrap(),
  );
  let tags = runtime.model("tags").unwrap();
  assert!(tags.first().await.unwrap().is_none());
  assert!(matches!(tags.first_or_fail().await, Err(Error::NotFound { .. })));
}

#[tokio::test]
async fn create_fills_timestamps_and_defaults() {
  let runtime = blog().await;
  let articles = runtime.model("articles").unwrap();
  let definition = articles.definition();

  let article = articles.find_or_fail(1).await.unwrap();
  let created = definition.accessor::<DateTime<Utc>>("created_at").unwrap();
  let published = definition.accessor::<bool>("published").unwrap();
  assert!(article.get(&created).unwrap() <= Utc::now());
  assert!(!article.get(&published).unwrap());
}

#[tokio::test]
async fn update_refreshes_snapshot_and_delete_is_terminal() {
  let runtime = blog().await;
  let articles = runtime.model("articles").unwrap();
  let mut article = articles.find_or_fail(2).await.unwrap();
  let before = article.value("updated_at").cloned();

  articles
    .update(&mut article, row(&[("title", Value::from("Borrowing")), ("published", Value::from(true))]))
    .await
    .unwrap();
  assert_eq!(article.value("title"), Some(&Value::from("Borrowing")));
  assert_ne!(article.value("updated_at").cloned(), before);

  let stored = articles.find_or_fail(2).await.unwrap();
  assert_eq!(stored.value("title"), Some(&Value::from("Borrowing")));
  assert_eq!(stored.value("published"), Some(&Value::Integer(1)));

  articles.delete(&mut article).await.unwrap();
  assert!(article.is_deleted());
  assert!(articles.find(2).await.unwrap().is_none());
  assert!(matches!(
    articles.update(&mut article, Row::new()).await,
    Err(Error::Deleted(_))
  ));
}

#[tokio::test]
async fn deleting_a_tagged_article_cascades_to_the_pivot() {
  let runtime = blog().await;
  let articles = runtime.model("articles").unwrap();
  let mut ownership = articles.find_or_fail(1).await.unwrap();
  articles.delete(&mut ownership).await.unwrap();

  let links = runtime
    .client()
    .execute(&fluent_core::Statement::Select(fluent_core::Query::table("article_tag")))
    .await
    .unwrap();
  assert_eq!(links.len(), 1);
  assert_eq!(links[0].get("article_id"), Some(&Value::from(2)));
}

#[tokio::test]
async fn partial_model_updates_its_declared_columns() {
  let runtime = blog().await;

  // A model exposing a subset of the `articles` table.
  let narrow = Runtime::new(
    Arc::new(runtime.client().clone()),
    Registry::new(vec![
      ModelDefinition::new("articles").property("title", ColumnType::String(200)),
    ])
    .unwrap(),
  );
  let articles = narrow.model("articles").unwrap();
  let mut article = articles.create(row(&[("title", Value::from("Drafts"))])).await.unwrap();
  assert!(article.value("category_id").is_some());

  articles
    .update(&mut article, row(&[("title", Value::from("Final"))]))
    .await
    .unwrap();
  assert_eq!(article.value("title"), Some(&Value::from("Final")));

  // Undeclared columns are still rejected when they are actually changed.
  let err = articles
    .update(&mut article, row(&[("category_id", Value::from(2))]))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Lookup { ref column, .. } if column == "category_id"));
}

#[tokio::test]
async fn failing_before_save_leaves_row_untouched() {
  let client = client().await;
  Migrator::new(Arc::clone(&client), vec![create_tags()])
    .unwrap()
    .run()
    .await
    .unwrap();
  let runtime = Runtime::new(
    client,
    Registry::new(vec![
      ModelDefinition::new("tags")
        .property("label", ColumnType::String(40))
        .before_save(|row: &mut Row| {
          match row.get("label").and_then(Value::as_str) {
            Some(label) if label.len() > 10 => Err("label too long".into()),
            _ => Ok(()),
          }
        }),
    ])
    .unwrap(),
  );
  let tags = runtime.model("tags").unwrap();
  let mut tag = tags.create(row(&[("label", Value::from("rust"))])).await.unwrap();

  let err = tags
    .update(&mut tag, row(&[("label", Value::from("much-too-long-label"))]))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Hook { .. }));
  assert_eq!(tag.value("label"), Some(&Value::from("rust")));
  let stored = tags.find_or_fail(1).await.unwrap();
  assert_eq!(stored.value("label"), Some(&Value::from("rust")));
}

// ─── Relations ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn has_many_returns_matches_in_stored_order() {
  let runtime = blog().await;
  let categories = runtime.model("categories").unwrap();
  let systems = categories.find_or_fail(1).await.unwrap();

  let articles = categories.related(&systems, "articles").await.unwrap();
  assert_eq!(titles(articles.many()), ["Ownership", "Lifetimes", "Traits"]);
}

#[tokio::test]
async fn lazy_relations_query_on_every_access() {
  let runtime = blog().await;
  let categories = runtime.model("categories").unwrap();
  let systems = categories.find_or_fail(1).await.unwrap();
  assert_eq!(categories.related(&systems, "articles").await.unwrap().len(), 3);

  runtime
    .model("articles")
    .unwrap()
    .create(row(&[("title", Value::from("Macros")), ("category_id", Value::from(1))]))
    .await
    .unwrap();

  let articles = categories.related(&systems, "articles").await.unwrap();
  assert_eq!(titles(articles.many()), ["Ownership", "Lifetimes", "Traits", "Macros"]);
  assert!(systems.loaded("articles").is_none());
}

#[tokio::test]
async fn has_one_with_several_matches_takes_the_first() {
  let runtime = blog().await;
  let categories = runtime.model("categories").unwrap();
  let systems = categories.find_or_fail(1).await.unwrap();

  let feature = categories.related(&systems, "feature").await.unwrap();
  assert_eq!(feature.len(), 1);
  assert_eq!(feature.one().and_then(|a| a.value("title")), Some(&Value::from("Ownership")));
}

#[tokio::test]
async fn belongs_to_resolves_owner() {
  let runtime = blog().await;
  let articles = runtime.model("articles").unwrap();
  let indexes = articles.find_or_fail(4).await.unwrap();

  let category = articles.related(&indexes, "category").await.unwrap().into_one().unwrap();
  assert_eq!(category.value("name"), Some(&Value::from("Databases")));
}

#[tokio::test]
async fn many_to_many_through_default_pivot() {
  let runtime = blog().await;
  let articles = runtime.model("articles").unwrap();
  let ownership = articles.find_or_fail(1).await.unwrap();

  let tags = articles.related(&ownership, "tags").await.unwrap().into_many();
  let labels: Vec<&str> = tags
    .iter()
    .filter_map(|t| t.value("label").and_then(Value::as_str))
    .collect();
  assert_eq!(labels, ["rust", "sql"]);

  let tag_model = runtime.model("tags").unwrap();
  let sql = tag_model.find_by_or_fail("label", "sql").await.unwrap();
  let tagged = tag_model.related(&sql, "articles").await.unwrap();
  assert_eq!(titles(tagged.many()), ["Ownership", "Lifetimes"]);
}

#[tokio::test]
async fn eager_load_caches_on_each_owner() {
  let runtime = blog().await;
  let categories = runtime.model("categories").unwrap();
  let mut all = categories.all().await.unwrap();

  categories.load(&mut all, "articles").await.unwrap();
  let counts: Vec<usize> = all
    .iter()
    .map(|c| c.loaded("articles").map_or(0, |r| r.len()))
    .collect();
  assert_eq!(counts, [3, 1]);

  let articles = runtime.model("articles").unwrap();
  let mut all_articles = articles.all().await.unwrap();
  articles.load(&mut all_articles, "tags").await.unwrap();
  let tag_counts: Vec<usize> = all_articles
    .iter()
    .map(|a| a.loaded("tags").map_or(0, |r| r.len()))
    .collect();
  assert_eq!(tag_counts, [2, 1, 0, 0]);
}

#[tokio::test]
async fn missing_foreign_key_column_is_a_lookup_error() {
  let runtime = blog().await;

  // `tags` does not declare `category_id`.
  let broken = Runtime::new(
    Arc::new(runtime.client().clone()),
    Registry::new(vec![
      ModelDefinition::new("categories")
        .property("name", ColumnType::String(120))
        .has_many("tags", "tags"),
      ModelDefinition::new("tags").property("label", ColumnType::String(40)),
    ])
    .unwrap(),
  );
  let categories = broken.model("categories").unwrap();
  let systems = categories.find_or_fail(1).await.unwrap();
  let err = categories.related(&systems, "tags").await.unwrap_err();
  assert!(matches!(err, Error::Lookup { ref table, ref column } if table == "tags" && column == "category_id"));

  // The pivot exists but has no `category_id` column.
  let pivot = Runtime::new(
    Arc::new(runtime.client().clone()),
    Registry::new(vec![
      ModelDefinition::new("categories")
        .property("name", ColumnType::String(120))
        .relation(fluent_core::RelationSpec::many_to_many("tags", "tags").pivot_table("article_tag")),
      ModelDefinition::new("tags").property("label", ColumnType::String(40)),
    ])
    .unwrap(),
  );
  let categories = pivot.model("categories").unwrap();
  let systems = categories.find_or_fail(1).await.unwrap();
  let err = categories.related(&systems, "tags").await.unwrap_err();
  assert!(matches!(err, Error::Lookup { ref table, .. } if table == "article_tag"));
}

#[tokio::test]
async fn undeclared_relation_is_a_configuration_error() {
  let runtime = blog().await;
  let articles = runtime.model("articles").unwrap();
  let article = articles.find_or_fail(1).await.unwrap();
  assert!(matches!(
    articles.related(&article, "comments").await,
    Err(Error::Configuration(_))
  ));
}
