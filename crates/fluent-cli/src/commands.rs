//! Subcommand bodies. Each takes the shared client and prints its outcome.

use std::sync::Arc;

use anyhow::Context as _;
use fluent_core::{DatabaseClient, Entity, Migrator, Row, Runtime, Statement, Value};
use fluent_store_sqlite::SqliteClient;
use serde_json::json;

use crate::blog;

type Client = Arc<SqliteClient>;

fn migrator(client: Client) -> anyhow::Result<Migrator<SqliteClient>> {
  Migrator::new(client, blog::migrations()).context("invalid migration list")
}

fn runtime(client: Client) -> anyhow::Result<Runtime<SqliteClient>> {
  Ok(Runtime::new(client, blog::models().context("invalid model registry")?))
}

// ─── migrate ─────────────────────────────────────────────────────────────────

pub async fn migrate_run(client: Client) -> anyhow::Result<()> {
  let report = migrator(client)?.run().await.context("migration failed")?;
  match report.batch {
    Some(batch) => {
      for name in &report.applied {
        println!("migrated  {name}");
      }
      println!("batch {batch}: {} migration(s)", report.applied.len());
    }
    None => println!("nothing to migrate"),
  }
  Ok(())
}

pub async fn migrate_rollback(client: Client) -> anyhow::Result<()> {
  let outcome = migrator(client)?.rollback().await.context("rollback failed")?;
  println!("{outcome}");
  Ok(())
}

pub async fn migrate_fresh(client: Client) -> anyhow::Result<()> {
  let report = migrator(client)?.fresh().await.context("fresh failed")?;
  for name in &report.reverted {
    println!("reverted  {name}");
  }
  for name in &report.run.applied {
    println!("migrated  {name}");
  }
  Ok(())
}

pub async fn migrate_status(client: Client) -> anyhow::Result<()> {
  for status in migrator(client)?.status().await? {
    println!("{status}");
  }
  Ok(())
}

// ─── seed ────────────────────────────────────────────────────────────────────

fn row<const N: usize>(pairs: [(&str, Value); N]) -> Row {
  pairs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect()
}

pub async fn seed(client: Client) -> anyhow::Result<()> {
  let runtime = runtime(Arc::clone(&client))?;
  let categories = runtime.model("categories")?;
  let articles = runtime.model("articles")?;
  let tags = runtime.model("tags")?;

  for (name, posts) in blog::SEED {
    let category = categories
      .create(row([("name", Value::from(*name))]))
      .await
      .with_context(|| format!("failed to create category {name:?}"))?;

    for (title, labels) in *posts {
      let article = articles
        .create(row([
          ("title", Value::from(*title)),
          ("category_id", category.id()?.clone()),
        ]))
        .await?;

      for label in *labels {
        let tag = match tags.find_by("label", *label).await? {
          Some(tag) => tag,
          None => tags.create(row([("label", Value::from(*label))])).await?,
        };
        let link = Statement::Insert {
          table:  "article_tag".into(),
          values: row([("article_id", article.id()?.clone()), ("tag_id", tag.id()?.clone())]),
        };
        client.execute(&link).await?;
      }
    }
    tracing::info!(category = name, articles = posts.len(), "seeded");
  }
  Ok(())
}

// ─── show ────────────────────────────────────────────────────────────────────

pub async fn show(client: Client, id: i64) -> anyhow::Result<()> {
  let runtime = runtime(client)?;
  let categories = runtime.model("categories")?;
  let articles = runtime.model("articles")?;

  let category = categories.find_or_fail(id).await?;
  let mut posts = categories.related(&category, "articles").await?.into_many();
  articles.load(&mut posts, "tags").await?;

  let posts: Vec<serde_json::Value> = posts.iter().map(article_json).collect();
  let out = json!({
    "category": category.row(),
    "articles": posts,
  });
  println!("{}", serde_json::to_string_pretty(&out)?);
  Ok(())
}

fn article_json(article: &Entity) -> serde_json::Value {
  let tags: Vec<&Value> = article
    .loaded("tags")
    .map(|related| related.many())
    .unwrap_or_default()
    .iter()
    .filter_map(|tag| tag.value("label"))
    .collect();
  json!({
    "article": article.row(),
    "tags": tags,
  })
}
