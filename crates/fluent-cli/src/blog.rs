//! The sample blog schema the `fluent` binary manages.
//!
//! Categories own articles; articles and tags meet in `article_tag`.

use fluent_core::{
  ColumnType, Migration, ModelDefinition, Registry, Result, SchemaDescriptor, SchemaMigration,
  schema::OnDelete,
};

/// Every migration, in the order it must be applied.
pub fn migrations() -> Vec<Box<dyn Migration>> {
  vec![
    SchemaMigration::new("Categories1718000000000")
      .up(SchemaDescriptor::create_table("categories", |t| {
        t.id();
        t.string("name", 120).not_null().unique();
        t.timestamps();
      }))
      .down(SchemaDescriptor::drop_table("categories"))
      .boxed(),
    SchemaMigration::new("Articles1718000000001")
      .up(SchemaDescriptor::create_table("articles", |t| {
        t.id();
        t.string("title", 200).not_null();
        t.text("body");
        t.boolean("published").not_null().default(false);
        t.foreign_id("category_id")
          .references("categories", "id")
          .on_delete(OnDelete::Cascade);
        t.timestamps();
      }))
      .down(SchemaDescriptor::drop_table("articles"))
      .boxed(),
    SchemaMigration::new("Tags1718000000002")
      .up(SchemaDescriptor::create_table("tags", |t| {
        t.id();
        t.string("label", 40).not_null().unique();
      }))
      .down(SchemaDescriptor::drop_table("tags"))
      .boxed(),
    SchemaMigration::new("ArticleTag1718000000003")
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
      .boxed(),
  ]
}

pub fn models() -> Result<Registry> {
  Registry::new(vec![
    ModelDefinition::new("categories")
      .property("name", ColumnType::String(120))
      .timestamps()
      .has_many("articles", "articles"),
    ModelDefinition::new("articles")
      .property("title", ColumnType::String(200))
      .property("body", ColumnType::Text)
      .property("published", ColumnType::Boolean)
      .property("category_id", ColumnType::Integer)
      .timestamps()
      .belongs_to("category", "categories")
      .many_to_many("tags", "tags")
      .before_save(|row| {
        let blank = row
          .get("title")
          .and_then(|v| v.as_str())
          .is_none_or(|title| title.trim().is_empty());
        if blank {
          return Err("article title must not be blank".into());
        }
        Ok(())
      }),
    ModelDefinition::new("tags")
      .property("label", ColumnType::String(40))
      .many_to_many("articles", "articles"),
  ])
}

/// Sample content for `fluent seed`: `(category, [(title, [tag])])`.
pub const SEED: &[(&str, &[(&str, &[&str])])] = &[
  ("Systems", &[
    ("Ownership in practice", &["rust"]),
    ("Writing a storage engine", &["rust", "databases"]),
  ]),
  ("Databases", &[("Batching migrations", &["databases", "sql"])]),
];

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn models_register_cleanly() {
    let registry = models().unwrap();
    assert_eq!(registry.models().len(), 3);
  }

  #[test]
  fn migration_names_are_unique() {
    let migrations = migrations();
    let mut names: Vec<&str> = migrations.iter().map(|m| m.name()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), migrations.len());
  }
}
