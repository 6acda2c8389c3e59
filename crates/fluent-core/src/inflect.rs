//! Table-name inflection used for default keys and pivot tables.
//!
//! Singularisation is a fixed rule set, applied to the lower-cased name:
//!
//! 1. a short table of irregular plurals (`people` → `person`, ...);
//! 2. words ending in `ss`, `us` or `is` are already singular;
//! 3. `-ies` → `-y` (`categories` → `category`);
//! 4. `-sses`, `-shes`, `-ches`, `-xes`, `-zes` drop `-es`;
//! 5. any other trailing `s` is dropped;
//! 6. everything else is returned unchanged, so singular names are stable.
//!
//! The rules are applied to the last `_`-separated word only, so
//! `blog_posts` becomes `blog_post`.

const IRREGULAR: &[(&str, &str)] = &[
  ("people", "person"),
  ("children", "child"),
  ("men", "man"),
  ("women", "woman"),
  ("mice", "mouse"),
  ("geese", "goose"),
  ("teeth", "tooth"),
  ("feet", "foot"),
];

/// Singular, lower-case form of a table name.
pub fn singularize(table: &str) -> String {
  let lower = table.to_lowercase();
  match lower.rsplit_once('_') {
    Some((head, last)) => format!("{head}_{}", singularize_word(last)),
    None => singularize_word(&lower),
  }
}

fn singularize_word(word: &str) -> String {
  if let Some((_, singular)) = IRREGULAR.iter().find(|(plural, _)| *plural == word) {
    return (*singular).to_owned();
  }
  if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
    return word.to_owned();
  }
  if let Some(stem) = word.strip_suffix("ies") {
    if !stem.is_empty() {
      return format!("{stem}y");
    }
  }
  for suffix in ["sses", "shes", "ches", "xes", "zes"] {
    if word.ends_with(suffix) {
      return word[..word.len() - 2].to_owned();
    }
  }
  match word.strip_suffix('s') {
    Some(stem) if !stem.is_empty() => stem.to_owned(),
    _ => word.to_owned(),
  }
}

/// Default foreign-key column pointing at `table`: `{singular}_id`.
pub fn foreign_key_for(table: &str) -> String {
  format!("{}_id", singularize(table))
}

/// Default pivot table for a many-to-many relation between two tables:
/// both names singularised, sorted alphabetically, joined with `_`.
pub fn pivot_table_name(a: &str, b: &str) -> String {
  let mut names = [singularize(a), singularize(b)];
  names.sort();
  names.join("_")
}
