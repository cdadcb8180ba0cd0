use std::fmt;

use crate::error::UnknownCategory;
use crate::task::Category;

/// Label that disables category filtering.
pub const ALL_LABEL: &str = "All";

pub const DEFAULT_CATEGORIES: [&str; 7] = [
  "Work", "Personal", "Study", "Health",
  "Finance", "Home", "Other"
];

/// Ordered category vocabulary. The first
/// label is the default for new tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categories {
  labels: Vec<Category>
}

impl Default for Categories {
  fn default() -> Self {
    Self {
      labels: DEFAULT_CATEGORIES
        .iter()
        .map(|label| Category::new(*label))
        .collect()
    }
  }
}

impl Categories {
  /// Builds a vocabulary from labels,
  /// dropping blanks, duplicates and the
  /// reserved `All`. Falls back to the
  /// defaults if nothing usable remains.
  pub fn new<I, S>(labels: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>
  {
    let mut out: Vec<Category> =
      Vec::new();
    for raw in labels {
      let label = raw.as_ref().trim();
      if label.is_empty()
        || label
          .eq_ignore_ascii_case(ALL_LABEL)
        || out.iter().any(|c| {
          c.as_str()
            .eq_ignore_ascii_case(label)
        })
      {
        continue;
      }
      out.push(Category::new(label));
    }

    if out.is_empty() {
      tracing::warn!(
        "empty category vocabulary; \
         using defaults"
      );
      return Self::default();
    }

    Self {
      labels: out
    }
  }

  pub fn default_category(
    &self
  ) -> Category {
    self
      .labels
      .first()
      .cloned()
      .unwrap_or_else(|| {
        Category::new(
          DEFAULT_CATEGORIES[0]
        )
      })
  }

  pub fn contains(
    &self,
    category: &Category
  ) -> bool {
    self.labels.contains(category)
  }

  /// Case-insensitive lookup returning the
  /// canonical label.
  pub fn parse(
    &self,
    raw: &str
  ) -> Result<Category, UnknownCategory>
  {
    let wanted = raw.trim();
    self
      .labels
      .iter()
      .find(|c| {
        c.as_str()
          .eq_ignore_ascii_case(wanted)
      })
      .cloned()
      .ok_or_else(|| {
        UnknownCategory(
          wanted.to_string()
        )
      })
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = &Category> {
    self.labels.iter()
  }

  /// Labels offered by the filter picker:
  /// `All` followed by the vocabulary.
  pub fn filter_labels(
    &self
  ) -> Vec<String> {
    std::iter::once(
      ALL_LABEL.to_string()
    )
    .chain(
      self
        .labels
        .iter()
        .map(|c| c.to_string())
    )
    .collect()
  }
}

#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub enum CategoryFilter {
  #[default]
  All,
  Only(Category)
}

impl CategoryFilter {
  pub fn parse(
    categories: &Categories,
    raw: &str
  ) -> Result<Self, UnknownCategory> {
    if raw
      .trim()
      .eq_ignore_ascii_case(ALL_LABEL)
    {
      return Ok(Self::All);
    }
    categories.parse(raw).map(Self::Only)
  }

  pub fn admits(
    &self,
    category: &Category
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Only(wanted) => {
        wanted == category
      }
    }
  }
}

impl fmt::Display for CategoryFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Self::All => {
        f.write_str(ALL_LABEL)
      }
      | Self::Only(category) => {
        write!(f, "{category}")
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::{
    Categories,
    CategoryFilter
  };
  use crate::task::Category;

  #[test]
  fn defaults_start_with_work() {
    let categories =
      Categories::default();
    assert_eq!(
      categories
        .default_category()
        .as_str(),
      "Work"
    );
    assert_eq!(
      categories.filter_labels()[0],
      "All"
    );
    assert_eq!(
      categories.filter_labels().len(),
      8
    );
  }

  #[test]
  fn parse_returns_canonical_label() {
    let categories =
      Categories::default();
    assert_eq!(
      categories
        .parse("finance")
        .unwrap(),
      Category::new("Finance")
    );
    assert!(
      categories.parse("Garden").is_err()
    );
  }

  #[test]
  fn new_drops_reserved_and_duplicate_labels()
  {
    let categories = Categories::new([
      "Errands", "all", "errands", " ",
      "Music"
    ]);
    let labels: Vec<_> = categories
      .iter()
      .map(|c| c.as_str().to_string())
      .collect();
    assert_eq!(
      labels,
      vec!["Errands", "Music"]
    );

    let fallback =
      Categories::new(Vec::<String>::new());
    assert_eq!(
      fallback,
      Categories::default()
    );
  }

  #[test]
  fn filter_all_admits_everything() {
    let categories =
      Categories::default();
    let all = CategoryFilter::parse(
      &categories,
      "All"
    )
    .unwrap();
    let work = CategoryFilter::parse(
      &categories,
      "work"
    )
    .unwrap();
    let home = Category::new("Home");

    assert!(all.admits(&home));
    assert!(!work.admits(&home));
    assert!(
      work.admits(&Category::new("Work"))
    );
    assert_eq!(work.to_string(), "Work");
  }
}
