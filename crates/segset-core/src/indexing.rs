//! Extension matching, identifier parsing, and the ordered entry index
//! shared by every dataset source.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::Entry;
use crate::error::{DatasetError, Result};

/// Recognised image extensions, in the order matches are grouped.
///
/// Matching is case-sensitive: `photo.JPG` is not an entry.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png"];

/// How entries are ordered once discovered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingOrder {
    /// Sort by `(identifier, location)` so runs are reproducible.
    #[default]
    Sorted,
    /// Keep the listing order: grouped by extension in [`IMAGE_EXTENSIONS`]
    /// order, each group in whatever order the directory or store returned.
    Discovery,
}

/// What to do when two entries share an identifier (e.g. `a.jpg` and `a.png`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep every entry and log a warning per collision.
    #[default]
    Allow,
    /// Fail index construction.
    Reject,
}

/// Options controlling index construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    /// Entry ordering.
    pub order: ListingOrder,
    /// Identifier collision handling.
    pub duplicates: DuplicatePolicy,
}

/// Returns the identifier for `file_name` if it names a recognised image.
///
/// Dot-files never match, mirroring shell globbing where `*` skips a leading
/// `.`. Only the matched extension is stripped: `a.b.jpg` yields `a.b`.
#[must_use]
pub fn match_image_name(file_name: &str) -> Option<&str> {
    classify(file_name).map(|(_, identifier)| identifier)
}

/// Returns the final component of a path or object key.
#[must_use]
pub fn file_name_of(location: &str) -> &str {
    location
        .rsplit(|c: char| c == '/' || c == std::path::MAIN_SEPARATOR)
        .next()
        .unwrap_or(location)
}

/// Builds an [`Entry`] for `location` if its file name is a recognised image.
#[must_use]
pub fn entry_for_location(location: &str) -> Option<Entry> {
    match_image_name(file_name_of(location)).map(|id| Entry::new(id, location))
}

fn classify(file_name: &str) -> Option<(usize, &str)> {
    if file_name.starts_with('.') {
        return None;
    }
    IMAGE_EXTENSIONS
        .iter()
        .enumerate()
        .find_map(|(slot, ext)| file_name.strip_suffix(ext).map(|stem| (slot, stem)))
}

/// Immutable, ordered list of entries built once from a scan or listing.
///
/// The position of each entry is the dataset index it is served under for
/// the lifetime of the index.
#[derive(Debug, Clone, Default)]
pub struct EntryIndex {
    entries: Vec<Entry>,
    duplicates: Vec<String>,
}

impl EntryIndex {
    /// Builds an index from candidate locations in listing order.
    ///
    /// Locations whose file name is not a recognised image are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::DuplicateIdentifier`] if two entries share an
    /// identifier and `options.duplicates` is [`DuplicatePolicy::Reject`].
    pub fn from_locations<I, S>(locations: I, options: IndexOptions) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut groups: Vec<Vec<Entry>> = vec![Vec::new(); IMAGE_EXTENSIONS.len()];
        let mut skipped = 0usize;

        for location in locations {
            let location = location.into();
            match classify(file_name_of(&location)) {
                Some((slot, identifier)) => {
                    let identifier = identifier.to_string();
                    groups[slot].push(Entry::new(identifier, location));
                }
                None => skipped += 1,
            }
        }

        let mut entries: Vec<Entry> = groups.into_iter().flatten().collect();
        if options.order == ListingOrder::Sorted {
            entries.sort_by(|a, b| {
                a.identifier
                    .cmp(&b.identifier)
                    .then_with(|| a.location.cmp(&b.location))
            });
        }

        let duplicates = check_duplicates(&entries, options.duplicates)?;
        debug!(
            "Indexed {} entries ({} skipped, {} duplicate identifiers)",
            entries.len(),
            skipped,
            duplicates.len()
        );

        Ok(Self {
            entries,
            duplicates,
        })
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries were discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::IndexOutOfRange`] if `index >= len()`.
    pub fn get(&self, index: usize) -> Result<&Entry> {
        self.entries.get(index).ok_or(DatasetError::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    /// All entries in index order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Identifiers that appear more than once, sorted.
    #[must_use]
    pub fn duplicate_identifiers(&self) -> &[String] {
        &self.duplicates
    }
}

fn check_duplicates(entries: &[Entry], policy: DuplicatePolicy) -> Result<Vec<String>> {
    let mut first_seen: HashMap<&str, &str> = HashMap::with_capacity(entries.len());
    let mut duplicates = Vec::new();

    for entry in entries {
        let Some(first) = first_seen.insert(&entry.identifier, &entry.location) else {
            continue;
        };
        match policy {
            DuplicatePolicy::Reject => {
                return Err(DatasetError::DuplicateIdentifier {
                    identifier: entry.identifier.clone(),
                    first: first.to_string(),
                    second: entry.location.clone(),
                });
            }
            DuplicatePolicy::Allow => {
                warn!(
                    "Identifier '{}' is shared by {} and {}",
                    entry.identifier, first, entry.location
                );
                duplicates.push(entry.identifier.clone());
            }
        }
    }

    duplicates.sort();
    duplicates.dedup();
    Ok(duplicates)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn discovery() -> IndexOptions {
        IndexOptions {
            order: ListingOrder::Discovery,
            ..IndexOptions::default()
        }
    }

    #[test]
    fn test_match_image_name() {
        assert_eq!(match_image_name("a.jpg"), Some("a"));
        assert_eq!(match_image_name("a.jpeg"), Some("a"));
        assert_eq!(match_image_name("a.png"), Some("a"));
        assert_eq!(match_image_name("a.b.jpg"), Some("a.b"));
        assert_eq!(match_image_name("a.JPG"), None);
        assert_eq!(match_image_name("a.gif"), None);
        assert_eq!(match_image_name("notes.txt"), None);
        assert_eq!(match_image_name(".hidden.png"), None);
        assert_eq!(match_image_name(".jpg"), None);
        assert_eq!(match_image_name("jpg"), None);
    }

    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of("bucket/train/img_01.png"), "img_01.png");
        assert_eq!(file_name_of("img_01.png"), "img_01.png");
        assert_eq!(file_name_of("bucket/prefix/"), "");
    }

    #[test]
    fn test_entry_for_location_strips_directory() {
        let entry = entry_for_location("/data/train/cat_7.jpeg").unwrap();
        assert_eq!(entry.identifier, "cat_7");
        assert_eq!(entry.location, "/data/train/cat_7.jpeg");
        assert!(entry_for_location("/data/train/README.md").is_none());
    }

    #[test]
    fn test_discovery_groups_by_extension() {
        let index = EntryIndex::from_locations(
            ["d/z.png", "d/b.jpg", "d/y.jpeg", "d/a.jpg", "d/x.txt"],
            discovery(),
        )
        .unwrap();

        let ids: Vec<_> = index.entries().iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(ids, ["b", "a", "y", "z"]);
    }

    #[test]
    fn test_sorted_order() {
        let index = EntryIndex::from_locations(
            ["d/z.png", "d/b.jpg", "d/y.jpeg", "d/a.jpg"],
            IndexOptions::default(),
        )
        .unwrap();

        let ids: Vec<_> = index.entries().iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(ids, ["a", "b", "y", "z"]);
    }

    #[test]
    fn test_collisions_are_kept_by_default() {
        let index =
            EntryIndex::from_locations(["d/a.jpg", "d/a.png", "d/b.png"], IndexOptions::default())
                .unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.duplicate_identifiers(), ["a".to_string()]);
        assert_eq!(index.get(0).unwrap().location, "d/a.jpg");
        assert_eq!(index.get(1).unwrap().location, "d/a.png");
    }

    #[test]
    fn test_collisions_rejected() {
        let options = IndexOptions {
            duplicates: DuplicatePolicy::Reject,
            ..IndexOptions::default()
        };
        let err = EntryIndex::from_locations(["d/a.jpg", "d/a.png"], options).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::DuplicateIdentifier { ref identifier, .. } if identifier == "a"
        ));
    }

    #[test]
    fn test_get_out_of_range() {
        let index = EntryIndex::from_locations(["a.jpg"], IndexOptions::default()).unwrap();
        assert!(index.get(0).is_ok());
        assert!(matches!(
            index.get(1),
            Err(DatasetError::IndexOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_empty_listing() {
        let index =
            EntryIndex::from_locations(Vec::<String>::new(), IndexOptions::default()).unwrap();
        assert!(index.is_empty());
        assert!(index.duplicate_identifiers().is_empty());
    }
}
