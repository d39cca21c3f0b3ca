//! Block list management
//!
//! Invariants kept here: at least one list always exists, names are unique
//! ignoring case, and website entries are lowercased plain hostnames or keywords.

use log::info;
use serde_json::Value;

use crate::config::BlockList;
use crate::error::CatalogError;
use crate::matcher::Entry;
use crate::url::{is_plain_hostname, strip_www};

pub const DEFAULT_LIST_ID: &str = "default";
pub const DEFAULT_LIST_NAME: &str = "Default Block List";
/// Longest accepted website entry.
pub const MAX_ENTRY_LEN: usize = 100;
/// Most entries a single list may hold.
pub const MAX_ENTRIES_PER_LIST: usize = 100;

/// Normalize a user-typed entry, or None if it cannot be stored.
///
/// `*keyword*` entries are kept as typed (lowercased). Anything else must
/// reduce to a plain hostname: a pasted URL loses its scheme, path and a
/// leading `www.`.
pub fn sanitize_entry(raw: &str) -> Option<String> {
    let entry = raw.trim().to_lowercase();
    if entry.is_empty() || entry.len() > MAX_ENTRY_LEN {
        return None;
    }
    if Entry::parse(&entry).is_keyword() {
        return Some(entry);
    }

    let host = entry
        .strip_prefix("https://")
        .or_else(|| entry.strip_prefix("http://"))
        .unwrap_or(&entry);
    let host = host.split(['/', '?', '#']).next().unwrap_or(host);
    let host = strip_www(host);
    is_plain_hostname(host).then(|| host.to_string())
}

/// Sanitize a whole website list, dropping invalid entries and duplicates
/// and keeping at most [`MAX_ENTRIES_PER_LIST`].
pub fn sanitize_websites<'a, I>(websites: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out: Vec<String> = Vec::new();
    for entry in websites.into_iter().filter_map(sanitize_entry) {
        if out.len() == MAX_ENTRIES_PER_LIST {
            break;
        }
        if !out.contains(&entry) {
            out.push(entry);
        }
    }
    out
}

/// The ordered set of block lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCatalog {
    lists: Vec<BlockList>,
}

impl ListCatalog {
    /// Wrap stored lists, creating the default list when there are none.
    pub fn from_lists(lists: Vec<BlockList>) -> Self {
        if lists.is_empty() {
            info!("No block lists stored, creating {DEFAULT_LIST_NAME:?}");
            return Self {
                lists: vec![BlockList::new(DEFAULT_LIST_ID, DEFAULT_LIST_NAME)],
            };
        }
        Self { lists }
    }

    pub fn lists(&self) -> &[BlockList] {
        &self.lists
    }

    pub fn into_lists(self) -> Vec<BlockList> {
        self.lists
    }

    pub fn get(&self, id: &str) -> Option<&BlockList> {
        self.lists.iter().find(|list| list.id == id)
    }

    /// Append a new list. `now_ms` seeds the generated id.
    pub fn create(&mut self, name: &str, now_ms: i64) -> Result<&BlockList, CatalogError> {
        let name = self.check_name(name, None)?;

        let mut id = format!("list_{now_ms}");
        let mut suffix = 1;
        while self.get(&id).is_some() {
            id = format!("list_{now_ms}_{suffix}");
            suffix += 1;
        }

        self.lists.push(BlockList::new(id, name));
        let index = self.lists.len() - 1;
        Ok(&self.lists[index])
    }

    pub fn rename(&mut self, id: &str, name: &str) -> Result<(), CatalogError> {
        let name = self.check_name(name, Some(id))?;
        self.get_mut(id)?.name = name;
        Ok(())
    }

    /// Delete a list. The last remaining list cannot be deleted.
    pub fn remove(&mut self, id: &str) -> Result<BlockList, CatalogError> {
        let index = self.position(id)?;
        if self.lists.len() <= 1 {
            return Err(CatalogError::LastList);
        }
        Ok(self.lists.remove(index))
    }

    /// Add an entry; `Ok(false)` if it was already present.
    pub fn add_website(&mut self, id: &str, raw: &str) -> Result<bool, CatalogError> {
        let entry = sanitize_entry(raw).ok_or_else(|| CatalogError::InvalidEntry(raw.to_string()))?;
        let list = self.get_mut(id)?;
        if list.websites.contains(&entry) {
            return Ok(false);
        }
        if list.websites.len() >= MAX_ENTRIES_PER_LIST {
            return Err(CatalogError::ListFull(list.id.clone()));
        }
        list.websites.push(entry);
        Ok(true)
    }

    /// Remove an entry; `Ok(false)` if it was not present.
    pub fn remove_website(&mut self, id: &str, raw: &str) -> Result<bool, CatalogError> {
        let entry = sanitize_entry(raw).unwrap_or_else(|| raw.to_string());
        let list = self.get_mut(id)?;
        let before = list.websites.len();
        list.websites.retain(|existing| *existing != entry);
        Ok(list.websites.len() != before)
    }

    /// Stored JSON form of the lists.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(&self.lists).unwrap_or(Value::Array(Vec::new()))
    }

    fn check_name(&self, name: &str, renaming: Option<&str>) -> Result<String, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::EmptyName);
        }
        let taken = self
            .lists
            .iter()
            .filter(|list| Some(list.id.as_str()) != renaming)
            .any(|list| list.name.to_lowercase() == name.to_lowercase());
        if taken {
            return Err(CatalogError::DuplicateName(name.to_string()));
        }
        Ok(name.to_string())
    }

    fn position(&self, id: &str) -> Result<usize, CatalogError> {
        self.lists
            .iter()
            .position(|list| list.id == id)
            .ok_or_else(|| CatalogError::UnknownList(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut BlockList, CatalogError> {
        let index = self.position(id)?;
        Ok(&mut self.lists[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_list_created() {
        let catalog = ListCatalog::from_lists(Vec::new());
        assert_eq!(catalog.lists().len(), 1);
        assert_eq!(catalog.lists()[0].id, DEFAULT_LIST_ID);
        assert!(catalog.lists()[0].enabled);
    }

    #[test]
    fn test_cannot_delete_last_list() {
        let mut catalog = ListCatalog::from_lists(Vec::new());
        assert_eq!(catalog.remove(DEFAULT_LIST_ID), Err(CatalogError::LastList));

        let id = catalog.create("Work", 1).unwrap().id.clone();
        assert!(catalog.remove(DEFAULT_LIST_ID).is_ok());
        assert_eq!(catalog.remove(&id), Err(CatalogError::LastList));
        assert_eq!(catalog.remove("nope"), Err(CatalogError::UnknownList("nope".into())));
    }

    #[test]
    fn test_names_unique_ignoring_case() {
        let mut catalog = ListCatalog::from_lists(Vec::new());
        catalog.create("Social", 1).unwrap();
        assert_eq!(
            catalog.create("  social ", 2).unwrap_err(),
            CatalogError::DuplicateName("social".into())
        );
        assert_eq!(catalog.create("   ", 3).unwrap_err(), CatalogError::EmptyName);

        // renaming a list to its own name in another case is fine
        catalog.rename(DEFAULT_LIST_ID, "DEFAULT block list").unwrap();
        assert!(catalog.rename(DEFAULT_LIST_ID, "SOCIAL").is_err());
    }

    #[test]
    fn test_create_generates_distinct_ids() {
        let mut catalog = ListCatalog::from_lists(Vec::new());
        let a = catalog.create("A", 7).unwrap().id.clone();
        let b = catalog.create("B", 7).unwrap().id.clone();
        assert_eq!(a, "list_7");
        assert_eq!(b, "list_7_1");
    }

    #[test]
    fn test_websites_sanitized() {
        let mut catalog = ListCatalog::from_lists(Vec::new());
        assert_eq!(catalog.add_website(DEFAULT_LIST_ID, "  YouTube.com "), Ok(true));
        assert_eq!(catalog.add_website(DEFAULT_LIST_ID, "youtube.com"), Ok(false));
        assert!(matches!(
            catalog.add_website(DEFAULT_LIST_ID, "   "),
            Err(CatalogError::InvalidEntry(_))
        ));
        assert_eq!(catalog.get(DEFAULT_LIST_ID).unwrap().websites, vec!["youtube.com"]);
        assert_eq!(catalog.remove_website(DEFAULT_LIST_ID, "YOUTUBE.COM"), Ok(true));
        assert_eq!(catalog.remove_website(DEFAULT_LIST_ID, "youtube.com"), Ok(false));
    }

    #[test]
    fn test_pasted_url_stored_as_hostname() {
        let mut catalog = ListCatalog::from_lists(Vec::new());
        assert_eq!(catalog.add_website(DEFAULT_LIST_ID, "https://www.YouTube.com/"), Ok(true));
        assert_eq!(catalog.add_website(DEFAULT_LIST_ID, "http://news.org/today?x=1"), Ok(true));
        assert_eq!(catalog.add_website(DEFAULT_LIST_ID, "youtube.com"), Ok(false));
        assert_eq!(catalog.get(DEFAULT_LIST_ID).unwrap().websites, vec!["youtube.com", "news.org"]);
    }

    #[test]
    fn test_rejects_non_hostnames() {
        let mut catalog = ListCatalog::from_lists(Vec::new());
        for bad in ["*", "**", "*.example.com", "exa mple.com", "example.com:8080", "ftp://example.com"] {
            assert!(
                matches!(catalog.add_website(DEFAULT_LIST_ID, bad), Err(CatalogError::InvalidEntry(_))),
                "{bad} accepted"
            );
        }
        assert_eq!(catalog.add_website(DEFAULT_LIST_ID, "*Gambling*"), Ok(true));
        assert_eq!(catalog.get(DEFAULT_LIST_ID).unwrap().websites, vec!["*gambling*"]);
    }

    #[test]
    fn test_list_full() {
        let mut catalog = ListCatalog::from_lists(Vec::new());
        for i in 0..MAX_ENTRIES_PER_LIST {
            catalog.add_website(DEFAULT_LIST_ID, &format!("site{i}.com")).unwrap();
        }
        assert_eq!(
            catalog.add_website(DEFAULT_LIST_ID, "one-more.com"),
            Err(CatalogError::ListFull(DEFAULT_LIST_ID.into()))
        );
    }

    #[test]
    fn test_sanitize_websites() {
        let long = "a".repeat(MAX_ENTRY_LEN + 1);
        let out = sanitize_websites(["A.com", "a.com", "", long.as_str(), "*Casino*", "www.a.com", "*"]);
        assert_eq!(out, vec!["a.com", "*casino*"]);
    }
}
