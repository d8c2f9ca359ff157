//! Author and affiliation aggregation.
//!
//! People are collected in page order. Affiliations are numbered by first
//! appearance, starting at 1, and each distinct affiliation gets exactly one
//! number.

use confnotes_browser::{By, Element};
use confnotes_shared::Author;

/// Ordered, de-duplicated people with footnote-style affiliation numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorList {
    authors: Vec<Author>,
    affiliations: Vec<String>,
    seen: Vec<(String, Option<String>)>,
}

impl AuthorList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one person. Returns `false` when the same name and affiliation
    /// were already added.
    pub fn push(&mut self, name: &str, affiliation: Option<&str>) -> bool {
        let name = name.trim();
        let affiliation = affiliation.map(str::trim).filter(|a| !a.is_empty());

        let key = (name.to_string(), affiliation.map(String::from));
        if self.seen.contains(&key) {
            return false;
        }
        self.seen.push(key);

        let index = affiliation.map(|affil| {
            match self.affiliations.iter().position(|a| a == affil) {
                Some(pos) => pos + 1,
                None => {
                    self.affiliations.push(affil.to_string());
                    self.affiliations.len()
                }
            }
        });

        self.authors.push(Author {
            name: name.to_string(),
            affiliation: index,
        });
        true
    }

    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    pub fn affiliations(&self) -> &[String] {
        &self.affiliations
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }

    /// `(authors, affiliations)` ready to store on a record.
    pub fn into_parts(self) -> (Vec<Author>, Vec<String>) {
        (self.authors, self.affiliations)
    }
}

impl<N, A> FromIterator<(N, Option<A>)> for AuthorList
where
    N: AsRef<str>,
    A: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (N, Option<A>)>>(iter: I) -> Self {
        let mut list = Self::new();
        for (name, affiliation) in iter {
            list.push(name.as_ref(), affiliation.as_ref().map(|a| a.as_ref()));
        }
        list
    }
}

/// Read a presentation role item: line 2 is the name, line 3 the affiliation.
///
/// Returns `None` while the item has not rendered its name yet.
pub fn parse_role_item(text: &str) -> Option<(String, Option<String>)> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let name = lines.get(1).filter(|n| !n.is_empty())?;
    let affiliation = lines
        .get(2)
        .filter(|a| !a.is_empty())
        .map(|a| a.to_string());
    Some((name.to_string(), affiliation))
}

/// Read a session leader: the link text is the name, a multi-line
/// affiliation block is joined with `"; "`.
pub fn parse_leader(item: &Element) -> Option<(String, Option<String>)> {
    let name = item.find_one(&By::tag("a"))?.text();
    if name.is_empty() {
        return None;
    }
    let affiliation = item
        .find_one(&By::class("Affiliation"))
        .map(|a| a.text().lines().collect::<Vec<_>>().join("; "))
        .filter(|a| !a.is_empty());
    Some((name, affiliation))
}
