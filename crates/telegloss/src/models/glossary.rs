use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single glossary term and the Telegraph page holding its definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub term: String,
    /// Plain text rendition, used for search and the index page
    #[serde(default)]
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_html: Option<String>,
    #[serde(default)]
    pub telegraph_path: String,
    #[serde(default)]
    pub telegraph_url: String,
    #[serde(with = "timestamp", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp", default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl GlossaryEntry {
    pub fn new<T, D, P, U>(term: T, definition: D, telegraph_path: P, telegraph_url: U) -> Self
    where
        T: Into<String>,
        D: Into<String>,
        P: Into<String>,
        U: Into<String>,
    {
        let now = Utc::now();
        Self {
            term: term.into(),
            definition: definition.into(),
            definition_html: None,
            telegraph_path: telegraph_path.into(),
            telegraph_url: telegraph_url.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_html<S: Into<String>>(mut self, html: S) -> Self {
        self.definition_html = Some(html.into());
        self
    }
}

/// Insertion-ordered map of term to entry.
///
/// Terms are unique under exact comparison. Iteration follows insertion order,
/// which decides the winner of case-insensitive lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Glossary {
    entries: Vec<GlossaryEntry>,
}

impl Glossary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, term: &str) -> Option<&GlossaryEntry> {
        self.entries.iter().find(|entry| entry.term == term)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.get(term).is_some()
    }

    /// Exact lookup first, then the first entry whose term matches ignoring case.
    pub fn lookup(&self, term: &str) -> Option<&GlossaryEntry> {
        self.get(term).or_else(|| {
            let lowered = term.to_lowercase();
            self.entries
                .iter()
                .find(|entry| entry.term.to_lowercase() == lowered)
        })
    }

    /// Insert an entry, replacing (in place) any entry with the same term.
    pub fn insert(&mut self, entry: GlossaryEntry) -> Option<GlossaryEntry> {
        match self.entries.iter_mut().find(|e| e.term == entry.term) {
            Some(existing) => Some(std::mem::replace(existing, entry)),
            None => {
                self.entries.push(entry);
                None
            }
        }
    }

    pub fn remove(&mut self, term: &str) -> Option<GlossaryEntry> {
        let position = self.entries.iter().position(|e| e.term == term)?;
        Some(self.entries.remove(position))
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlossaryEntry> {
        self.entries.iter()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.term.as_str())
    }

    /// Entries ordered by term, the order used for display and the index page.
    pub fn sorted(&self) -> Vec<&GlossaryEntry> {
        let mut entries: Vec<&GlossaryEntry> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.term.cmp(&b.term));
        entries
    }
}

impl FromIterator<GlossaryEntry> for Glossary {
    fn from_iter<I: IntoIterator<Item = GlossaryEntry>>(iter: I) -> Self {
        let mut glossary = Glossary::new();
        for entry in iter {
            glossary.insert(entry);
        }
        glossary
    }
}

impl<'a> IntoIterator for &'a Glossary {
    type Item = &'a GlossaryEntry;
    type IntoIter = std::slice::Iter<'a, GlossaryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// RFC 3339 on the way out; on the way in also accepts naive ISO timestamps
/// written by older index pages, read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(naive.and_utc());
        }
        Ok(Utc::now())
    }
}
