use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};

/// Persisted crawl state of one domain
///
/// `to_crawl` and `visited` are kept disjoint by every transition below. A URL moves
/// `to_crawl -> dispatched -> visited` and is never put back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontierRecord {
    /// Pending URLs in visit order
    #[serde(rename = "tocrawl", default)]
    pub to_crawl: Vec<String>,

    /// URLs reached a terminal outcome, successful or not
    #[serde(default, deserialize_with = "deserialize_visited")]
    pub visited: BTreeSet<String>,

    /// Opaque per-domain data owned by other tools
    #[serde(default)]
    pub product: Map<String, Value>,
}

/// `visited` is written as an array; older files hold an object keyed by URL
#[derive(Deserialize)]
#[serde(untagged)]
enum VisitedRepr {
    List(Vec<String>),
    Keys(Map<String, Value>),
}

fn deserialize_visited<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match VisitedRepr::deserialize(deserializer)? {
        VisitedRepr::List(urls) => urls.into_iter().collect(),
        VisitedRepr::Keys(map) => map.into_iter().map(|(url, _)| url).collect(),
    })
}

impl FrontierRecord {
    /// A fresh record with one pending URL
    pub fn seeded(seed: &str) -> Self {
        Self {
            to_crawl: vec![seed.to_string()],
            ..Self::default()
        }
    }

    /// Parses a record file
    ///
    /// A top-level JSON string holding the record (a double-encoded first write) is
    /// decoded transparently.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<Value>(content)? {
            Value::String(inner) => serde_json::from_str(&inner),
            value => serde_json::from_value(value),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Empties `to_crawl`, returning its URLs in order
    ///
    /// Already-visited URLs and repeats are dropped from the result.
    pub fn drain(&mut self) -> Vec<String> {
        let mut seen = HashSet::new();
        let visited = &self.visited;
        std::mem::take(&mut self.to_crawl)
            .into_iter()
            .filter(|url| !visited.contains(url) && seen.insert(url.clone()))
            .collect()
    }

    /// Records a terminal outcome for `url`
    ///
    /// Returns true if the record changed.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        let before = self.to_crawl.len();
        self.to_crawl.retain(|pending| pending != url);
        let inserted = self.visited.insert(url.to_string());
        inserted || self.to_crawl.len() != before
    }

    /// Appends URLs that are neither visited nor pending, returning how many were added
    pub fn enqueue<I, S>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for url in urls {
            let url = url.as_ref();
            if self.visited.contains(url) || self.to_crawl.iter().any(|pending| pending == url) {
                continue;
            }
            self.to_crawl.push(url.to_string());
            added += 1;
        }
        added
    }
}
