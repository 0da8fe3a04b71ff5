use std::fmt;
use std::io::Read;

use crate::error::PoolError;

/// Name of the derived topic that merges every map's callouts into one
/// pool. Never listed as a real topic, rebuilt on every load.
pub const ALL_TOPICS: &str = "all maps!";

// What players type to get the whole-pool quiz instead of a single map.
const ALL_TOPICS_ALIASES: [&str; 5] = ["RANDOM", "ALL", "ANY", "RND", "EVERYTHING"];

/// Reference to the image illustrating a callout. The engine never opens
/// the bytes, it only hands the reference to the delivery side.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AssetRef {
    pub topic: String,
    pub path: String,
}

impl AssetRef {
    pub fn new(topic: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            path: path.into(),
        }
    }

    /// The well-known stand-in image shown when the real one cannot be
    /// delivered.
    pub fn not_found() -> Self {
        Self::new("misc", "not_found.png")
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.topic, self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
struct Callout {
    label: String,
    asset: AssetRef,
}

/// A named pool of callout facts, one per map.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Topic {
    name: String,
    callouts: Vec<Callout>,
}

impl Topic {
    fn new(name: String) -> Self {
        Self {
            name,
            callouts: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.callouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callouts.is_empty()
    }

    /// Callout labels in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.callouts.iter().map(|c| c.label.as_str())
    }

    pub fn resolve(&self, label: &str) -> Result<&AssetRef, PoolError> {
        self.callouts
            .iter()
            .find(|c| c.label == label)
            .map(|c| &c.asset)
            .ok_or_else(|| PoolError::UnknownLabel {
                topic: self.name.clone(),
                label: label.to_string(),
            })
    }

    // Later writers replace the asset but keep the label's original slot,
    // so the merged pool stays in first-seen order.
    fn insert(&mut self, label: String, asset: AssetRef) {
        match self.callouts.iter_mut().find(|c| c.label == label) {
            Some(existing) => existing.asset = asset,
            None => self.callouts.push(Callout { label, asset }),
        }
    }
}

/// The full topic -> callout -> image pool, read-only after load.
#[derive(Debug, Clone, Default)]
pub struct CalloutPool {
    topics: Vec<Topic>,
    everything: Topic,
}

impl CalloutPool {
    pub fn from_reader(reader: impl Read) -> Result<Self, PoolError> {
        let mut pool = Self::default();
        pool.load(reader)?;
        Ok(pool)
    }

    /// Replace the pool contents from a JSON mapping of
    /// map -> callout -> image path.
    ///
    /// On any parse or shape problem the pool is left empty, so callers
    /// see "no topics available" rather than half-loaded data.
    pub fn load(&mut self, reader: impl Read) -> Result<(), PoolError> {
        // Cleared up front so an early return leaves nothing behind; half
        // a pool is worse than none
        self.topics.clear();
        self.everything = Topic::new(ALL_TOPICS.to_string());

        let root: serde_json::Value = serde_json::from_reader(reader)?;
        let root = root.as_object().ok_or(PoolError::Malformed)?;
        let mut topics: Vec<Topic> = Vec::new();
        for (name, callouts) in root {
            let callouts = callouts.as_object().ok_or(PoolError::Malformed)?;
            // Map names are case-normalized so "Bank" and "BANK" are the
            // same topic
            let name = name.to_uppercase();
            let topic = match topics.iter_mut().find(|t| t.name == name) {
                Some(existing) => existing,
                None => {
                    topics.push(Topic::new(name));
                    // just pushed
                    topics.last_mut().unwrap()
                }
            };
            for (label, path) in callouts {
                let path = path.as_str().ok_or(PoolError::Malformed)?;
                let asset = AssetRef::new(topic.name.clone(), path);
                topic.insert(label.clone(), asset);
            }
        }
        self.topics = topics;
        self.rebuild_everything();
        Ok(())
    }

    // The synthetic pool keeps whichever asset was written last for a
    // label shared between maps. A callout name reused on two maps loses
    // one entry here; that matches how the data has always merged.
    fn rebuild_everything(&mut self) {
        let mut everything = Topic::new(ALL_TOPICS.to_string());
        for topic in &self.topics {
            for callout in &topic.callouts {
                everything.insert(callout.label.clone(), callout.asset.clone());
            }
        }
        self.everything = everything;
    }

    /// Canonical topic listing, insertion order, without the synthetic
    /// all-maps entry.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(|t| t.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Case-insensitive lookup. "random", "all" and friends resolve to
    /// the merged all-maps pool.
    pub fn find_topic(&self, query: &str) -> Option<&Topic> {
        let upper = query.to_uppercase();
        if query == ALL_TOPICS || ALL_TOPICS_ALIASES.contains(&upper.as_str()) {
            if self.topics.is_empty() {
                return None;
            }
            return Some(&self.everything);
        }
        self.topics.iter().find(|t| t.name == upper)
    }

    pub fn resolve(&self, topic: &str, label: &str) -> Result<&AssetRef, PoolError> {
        let topic = self
            .find_topic(topic)
            .ok_or_else(|| PoolError::UnknownTopic(topic.to_string()))?;
        topic.resolve(label)
    }
}
