//! Client-side entity store.
//!
//! Speakers are keyed by identifier. Root query results keep only identifiers,
//! so a write through any operation is visible to every read of that speaker.
//! Sessions stay embedded in their owning speaker record.

use std::collections::{HashMap, HashSet};

use shared::domain::{FeaturedUpdate, Speaker, SpeakerId};

#[derive(Debug, Default, Clone)]
pub struct EntityStore {
    speakers: HashMap<SpeakerId, Speaker>,
    speaker_list: Option<Vec<SpeakerId>>,
    fetched_by_id: HashSet<SpeakerId>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_speakers(&mut self, speakers: Vec<Speaker>) {
        let mut ids = Vec::with_capacity(speakers.len());
        for speaker in speakers {
            ids.push(speaker.id.clone());
            self.speakers.insert(speaker.id.clone(), speaker);
        }
        self.speaker_list = Some(ids);
    }

    pub fn write_speaker(&mut self, speaker: Speaker) {
        self.fetched_by_id.insert(speaker.id.clone());
        self.speakers.insert(speaker.id.clone(), speaker);
    }

    /// Returns `true` when a cached speaker changed.
    pub fn merge_featured(&mut self, update: &FeaturedUpdate) -> bool {
        self.speakers
            .get_mut(&update.id)
            .map(|speaker| speaker.apply(update))
            .unwrap_or(false)
    }

    pub fn read_speakers(&self) -> Option<Vec<Speaker>> {
        let ids = self.speaker_list.as_ref()?;
        ids.iter()
            .map(|id| self.speakers.get(id).cloned())
            .collect()
    }

    pub fn read_speaker(&self, id: &SpeakerId) -> Option<Speaker> {
        self.speakers.get(id).cloned()
    }

    /// Whether `speakerById(id)` can be answered without the network.
    pub fn has_speaker_query(&self, id: &SpeakerId) -> bool {
        self.speakers.contains_key(id)
            && (self.fetched_by_id.contains(id)
                || self
                    .speaker_list
                    .as_ref()
                    .is_some_and(|ids| ids.contains(id)))
    }

    pub fn evict(&mut self, id: &SpeakerId) -> Option<Speaker> {
        self.fetched_by_id.remove(id);
        if let Some(ids) = self.speaker_list.as_mut() {
            ids.retain(|cached| cached != id);
        }
        self.speakers.remove(id)
    }

    pub fn clear(&mut self) {
        self.speakers.clear();
        self.speaker_list = None;
        self.fetched_by_id.clear();
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
