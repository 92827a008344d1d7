use shared::domain::SpeakerId;

const SPEAKERS_PATH: &str = "/conference/speakers";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Speakers,
    Speaker(SpeakerId),
}

impl Route {
    /// Matches `/conference/speakers` and `/conference/speakers/{speaker_id}`.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = path.trim_end_matches('/');
        let rest = path.strip_prefix(SPEAKERS_PATH)?;
        if rest.is_empty() {
            return Some(Route::Speakers);
        }
        let speaker_id = rest.strip_prefix('/')?;
        if speaker_id.is_empty() || speaker_id.contains('/') {
            return None;
        }
        Some(Route::Speaker(SpeakerId::new(speaker_id)))
    }

    pub fn path(&self) -> String {
        match self {
            Route::Speakers => SPEAKERS_PATH.to_string(),
            Route::Speaker(id) => format!("{SPEAKERS_PATH}/{id}"),
        }
    }
}
