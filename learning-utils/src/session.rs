use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    clock::Clock,
    error::Error,
    storage::{MemoryStorage, Storage},
};

pub const DEFAULT_START_TIME: &str = "10:00";
pub const DEFAULT_END_TIME: &str = "11:00";
pub const DEFAULT_DURATION: &str = "60 min";
const DEFAULT_MEETING_MINUTES: u32 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Upcoming,
    Live,
    Completed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Live,
    #[default]
    Scheduled,
    Recorded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    File,
    Link,
    Text,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionMaterial {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MaterialKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    pub course: String,
    pub course_code: String,
    pub instructor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_id: Option<String>,
    /// Calendar day, `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`, UTC
    pub start_time: String,
    /// `HH:MM`, UTC
    pub end_time: String,
    pub duration: String,
    pub description: String,
    /// Cache of the last derived value, see [`derive_status`]
    pub status: SessionStatus,
    pub participants: u32,
    pub expected_participants: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement: Option<f64>,
    #[serde(rename = "type")]
    pub kind: SessionKind,
    pub recording_available: bool,
    pub materials: Vec<SessionMaterial>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom_meeting_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom_join_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom_start_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session length as sent by clients: either a label such as `"90 min"` or a number of minutes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionDuration {
    Minutes(u32),
    Label(String),
}

impl SessionDuration {
    pub fn to_label(&self) -> String {
        match self {
            SessionDuration::Minutes(m) => format!("{m} min"),
            SessionDuration::Label(s) => s.clone(),
        }
    }
}

/// Fields accepted when creating a session. Anything missing is defaulted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub title: Option<String>,
    pub course: Option<String>,
    pub course_code: Option<String>,
    pub instructor: Option<String>,
    pub instructor_id: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<SessionDuration>,
    pub description: Option<String>,
    pub expected_participants: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<SessionKind>,
    pub materials: Option<Vec<SessionMaterial>>,
}

/// Partial update, merged over the stored record
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    pub title: Option<String>,
    pub course: Option<String>,
    pub course_code: Option<String>,
    pub instructor: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<SessionDuration>,
    pub description: Option<String>,
    pub expected_participants: Option<u32>,
    pub engagement: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<SessionKind>,
    pub recording_available: Option<bool>,
    pub materials: Option<Vec<SessionMaterial>>,
    pub zoom_meeting_id: Option<String>,
    pub zoom_join_url: Option<String>,
    pub zoom_start_url: Option<String>,
}

/// Turns a calendar day and same-day `HH:MM` bounds into UTC instants.
///
/// Windows crossing midnight (`start_time > end_time`) are not supported.
pub fn schedule_window(
    date: &str,
    start_time: &str,
    end_time: &str,
) -> Result<(DateTime<Utc>, DateTime<Utc>), Error> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| Error::InvalidSchedule(format!("date '{date}' is not YYYY-MM-DD: {e}")))?;
    let start = parse_clock_time(start_time)?;
    let end = parse_clock_time(end_time)?;

    if start > end {
        return Err(Error::InvalidSchedule(format!(
            "start time {start_time} is after end time {end_time}; sessions crossing midnight are unsupported"
        )));
    }

    Ok((day.and_time(start).and_utc(), day.and_time(end).and_utc()))
}

fn parse_clock_time(time: &str) -> Result<NaiveTime, Error> {
    NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|e| Error::InvalidSchedule(format!("time '{time}' is not HH:MM: {e}")))
}

pub fn derive_status(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> SessionStatus {
    if now < start {
        SessionStatus::Upcoming
    } else if now <= end {
        SessionStatus::Live
    } else {
        SessionStatus::Completed
    }
}

pub fn status_at(
    date: &str,
    start_time: &str,
    end_time: &str,
    now: DateTime<Utc>,
) -> Result<SessionStatus, Error> {
    let (start, end) = schedule_window(date, start_time, end_time)?;
    Ok(derive_status(start, end, now))
}

/// Minutes to book for a meeting: the leading number of a `"N min"` label, otherwise 60
pub fn duration_minutes(duration: &str) -> u32 {
    if !duration.contains("min") {
        return DEFAULT_MEETING_MINUTES;
    }
    let digits: String = duration
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(DEFAULT_MEETING_MINUTES)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Owns every session record. One lock guards the whole store.
pub struct SessionStore<S = MemoryStorage<String, Session>> {
    storage: Mutex<S>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    /// In-memory store seeded with the demo session `"1"`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        let mut storage = MemoryStorage::new();
        let mut seed = Session {
            id: "1".to_string(),
            title: "Neural Networks".to_string(),
            course: "Machine Learning Fundamentals".to_string(),
            course_code: "CS301".to_string(),
            instructor: "Dr. Jane Smith".to_string(),
            instructor_id: None,
            date: "2023-10-15".to_string(),
            start_time: "14:00".to_string(),
            end_time: "15:30".to_string(),
            duration: "90 min".to_string(),
            description: String::new(),
            status: SessionStatus::Upcoming,
            participants: 0,
            expected_participants: 0,
            engagement: None,
            kind: SessionKind::Scheduled,
            recording_available: false,
            materials: vec![],
            zoom_meeting_id: None,
            zoom_join_url: None,
            zoom_start_url: None,
            created_at: now,
            updated_at: now,
        };
        refresh_status(&mut seed, now);
        storage.set(seed.id.clone(), seed);

        Self::with_storage(storage, clock)
    }
}

impl<S> SessionStore<S>
where
    S: Storage<String, Session>,
{
    pub fn with_storage(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage: Mutex::new(storage),
            clock,
        }
    }

    pub fn list(&self) -> Vec<Session> {
        let now = self.clock.now();
        self.storage
            .lock()
            .list()
            .into_iter()
            .map(|mut s| {
                refresh_status(&mut s, now);
                s
            })
            .collect()
    }

    pub fn get_by_id(&self, id: &str) -> Option<Session> {
        let mut session = self.storage.lock().get(&id.to_string())?;
        refresh_status(&mut session, self.clock.now());
        Some(session)
    }

    pub fn find_by_meeting_id(&self, meeting_id: &str) -> Option<Session> {
        self.list()
            .into_iter()
            .find(|s| s.zoom_meeting_id.as_deref() == Some(meeting_id))
    }

    pub fn create(&self, new: NewSession) -> Result<Session, Error> {
        let now = self.clock.now();
        let date = non_empty(new.date).unwrap_or_else(|| now.format("%Y-%m-%d").to_string());
        let start_time = non_empty(new.start_time).unwrap_or_else(|| DEFAULT_START_TIME.into());
        let end_time = non_empty(new.end_time).unwrap_or_else(|| DEFAULT_END_TIME.into());
        let status = status_at(&date, &start_time, &end_time, now)?;

        let mut storage = self.storage.lock();
        let id = next_id(&*storage, now);

        let session = Session {
            id: id.clone(),
            title: non_empty(new.title).unwrap_or_else(|| "Untitled Session".into()),
            course: new.course.unwrap_or_default(),
            course_code: new.course_code.unwrap_or_default(),
            instructor: non_empty(new.instructor).unwrap_or_else(|| "Instructor".into()),
            instructor_id: new.instructor_id,
            date,
            start_time,
            end_time,
            duration: new
                .duration
                .map(|d| d.to_label())
                .and_then(|d| non_empty(Some(d)))
                .unwrap_or_else(|| DEFAULT_DURATION.into()),
            description: new.description.unwrap_or_default(),
            status,
            participants: 0,
            expected_participants: new.expected_participants.unwrap_or(0),
            engagement: Some(0.0),
            kind: new.kind.unwrap_or_default(),
            recording_available: false,
            materials: new.materials.unwrap_or_default(),
            zoom_meeting_id: None,
            zoom_join_url: None,
            zoom_start_url: None,
            created_at: now,
            updated_at: now,
        };

        storage.set(id, session.clone());
        debug!(session = %session.id, status = ?session.status, "session created");
        Ok(session)
    }

    pub fn update(&self, id: &str, patch: SessionPatch) -> Result<Session, Error> {
        if let Some(engagement) = patch.engagement {
            if !(0.0..=100.0).contains(&engagement) {
                return Err(Error::Validation(format!(
                    "engagement must be between 0 and 100, got {engagement}"
                )));
            }
        }

        let now = self.clock.now();
        let mut storage = self.storage.lock();
        let mut session = storage
            .get(&id.to_string())
            .ok_or_else(|| Error::NotFound(format!("session {id} not found")))?;

        let SessionPatch {
            title,
            course,
            course_code,
            instructor,
            date,
            start_time,
            end_time,
            duration,
            description,
            expected_participants,
            engagement,
            kind,
            recording_available,
            materials,
            zoom_meeting_id,
            zoom_join_url,
            zoom_start_url,
        } = patch;

        let date = non_empty(date).unwrap_or_else(|| session.date.clone());
        let start_time = non_empty(start_time).unwrap_or_else(|| session.start_time.clone());
        let end_time = non_empty(end_time).unwrap_or_else(|| session.end_time.clone());
        session.status = status_at(&date, &start_time, &end_time, now)?;
        session.date = date;
        session.start_time = start_time;
        session.end_time = end_time;

        if let Some(title) = title {
            session.title = title;
        }
        if let Some(course) = course {
            session.course = course;
        }
        if let Some(course_code) = course_code {
            session.course_code = course_code;
        }
        if let Some(instructor) = instructor {
            session.instructor = instructor;
        }
        if let Some(duration) = duration {
            session.duration = duration.to_label();
        }
        if let Some(description) = description {
            session.description = description;
        }
        if let Some(expected) = expected_participants {
            session.expected_participants = expected;
        }
        if engagement.is_some() {
            session.engagement = engagement;
        }
        if let Some(kind) = kind {
            session.kind = kind;
        }
        if let Some(recording_available) = recording_available {
            session.recording_available = recording_available;
        }
        if let Some(materials) = materials {
            session.materials = materials;
        }
        if zoom_meeting_id.is_some() {
            session.zoom_meeting_id = zoom_meeting_id;
        }
        if zoom_join_url.is_some() {
            session.zoom_join_url = zoom_join_url;
        }
        if zoom_start_url.is_some() {
            session.zoom_start_url = zoom_start_url;
        }
        session.updated_at = now;

        storage.set(session.id.clone(), session.clone());
        Ok(session)
    }

    pub fn remove(&self, id: &str) -> bool {
        self.storage.lock().delete(&id.to_string()).is_some()
    }

    /// Counts a join. Repeated joins by the same user are all counted.
    pub fn join(&self, id: &str, user_id: &str) -> bool {
        let mut storage = self.storage.lock();
        let Some(mut session) = storage.get(&id.to_string()) else {
            return false;
        };
        session.participants += 1;
        session.updated_at = self.clock.now();
        debug!(session = %id, user = %user_id, participants = session.participants, "joined session");
        storage.set(session.id.clone(), session);
        true
    }
}

/// Time-based id, bumped until it is unused
fn next_id<S: Storage<String, Session>>(storage: &S, now: DateTime<Utc>) -> String {
    let mut candidate = now.timestamp_millis();
    while storage.contains(&candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}

fn refresh_status(session: &mut Session, now: DateTime<Utc>) {
    if let Ok(status) = status_at(&session.date, &session.start_time, &session.end_time, now) {
        session.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 14, h, m, 0).unwrap()
    }

    fn empty_store(clock: Arc<FixedClock>) -> SessionStore {
        SessionStore::with_storage(MemoryStorage::new(), clock)
    }

    #[test]
    fn status_follows_the_clock_through_the_window() {
        let cases = [
            (at(9, 59), SessionStatus::Upcoming),
            (at(10, 0), SessionStatus::Live),
            (at(10, 30), SessionStatus::Live),
            (at(11, 0), SessionStatus::Live),
            (at(11, 1), SessionStatus::Completed),
        ];
        for (now, expected) in cases {
            let status = status_at("2030-03-14", "10:00", "11:00", now).unwrap();
            assert_eq!(status, expected, "at {now}");
        }
    }

    #[test]
    fn window_crossing_midnight_is_rejected() {
        let err = schedule_window("2030-03-14", "23:00", "01:00").unwrap_err();
        assert!(matches!(err, Error::InvalidSchedule(_)));
    }

    #[test]
    fn malformed_schedule_is_rejected() {
        assert!(schedule_window("14/03/2030", "10:00", "11:00").is_err());
        assert!(schedule_window("2030-03-14", "10am", "11:00").is_err());
    }

    #[test]
    fn duration_minutes_reads_leading_number() {
        assert_eq!(duration_minutes("90 min"), 90);
        assert_eq!(duration_minutes("45min"), 45);
        assert_eq!(duration_minutes("1 hour"), 60);
        assert_eq!(duration_minutes("min"), 60);
        assert_eq!(SessionDuration::Minutes(30).to_label(), "30 min");
    }

    #[test]
    fn create_fills_defaults() {
        let clock = Arc::new(FixedClock::new(at(8, 0)));
        let store = empty_store(clock);

        let session = store.create(NewSession::default()).unwrap();

        assert_eq!(session.title, "Untitled Session");
        assert_eq!(session.instructor, "Instructor");
        assert_eq!(session.date, "2030-03-14");
        assert_eq!(session.start_time, "10:00");
        assert_eq!(session.end_time, "11:00");
        assert_eq!(session.duration, "60 min");
        assert_eq!(session.participants, 0);
        assert_eq!(session.kind, SessionKind::Scheduled);
        assert_eq!(session.status, SessionStatus::Upcoming);
        assert_eq!(session.created_at, at(8, 0));
        assert_eq!(session.id, at(8, 0).timestamp_millis().to_string());
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let clock = Arc::new(FixedClock::new(at(8, 0)));
        let store = empty_store(clock);

        let a = store.create(NewSession::default()).unwrap();
        let b = store.create(NewSession::default()).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn update_merges_and_recomputes_status() {
        let clock = Arc::new(FixedClock::new(at(10, 30)));
        let store = empty_store(clock.clone());
        let session = store.create(NewSession::default()).unwrap();
        assert_eq!(session.status, SessionStatus::Live);

        clock.advance(Duration::minutes(1));
        let updated = store
            .update(
                &session.id,
                SessionPatch {
                    start_time: Some("12:00".into()),
                    end_time: Some("13:00".into()),
                    title: Some("Backprop".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.status, SessionStatus::Upcoming);
        assert_eq!(updated.title, "Backprop");
        assert_eq!(updated.date, session.date);
        assert_eq!(updated.updated_at, at(10, 31));
        assert_eq!(updated.created_at, session.created_at);
    }

    #[test]
    fn update_rejects_inverted_window_and_keeps_record() {
        let clock = Arc::new(FixedClock::new(at(8, 0)));
        let store = empty_store(clock);
        let session = store.create(NewSession::default()).unwrap();

        let err = store
            .update(
                &session.id,
                SessionPatch {
                    start_time: Some("12:00".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert!(matches!(err, Error::InvalidSchedule(_)));
        assert_eq!(store.get_by_id(&session.id).unwrap().start_time, "10:00");
    }

    #[test]
    fn engagement_must_stay_within_percentage_range() {
        let store = empty_store(Arc::new(FixedClock::new(at(8, 0))));
        let session = store.create(NewSession::default()).unwrap();
        let engagement = |value| SessionPatch {
            engagement: Some(value),
            ..Default::default()
        };

        for rejected in [101.0, -1.0, 150.0] {
            let err = store.update(&session.id, engagement(rejected)).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{rejected}");
        }
        let stored = store.get_by_id(&session.id).unwrap();
        assert_eq!(stored.engagement, Some(0.0));
        assert_eq!(stored.updated_at, session.updated_at);

        for accepted in [0.0, 100.0, 42.5] {
            let updated = store.update(&session.id, engagement(accepted)).unwrap();
            assert_eq!(updated.engagement, Some(accepted));
        }
    }

    #[test]
    fn update_of_unknown_session_is_not_found() {
        let store = empty_store(Arc::new(FixedClock::new(at(8, 0))));
        let err = store.update("nope", SessionPatch::default()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn reads_rederive_status() {
        let clock = Arc::new(FixedClock::new(at(9, 0)));
        let store = empty_store(clock.clone());
        let session = store.create(NewSession::default()).unwrap();
        assert_eq!(session.status, SessionStatus::Upcoming);

        clock.set(at(12, 0));
        assert_eq!(
            store.get_by_id(&session.id).unwrap().status,
            SessionStatus::Completed
        );
    }

    #[test]
    fn repeated_joins_all_count() {
        let store = empty_store(Arc::new(FixedClock::new(at(8, 0))));
        let session = store.create(NewSession::default()).unwrap();

        for _ in 0..3 {
            assert!(store.join(&session.id, "u1"));
        }

        assert_eq!(store.get_by_id(&session.id).unwrap().participants, 3);
        assert!(!store.join("missing", "u1"));
    }

    #[test]
    fn remove_deletes_permanently() {
        let store = empty_store(Arc::new(FixedClock::new(at(8, 0))));
        let session = store.create(NewSession::default()).unwrap();

        assert!(store.remove(&session.id));
        assert!(!store.remove(&session.id));
        assert!(store.get_by_id(&session.id).is_none());
    }

    #[test]
    fn seeded_store_holds_demo_session() {
        let store = SessionStore::new(Arc::new(FixedClock::new(at(8, 0))));
        let sessions = store.list();

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "1");
        assert_eq!(sessions[0].status, SessionStatus::Completed);
    }

    #[test]
    fn meeting_lookup_matches_attached_id() {
        let store = empty_store(Arc::new(FixedClock::new(at(8, 0))));
        let session = store.create(NewSession::default()).unwrap();
        store
            .update(
                &session.id,
                SessionPatch {
                    zoom_meeting_id: Some("8123".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(store.find_by_meeting_id("8123").unwrap().id, session.id);
        assert!(store.find_by_meeting_id("9999").is_none());
    }
}
