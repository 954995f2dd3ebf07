//! Ties sessions to video meetings.
//!
//! Two call sites, two failure policies: creating a session books a meeting on a
//! best-effort basis, while an explicit refresh reports vendor failures to the caller.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use learning_utils::session::{Session, SessionPatch, duration_minutes};
use tracing::{error, info, warn};
use zoom::{Meeting, MeetingRequest};

use crate::{config::AppState, error::Error};

/// Meetings are never booked closer to now than this
pub const MEETING_LEAD_MINUTES: i64 = 2;

/// The start actually booked with the vendor.
///
/// The nominal start (date + start time, UTC) is replaced by now + 2 minutes when it
/// cannot be parsed or lies before that point. The substitution is silent.
pub fn effective_start(date: &str, start_time: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let earliest = now + Duration::minutes(MEETING_LEAD_MINUTES);
    let nominal = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .zip(NaiveTime::parse_from_str(start_time, "%H:%M").ok())
        .map(|(day, time)| day.and_time(time).and_utc());

    match nominal {
        Some(start) if start >= earliest => start,
        _ => earliest,
    }
}

pub fn meeting_request(session: &Session, now: DateTime<Utc>) -> MeetingRequest {
    MeetingRequest {
        topic: session.title.clone(),
        start_time: effective_start(&session.date, &session.start_time, now),
        duration: duration_minutes(&session.duration),
        timezone: Some("UTC".to_string()),
    }
}

fn meeting_patch(meeting: Meeting) -> SessionPatch {
    SessionPatch {
        zoom_meeting_id: Some(meeting.id),
        zoom_join_url: Some(meeting.join_url),
        zoom_start_url: Some(meeting.start_url),
        ..Default::default()
    }
}

/// Creation-time policy: any failure is logged and the session is returned without meeting fields
pub async fn attach_meeting_best_effort(state: &AppState, session: Session) -> Session {
    let request = meeting_request(&session, state.clock.now());

    let meeting = match state.meetings.create_meeting(&request).await {
        Ok(meeting) => meeting,
        Err(e) => {
            warn!(session = %session.id, error = %e, "Zoom meeting create failed; continuing without Zoom");
            return session;
        }
    };

    match state.sessions.update(&session.id, meeting_patch(meeting)) {
        Ok(updated) => {
            info!(session = %updated.id, meeting = ?updated.zoom_meeting_id, "meeting attached");
            updated
        }
        Err(e) => {
            warn!(session = %session.id, error = %e, "unable to attach meeting to session");
            session
        }
    }
}

/// Refresh policy: vendor failures become a 500 for the caller
pub async fn refresh_meeting(state: &AppState, session_id: &str) -> Result<Session, Error> {
    let session = state
        .sessions
        .get_by_id(session_id)
        .ok_or_else(Error::not_found)?;
    let request = meeting_request(&session, state.clock.now());

    let meeting = state.meetings.create_meeting(&request).await.map_err(|e| {
        error!(session = %session_id, error = %e, "Zoom meeting refresh failed");
        Error::Server(
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            "Zoom create failed".to_string(),
        )
    })?;

    Ok(state.sessions.update(session_id, meeting_patch(meeting))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 14, 9, 0, 0).unwrap()
    }

    #[test]
    fn future_start_is_kept() {
        assert_eq!(
            effective_start("2030-03-14", "10:00", now()),
            Utc.with_ymd_and_hms(2030, 3, 14, 10, 0, 0).unwrap()
        );
        // Exactly at the lead boundary is still acceptable
        assert_eq!(
            effective_start("2030-03-14", "09:02", now()),
            now() + Duration::minutes(2)
        );
    }

    #[test]
    fn past_or_imminent_start_is_pushed_forward() {
        let earliest = now() + Duration::minutes(2);
        assert_eq!(effective_start("2030-03-14", "09:01", now()), earliest);
        assert_eq!(effective_start("2020-01-01", "10:00", now()), earliest);
    }

    #[test]
    fn unparsable_start_falls_back_silently() {
        let earliest = now() + Duration::minutes(2);
        assert_eq!(effective_start("soon", "10:00", now()), earliest);
        assert_eq!(effective_start("2030-03-14", "", now()), earliest);
    }
}
