//! Event model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use super::user::{Role, User};

/// Server-set event status. Independent of the participant count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Open,
    Full,
    Cancelled,
    Completed,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Open => write!(f, "open"),
            EventStatus::Full => write!(f, "full"),
            EventStatus::Cancelled => write!(f, "cancelled"),
            EventStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A user's projection onto an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub role: Role,
}

impl From<&User> for Participant {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            role: user.role,
        }
    }
}

/// Transient, refetch-replaceable copy of a backend event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    pub status: EventStatus,
    pub max_participants: u32,
    pub current_participants: u32,
    #[serde(default)]
    pub joining_fee: f64,
    pub host_id: String,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    /// Backend-owned aggregate, never recomputed locally
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub review_count: u32,
}

impl Event {
    pub fn is_paid(&self) -> bool {
        self.joining_fee > 0.0
    }

    pub fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    pub fn is_hosted_by(&self, user_id: &str) -> bool {
        self.host_id == user_id
    }

    /// `current_participants` agrees with the participant list
    pub fn is_consistent(&self) -> bool {
        self.current_participants as usize == self.participants.len()
    }

    /// Optimistically record a participant. Returns false if already present.
    pub fn add_participant(&mut self, participant: Participant) -> bool {
        if self.has_participant(&participant.user_id) {
            return false;
        }
        self.participants.push(participant);
        self.current_participants = self.current_participants.saturating_add(1);
        true
    }

    /// Optimistically drop a participant. Returns false if not present.
    pub fn remove_participant(&mut self, user_id: &str) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p.user_id != user_id);
        if self.participants.len() == before {
            return false;
        }
        self.current_participants = self.current_participants.saturating_sub(1);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> Event {
        serde_json::from_str(
            r#"{
                "_id": "evt_1",
                "title": "Lindy Night",
                "status": "open",
                "maxParticipants": 2,
                "currentParticipants": 1,
                "joiningFee": 0,
                "hostId": "host_1",
                "participants": [{"userId": "u1", "name": "Ada", "role": "user"}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_event_deserialization() {
        let event = sample_event();
        assert_eq!(event.id, "evt_1");
        assert_eq!(event.status, EventStatus::Open);
        assert!(!event.is_paid());
        assert!(event.is_consistent());
        assert!(event.has_participant("u1"));
    }

    #[test]
    fn test_add_participant_is_unique() {
        let mut event = sample_event();
        let participant = Participant {
            user_id: "u2".to_string(),
            name: "Grace".to_string(),
            avatar: None,
            role: Role::User,
        };

        assert!(event.add_participant(participant.clone()));
        assert!(!event.add_participant(participant));
        assert_eq!(event.current_participants, 2);
        assert!(event.is_consistent());
        assert!(event.is_full());
    }

    #[test]
    fn test_remove_missing_participant_keeps_count() {
        let mut event = sample_event();
        assert!(!event.remove_participant("nobody"));
        assert_eq!(event.current_participants, 1);

        assert!(event.remove_participant("u1"));
        assert!(!event.remove_participant("u1"));
        assert_eq!(event.current_participants, 0);
        assert!(event.is_consistent());
    }
}
