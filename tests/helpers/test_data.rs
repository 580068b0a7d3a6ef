//! Test data helpers for creating test objects
//!
//! This module provides builders for users, events, reviews, payment intents
//! and cards.

use chrono::{Datelike, Utc};
use EventHub::models::{
    CardDetails, Event, EventStatus, Participant, PaymentIntent, Review, ReviewSummary, Role, User,
};

pub const EVENT_ID: &str = "evt_1";
pub const HOST_ID: &str = "host_1";
pub const INTENT_ID: &str = "pi_test_123";

pub fn create_test_user(id: &str, role: Role) -> User {
    User {
        id: id.to_string(),
        name: format!("User {}", id),
        email: Some(format!("{}@example.com", id)),
        avatar: None,
        role,
    }
}

pub fn attendee(id: &str) -> User {
    create_test_user(id, Role::User)
}

pub fn host() -> User {
    create_test_user(HOST_ID, Role::Host)
}

pub fn admin() -> User {
    create_test_user("admin_1", Role::Admin)
}

/// Builder for test events; defaults to an open, free event with room
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    pub fn new() -> Self {
        Self {
            event: Event {
                id: EVENT_ID.to_string(),
                title: "Friday Lindy Social".to_string(),
                status: EventStatus::Open,
                max_participants: 10,
                current_participants: 0,
                joining_fee: 0.0,
                host_id: HOST_ID.to_string(),
                participants: Vec::new(),
                date: None,
                location: Some("Main Hall".to_string()),
                average_rating: None,
                review_count: 0,
            },
        }
    }

    pub fn status(mut self, status: EventStatus) -> Self {
        self.event.status = status;
        self
    }

    pub fn capacity(mut self, max: u32) -> Self {
        self.event.max_participants = max;
        self
    }

    pub fn fee(mut self, fee: f64) -> Self {
        self.event.joining_fee = fee;
        self
    }

    /// Add `count` anonymous attendees
    pub fn with_others(mut self, count: u32) -> Self {
        for i in 0..count {
            self.event.add_participant(Participant {
                user_id: format!("other_{}", i),
                name: format!("Other {}", i),
                avatar: None,
                role: Role::User,
            });
        }
        self
    }

    pub fn with_participant(mut self, user: &User) -> Self {
        self.event.add_participant(Participant::from(user));
        self
    }

    pub fn build(self) -> Event {
        self.event
    }
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create_test_review(id: &str, author_id: &str, rating: u8) -> Review {
    Review {
        id: id.to_string(),
        event_id: EVENT_ID.to_string(),
        author_id: author_id.to_string(),
        rating,
        comment: Some("Great night".to_string()),
        host_id: HOST_ID.to_string(),
        created_at: Some(Utc::now()),
    }
}

pub fn review_summary(reviews: Vec<Review>, average: Option<f64>) -> ReviewSummary {
    ReviewSummary {
        total_reviews: reviews.len() as u32,
        reviews,
        average_rating: average,
    }
}

pub fn create_test_intent(amount: f64) -> PaymentIntent {
    PaymentIntent {
        id: INTENT_ID.to_string(),
        client_secret: format!("{}_secret_abc", INTENT_ID),
        amount,
        event_id: EVENT_ID.to_string(),
    }
}

pub fn valid_card() -> CardDetails {
    CardDetails::new("4242 4242 4242 4242", 12, Utc::now().year() + 3, "123")
}

pub fn short_card() -> CardDetails {
    CardDetails::new("4242", 12, Utc::now().year() + 3, "123")
}
