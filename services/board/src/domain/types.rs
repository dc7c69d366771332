use std::str::FromStr;

use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered board user.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// argon2 PHC string.
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_activated: bool,
    pub send_messages: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

// ── Rubrics ──────────────────────────────────────────────────────────────────

/// Raw rubric row. `super_rubric_id == None` marks a super-rubric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rubric {
    pub id: i32,
    pub name: String,
    pub order: i16,
    pub super_rubric_id: Option<i32>,
}

impl Rubric {
    pub fn is_super(&self) -> bool {
        self.super_rubric_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperRubric {
    pub id: i32,
    pub name: String,
    pub order: i16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRubric {
    pub id: i32,
    pub name: String,
    pub order: i16,
    pub super_rubric: SuperRubric,
}

impl SubRubric {
    /// `"<super name> - <name>"`.
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.super_rubric.name, self.name)
    }
}

/// Sub-rubrics of one super-rubric, for navigation menus.
#[derive(Debug, Clone)]
pub struct RubricGroup {
    pub super_rubric: SuperRubric,
    pub sub_rubrics: Vec<SubRubric>,
}

/// Super-rubrics ordered by `(order, name)`.
pub fn super_rubrics(rubrics: &[Rubric]) -> Vec<SuperRubric> {
    let mut out: Vec<SuperRubric> = rubrics
        .iter()
        .filter(|r| r.is_super())
        .map(|r| SuperRubric {
            id: r.id,
            name: r.name.clone(),
            order: r.order,
        })
        .collect();
    out.sort_by(|a, b| (a.order, &a.name).cmp(&(b.order, &b.name)));
    out
}

/// Sub-rubrics ordered by `(super.order, super.name, order, name)`.
///
/// Rows whose parent is missing or is itself a sub-rubric are skipped.
pub fn sub_rubrics(rubrics: &[Rubric]) -> Vec<SubRubric> {
    let supers = super_rubrics(rubrics);
    let mut out: Vec<SubRubric> = rubrics
        .iter()
        .filter_map(|r| {
            let parent_id = r.super_rubric_id?;
            let parent = supers.iter().find(|s| s.id == parent_id)?;
            Some(SubRubric {
                id: r.id,
                name: r.name.clone(),
                order: r.order,
                super_rubric: parent.clone(),
            })
        })
        .collect();
    out.sort_by(|a, b| {
        (
            a.super_rubric.order,
            &a.super_rubric.name,
            a.order,
            &a.name,
        )
            .cmp(&(
                b.super_rubric.order,
                &b.super_rubric.name,
                b.order,
                &b.name,
            ))
    });
    out
}

/// Group already-ordered sub-rubrics under their super-rubric.
pub fn group_by_super(subs: Vec<SubRubric>) -> Vec<RubricGroup> {
    let mut groups: Vec<RubricGroup> = Vec::new();
    for sub in subs {
        match groups.last_mut() {
            Some(g) if g.super_rubric.id == sub.super_rubric.id => g.sub_rubrics.push(sub),
            _ => groups.push(RubricGroup {
                super_rubric: sub.super_rubric.clone(),
                sub_rubrics: vec![sub],
            }),
        }
    }
    groups
}

// ── Listings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: Uuid,
    pub rubric_id: i32,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub price: f64,
    pub contacts: String,
    /// Storage path relative to the media root.
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalImage {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub author: String,
    pub content: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Maximum listings shown on the home page.
pub const HOME_LISTINGS: u64 = 10;

// ── Captcha ──────────────────────────────────────────────────────────────────

/// Challenge shown next to the guest comment form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaChallenge {
    /// Opaque key posted back with the answer.
    pub key: String,
    pub question: String,
}

/// Stored captcha answer.
#[derive(Debug, Clone)]
pub struct CaptchaRecord {
    pub id: Uuid,
    pub answer: String,
    pub expires_at: DateTime<Utc>,
}

/// Captcha time-to-live in seconds.
pub const CAPTCHA_TTL_SECS: i64 = 600;

// ── Outbox ───────────────────────────────────────────────────────────────────

/// Outbox event for the mail relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
}

/// Rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Letter {
    pub to: String,
    pub subject: String,
    pub body: String,
}

// ── Admin filters ────────────────────────────────────────────────────────────

/// User selection used by the operator when reviewing activation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationFilter {
    /// Active and activated users.
    Activated,
    /// Unactivated users who joined more than three days ago.
    ThreeDays,
    /// Intended as "more than a week"; uses the same three-day cutoff as `ThreeDays`.
    Week,
}

impl ActivationFilter {
    /// Days before today that `date_joined` must precede.
    fn cutoff_days(self) -> u64 {
        match self {
            Self::Activated => 0,
            Self::ThreeDays | Self::Week => 3,
        }
    }

    /// Join-date cutoff: midnight UTC of `today - n days`. `None` for `Activated`.
    pub fn joined_before(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self == Self::Activated {
            return None;
        }
        let day = now.date_naive().checked_sub_days(Days::new(self.cutoff_days()))?;
        Some(day.and_time(NaiveTime::MIN).and_utc())
    }

    pub fn matches(self, user: &User, now: DateTime<Utc>) -> bool {
        match self.joined_before(now) {
            None => user.is_active && user.is_activated,
            Some(cutoff) => !user.is_active && !user.is_activated && user.date_joined < cutoff,
        }
    }
}

impl FromStr for ActivationFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activated" => Ok(Self::Activated),
            "threedays" => Ok(Self::ThreeDays),
            "week" => Ok(Self::Week),
            other => Err(format!(
                "unknown filter '{other}' (expected activated, threedays or week)"
            )),
        }
    }
}
