use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::user::ActorSummary;
use crate::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationVerb {
    Like,
    Comment,
    Follow,
}

/// Kind of object a notification points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Post,
    Comment,
    User,
}

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(AppError::InternalError(format!(
                        "Unknown {} value: {}", stringify!($ty), other
                    ))),
                }
            }
        }
    };
}

text_enum!(NotificationVerb { Like => "like", Comment => "comment", Follow => "follow" });
text_enum!(TargetType { Post => "post", Comment => "comment", User => "user" });

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    pub verb: NotificationVerb,
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn new(recipient_id: Uuid, actor_id: Uuid, verb: NotificationVerb, target_type: TargetType, target_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id,
            actor_id,
            verb,
            target_type,
            target_id,
            timestamp: Utc::now(),
            read: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub actor: ActorSummary,
    pub verb: NotificationVerb,
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// Payload of a notification page: the recipient's unread total plus the page rows.
#[derive(Debug, Serialize)]
pub struct NotificationFeed {
    pub unread_count: u64,
    pub notifications: Vec<NotificationResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_round_trip() {
        assert_eq!("like".parse::<NotificationVerb>().unwrap(), NotificationVerb::Like);
        assert_eq!(TargetType::Comment.as_str(), "comment");
        assert!("share".parse::<NotificationVerb>().is_err());
    }
}
