use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::store::{self, RequestNum};

pub use crate::store::message::{Id, Status};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Id,
    pub ticket: RequestNum,
    pub sender: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
    pub status: Status,
    pub replies: Vec<Reply>,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
}

/// Attachment contents are not echoed back, only their name and size.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Attachment {
    pub filename: String,
    pub size: usize,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub sender: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
}

impl From<&store::Message> for Message {
    fn from(m: &store::Message) -> Self {
        Self {
            id: m.id,
            ticket: m.ticket.clone(),
            sender: m.sender.clone(),
            body: m.body.clone(),
            attachments: m
                .attachments
                .iter()
                .map(|a| Attachment {
                    filename: a.filename.clone(),
                    size: a.data.len(),
                })
                .collect(),
            status: m.status,
            replies: m
                .replies
                .iter()
                .map(|r| Reply {
                    sender: r.sender.clone(),
                    body: r.body.clone(),
                    sent_at: r.sent_at,
                })
                .collect(),
            sent_at: m.sent_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Thread {
    pub messages: Vec<Message>,
}

/// Messages of one status, grouped by ticket.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Board {
    pub tickets: BTreeMap<RequestNum, Vec<Message>>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Updated {
    /// Threads the command changed.
    pub threads: usize,
}
