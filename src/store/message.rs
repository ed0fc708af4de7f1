use std::collections::BTreeMap;

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::RequestNum;

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: Id,
    pub ticket: RequestNum,
    pub sender: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
    pub status: Status,
    pub replies: Vec<Reply>,
    pub sent_at: OffsetDateTime,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub struct Id(Uuid);

impl Id {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Attachment {
    pub filename: String,
    #[serde(default)]
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub sender: String,
    pub body: String,
    pub sent_at: OffsetDateTime,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    Hash,
    PartialEq,
    Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Thread accepts replies.
    #[default]
    #[display("open")]
    Open,

    /// Thread is resolved. There is no way back to [`Status::Open`].
    #[display("closed")]
    Closed,
}

#[derive(Clone, Copy, Debug, Display, Error, PartialEq)]
#[display("message has neither text nor attachments")]
pub struct EmptyMessage;

/// In-memory log of message threads, in send order.
#[derive(Debug, Default)]
pub struct Store {
    log: Vec<Message>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new open thread on `ticket`.
    pub fn send(
        &mut self,
        ticket: RequestNum,
        sender: &str,
        body: &str,
        attachments: Vec<Attachment>,
    ) -> Result<Message, EmptyMessage> {
        if body.trim().is_empty() && attachments.is_empty() {
            return Err(EmptyMessage);
        }

        let message = Message {
            id: Id::new(),
            ticket,
            sender: sender.to_owned(),
            body: body.to_owned(),
            attachments,
            status: Status::Open,
            replies: Vec::new(),
            sent_at: OffsetDateTime::now_utc(),
        };
        info!(
            id = %message.id,
            ticket = %message.ticket,
            sender,
            "message sent"
        );

        self.log.push(message.clone());
        Ok(message)
    }

    /// Appends the reply to every open thread on `ticket` and returns how many
    /// threads received it.
    pub fn reply(
        &mut self,
        ticket: &RequestNum,
        sender: &str,
        body: &str,
    ) -> usize {
        let sent_at = OffsetDateTime::now_utc();
        let mut replied = 0;
        for message in self.threads_mut(ticket) {
            if message.status == Status::Open {
                message.replies.push(Reply {
                    sender: sender.to_owned(),
                    body: body.to_owned(),
                    sent_at,
                });
                replied += 1;
            }
        }
        replied
    }

    /// Closes every thread on `ticket` and returns how many were still open.
    pub fn close(&mut self, ticket: &RequestNum) -> usize {
        let mut closed = 0;
        for message in self.threads_mut(ticket) {
            if message.status == Status::Open {
                message.status = Status::Closed;
                closed += 1;
            }
        }
        if closed > 0 {
            info!(%ticket, closed, "threads closed");
        }
        closed
    }

    pub fn list_by_ticket(&self, ticket: &RequestNum) -> Vec<&Message> {
        self.log.iter().filter(|m| &m.ticket == ticket).collect()
    }

    pub fn list_by_status(
        &self,
        status: Status,
    ) -> BTreeMap<RequestNum, Vec<&Message>> {
        let mut groups = BTreeMap::<_, Vec<_>>::new();
        for message in self.log.iter().filter(|m| m.status == status) {
            groups.entry(message.ticket.clone()).or_default().push(message);
        }
        groups
    }

    fn threads_mut<'a>(
        &'a mut self,
        ticket: &'a RequestNum,
    ) -> impl Iterator<Item = &'a mut Message> + 'a {
        self.log.iter_mut().filter(move |m| &m.ticket == ticket)
    }
}
