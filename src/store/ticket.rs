use std::{sync::Arc, time::Duration};

use derive_more::{Display, Error};
use futures::future;
use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info, warn};

use super::{DataUnavailable, RequestNum, Source};

#[derive(Clone, Debug, PartialEq)]
pub struct Ticket {
    pub request_num: RequestNum,
    pub collection: Collection,
    /// `None` when the source coordinates are missing or unusable.
    pub position: Option<Position>,
    pub excavator: Option<String>,
    pub assigned_name: Option<String>,
    pub completed_by: Option<String>,
    pub status: Option<String>,
    pub work_to_begin_date: Option<String>,
    pub date_completed: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
}

impl Ticket {
    /// Identity responsible for the ticket in its collection: the assignee
    /// while open, the completer once closed.
    pub fn locator(&self) -> Option<&str> {
        match self.collection {
            Collection::Open => self.assigned_name.as_deref(),
            Collection::Closed => self.completed_by.as_deref(),
        }
    }

    pub fn date(&self, column: DateColumn) -> Option<&str> {
        match column {
            DateColumn::WorkToBeginDate => self.work_to_begin_date.as_deref(),
            DateColumn::DateCompleted => self.date_completed.as_deref(),
        }
    }
}

/// Source partition a ticket was read from.
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
pub enum Collection {
    #[default]
    #[display("open")]
    Open,
    #[display("closed")]
    Closed,
}

impl Collection {
    pub const ALL: [Self; 2] = [Self::Open, Self::Closed];
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DateColumn {
    WorkToBeginDate,
    DateCompleted,
}

impl DateColumn {
    /// Column a dashboard filters on when none is asked for explicitly.
    pub fn default_for(collection: Collection) -> Self {
        match collection {
            Collection::Open => Self::WorkToBeginDate,
            Collection::Closed => Self::DateCompleted,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, Display, Error, PartialEq)]
#[display("invalid coordinates ({latitude:?}, {longitude:?})")]
pub struct InvalidCoordinates {
    pub latitude: String,
    pub longitude: String,
}

impl Position {
    pub fn parse(
        latitude: &str,
        longitude: &str,
    ) -> Result<Self, InvalidCoordinates> {
        let err = || InvalidCoordinates {
            latitude: latitude.to_owned(),
            longitude: longitude.to_owned(),
        };

        let lat = latitude.trim().parse::<f64>().map_err(|_| err())?;
        let lon = longitude.trim().parse::<f64>().map_err(|_| err())?;
        if !lat.is_finite()
            || !lon.is_finite()
            || lat.abs() > 90.0
            || lon.abs() > 180.0
        {
            return Err(err());
        }

        Ok(Self {
            latitude: lat,
            longitude: lon,
        })
    }
}

/// Returns the first ticket with the given identifier, in source order.
///
/// Duplicate identifiers are not reconciled.
pub fn by_identifier<'a, I>(tickets: I, id: &RequestNum) -> Option<&'a Ticket>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    tickets.into_iter().find(|t| &t.request_num == id)
}

/// Pairs every placeable ticket with its position, skipping the rest.
pub fn markers<'a, I>(tickets: I) -> Vec<(&'a Ticket, Position)>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    tickets
        .into_iter()
        .filter_map(|t| match t.position {
            Some(position) => Some((t, position)),
            None => {
                debug!(request_num = %t.request_num, "no map position");
                None
            }
        })
        .collect()
}

/// Both ticket collections as read at one point in time.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub open: Vec<Ticket>,
    pub closed: Vec<Ticket>,
    /// Human-readable reasons for every collection that came back empty
    /// because it could not be loaded.
    pub warnings: Vec<String>,
}

impl Snapshot {
    /// Loads both collections. A collection that can't be fetched or parsed
    /// is left empty and reported through [`Snapshot::warnings`].
    pub async fn load(source: &dyn Source) -> Self {
        let (open, closed) = future::join(
            fetch_collection(source, Collection::Open),
            fetch_collection(source, Collection::Closed),
        )
        .await;

        let mut warnings = Vec::new();
        let mut unwrap_or_warn = |res: Result<Vec<Ticket>, DataUnavailable>| {
            res.unwrap_or_else(|e| {
                warn!("{e}");
                warnings.push(e.to_string());
                Vec::new()
            })
        };
        let open = unwrap_or_warn(open);
        let closed = unwrap_or_warn(closed);

        info!(open = open.len(), closed = closed.len(), "tickets loaded");

        Self {
            open,
            closed,
            warnings,
        }
    }

    pub fn collection(&self, collection: Collection) -> &[Ticket] {
        match collection {
            Collection::Open => &self.open,
            Collection::Closed => &self.closed,
        }
    }
}

async fn fetch_collection(
    source: &dyn Source,
    collection: Collection,
) -> Result<Vec<Ticket>, DataUnavailable> {
    let text = source.fetch(collection).await?;
    super::source::parse(collection, &text)
}

/// Keeps the latest [`Snapshot`] for `ttl` before reading the source again.
pub struct Cache {
    source: Box<dyn Source>,
    ttl: Duration,
    current: Mutex<Option<(Instant, Arc<Snapshot>)>>,
}

impl Cache {
    pub fn new(source: impl Source + 'static, ttl: Duration) -> Self {
        Self {
            source: Box::new(source),
            ttl,
            current: Mutex::new(None),
        }
    }

    pub async fn snapshot(&self) -> Arc<Snapshot> {
        let mut current = self.current.lock().await;
        if let Some((loaded_at, snapshot)) = &*current {
            if loaded_at.elapsed() < self.ttl {
                return Arc::clone(snapshot);
            }
        }
        let snapshot = Arc::new(Snapshot::load(self.source.as_ref()).await);
        *current = Some((Instant::now(), Arc::clone(&snapshot)));
        snapshot
    }

    /// Drops the cached snapshot and loads a fresh one.
    pub async fn refresh(&self) -> Arc<Snapshot> {
        self.current.lock().await.take();
        self.snapshot().await
    }
}
