//! Boundary to the spreadsheet the tickets live in.
//!
//! Every spreadsheet revision spells its headers a little differently, so rows
//! are read through one canonical [`Column`] schema. A collection missing a
//! required column is rejected as a whole instead of failing field by field.

use std::{collections::HashMap, fmt};

use async_trait::async_trait;
use csv::StringRecord;
use derive_more::{Display, Error};
use tracing::debug;

use crate::config;

use super::{
    ticket::{Collection, Position, Ticket},
    RequestNum,
};

#[async_trait]
pub trait Source: Send + Sync {
    /// Returns the raw CSV text of one collection.
    async fn fetch(
        &self,
        collection: Collection,
    ) -> Result<String, DataUnavailable>;
}

#[derive(Clone, Debug, Display, Error, PartialEq)]
#[display("{collection} tickets are unavailable: {reason}")]
pub struct DataUnavailable {
    pub collection: Collection,
    pub reason: String,
}

impl DataUnavailable {
    pub fn new(collection: Collection, reason: impl fmt::Display) -> Self {
        Self {
            collection,
            reason: reason.to_string(),
        }
    }
}

/// Fetches published CSV exports over HTTP.
pub struct HttpSource {
    client: reqwest::Client,
    open_url: String,
    closed_url: String,
}

impl HttpSource {
    pub fn new(config: &config::Source) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()?;
        Ok(Self {
            client,
            open_url: config.open_tickets_url.clone(),
            closed_url: config.closed_tickets_url.clone(),
        })
    }
}

#[async_trait]
impl Source for HttpSource {
    async fn fetch(
        &self,
        collection: Collection,
    ) -> Result<String, DataUnavailable> {
        let url = match collection {
            Collection::Open => &self.open_url,
            Collection::Closed => &self.closed_url,
        };
        debug!(%collection, url, "fetching tickets");

        self.client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| DataUnavailable::new(collection, e))?
            .text()
            .await
            .map_err(|e| DataUnavailable::new(collection, e))
    }
}

/// Serves fixed CSV text, for tests and offline runs.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    open: String,
    closed: String,
}

impl StaticSource {
    pub fn new(open: impl Into<String>, closed: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            closed: closed.into(),
        }
    }
}

#[async_trait]
impl Source for StaticSource {
    async fn fetch(
        &self,
        collection: Collection,
    ) -> Result<String, DataUnavailable> {
        Ok(match collection {
            Collection::Open => self.open.clone(),
            Collection::Closed => self.closed.clone(),
        })
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Column {
    #[display("RequestNum")]
    RequestNum,
    #[display("Latitude")]
    Latitude,
    #[display("Longitude")]
    Longitude,
    #[display("Excavator")]
    Excavator,
    #[display("Assigned Name")]
    AssignedName,
    #[display("Completed By")]
    CompletedBy,
    #[display("Status")]
    Status,
    #[display("Work to Begin Date")]
    WorkToBeginDate,
    #[display("Date Completed")]
    DateCompleted,
    #[display("Description")]
    Description,
    #[display("Address")]
    Address,
}

impl Column {
    pub const ALL: [Self; 11] = [
        Self::RequestNum,
        Self::Latitude,
        Self::Longitude,
        Self::Excavator,
        Self::AssignedName,
        Self::CompletedBy,
        Self::Status,
        Self::WorkToBeginDate,
        Self::DateCompleted,
        Self::Description,
        Self::Address,
    ];

    /// Accepted header spellings, in [`header_key`] form.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::RequestNum => {
                &["requestnum", "requestnumber", "ticket", "ticketnumber"]
            }
            Self::Latitude => &["latitude", "lat"],
            Self::Longitude => &["longitude", "lon", "lng", "long"],
            Self::Excavator => &["excavator", "contractor"],
            Self::AssignedName => &["assignedname", "assignedto"],
            Self::CompletedBy => &["completedby"],
            Self::Status => &["status"],
            Self::WorkToBeginDate => &["worktobegindate"],
            Self::DateCompleted => &["datecompleted"],
            Self::Description => &["description"],
            Self::Address => &["address"],
        }
    }

    fn is_required(self, collection: Collection) -> bool {
        match self {
            Self::RequestNum
            | Self::Latitude
            | Self::Longitude
            | Self::Excavator => true,
            Self::AssignedName => collection == Collection::Open,
            Self::CompletedBy => collection == Collection::Closed,
            Self::Status
            | Self::WorkToBeginDate
            | Self::DateCompleted
            | Self::Description
            | Self::Address => false,
        }
    }
}

/// Lowercases a header and drops spaces, `_` and `-`, so `Request Num`,
/// `request_num` and `RequestNum` all compare equal.
fn header_key(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Canonical column to record index, for one CSV header row.
struct Columns(HashMap<Column, usize>);

impl Columns {
    fn map(
        headers: &StringRecord,
        collection: Collection,
    ) -> Result<Self, DataUnavailable> {
        let mut by_key = HashMap::new();
        for (i, h) in headers.iter().enumerate() {
            by_key.entry(header_key(h)).or_insert(i);
        }

        let mut columns = HashMap::new();
        for column in Column::ALL {
            match column.aliases().iter().find_map(|a| by_key.get(*a)) {
                Some(&i) => {
                    columns.insert(column, i);
                }
                None if column.is_required(collection) => {
                    return Err(DataUnavailable::new(
                        collection,
                        format!("missing `{column}` column"),
                    ));
                }
                None => {}
            }
        }

        Ok(Self(columns))
    }

    fn get<'r>(
        &self,
        record: &'r StringRecord,
        column: Column,
    ) -> Option<&'r str> {
        self.0
            .get(&column)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Parses one collection's CSV text into tickets, in source order.
pub fn parse(
    collection: Collection,
    text: &str,
) -> Result<Vec<Ticket>, DataUnavailable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DataUnavailable::new(collection, e))?
        .clone();
    let columns = Columns::map(&headers, collection)?;

    let mut tickets = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DataUnavailable::new(collection, e))?;
        let get = |column| columns.get(&record, column);
        let owned = |column| get(column).map(str::to_owned);

        let request_num = get(Column::RequestNum)
            .map(RequestNum::new)
            .unwrap_or_default();
        if request_num.is_empty() {
            debug!(
                %collection,
                line = ?record.position().map(|p| p.line()),
                "row without request number"
            );
            continue;
        }

        let position = Position::parse(
            get(Column::Latitude).unwrap_or_default(),
            get(Column::Longitude).unwrap_or_default(),
        )
        .map_err(|e| debug!(%request_num, "{e}"))
        .ok();

        tickets.push(Ticket {
            request_num,
            collection,
            position,
            excavator: owned(Column::Excavator),
            assigned_name: owned(Column::AssignedName),
            completed_by: owned(Column::CompletedBy),
            status: owned(Column::Status),
            work_to_begin_date: owned(Column::WorkToBeginDate),
            date_completed: owned(Column::DateCompleted),
            description: owned(Column::Description),
            address: owned(Column::Address),
        });
    }

    Ok(tickets)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{routing::get, Router};
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn maps_header_spellings() {
        let tickets = parse(
            Collection::Open,
            "Request Num,lat,LONGITUDE,Contractor,assigned_name,Work To Begin Date\n\
             \"1,234\",40.0,-75.0,AcmeDig,jdoe,2024-03-01\n",
        )
        .unwrap();

        assert_eq!(tickets.len(), 1);
        let t = &tickets[0];
        assert_eq!(t.request_num.as_str(), "1234");
        assert_eq!(t.collection, Collection::Open);
        assert!(t.position.is_some());
        assert_eq!(t.excavator.as_deref(), Some("AcmeDig"));
        assert_eq!(t.assigned_name.as_deref(), Some("jdoe"));
        assert_eq!(t.work_to_begin_date.as_deref(), Some("2024-03-01"));
        assert_eq!(t.status, None);
    }

    #[test]
    fn fails_fast_on_missing_required_column() {
        let err = parse(
            Collection::Closed,
            "RequestNum,Latitude,Longitude,Excavator,Assigned Name\n\
             1,40,-75,AcmeDig,jdoe\n",
        )
        .unwrap_err();

        assert_eq!(err.collection, Collection::Closed);
        assert!(err.reason.contains("Completed By"), "{err}");
    }

    #[test]
    fn empty_document_is_unavailable() {
        assert!(parse(Collection::Open, "").is_err());
    }

    #[test]
    fn keeps_rows_without_coordinates() {
        let tickets = parse(
            Collection::Open,
            "RequestNum,Latitude,Longitude,Excavator,Assigned Name\n\
             1,,,AcmeDig,jdoe\n\
             2,north,west,AcmeDig,jdoe\n",
        )
        .unwrap();

        assert_eq!(tickets.len(), 2);
        assert!(tickets.iter().all(|t| t.position.is_none()));
    }

    #[test]
    fn skips_rows_without_request_number() {
        let tickets = parse(
            Collection::Open,
            "RequestNum,Latitude,Longitude,Excavator,Assigned Name\n\
             ,40,-75,AcmeDig,jdoe\n\
             \" , \",40,-75,AcmeDig,jdoe\n\
             3,40,-75,AcmeDig,jdoe\n",
        )
        .unwrap();

        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].request_num.as_str(), "3");
    }

    #[test]
    fn blank_cells_are_none() {
        let tickets = parse(
            Collection::Closed,
            "RequestNum,Latitude,Longitude,Excavator,Completed By,Status\n\
             9,40,-75,  ,jdoe,\n",
        )
        .unwrap();

        assert_eq!(tickets[0].excavator, None);
        assert_eq!(tickets[0].status, None);
        assert_eq!(tickets[0].completed_by.as_deref(), Some("jdoe"));
    }

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await });
        format!("http://{addr}")
    }

    fn http_source(base: &str, timeout: Duration) -> HttpSource {
        HttpSource::new(&config::Source {
            open_tickets_url: format!("{base}/open.csv"),
            closed_tickets_url: format!("{base}/closed.csv"),
            fetch_timeout: timeout,
            cache_ttl: Duration::from_secs(60),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_over_http() {
        let base = serve(
            Router::new().route("/open.csv", get(|| async { "RequestNum\n1\n" })),
        )
        .await;
        let source = http_source(&base, Duration::from_secs(5));

        assert_eq!(
            source.fetch(Collection::Open).await.unwrap(),
            "RequestNum\n1\n",
        );
        let err = source.fetch(Collection::Closed).await.unwrap_err();
        assert_eq!(err.collection, Collection::Closed);
    }

    #[tokio::test]
    async fn times_out_hung_fetch() {
        let base = serve(Router::new().route(
            "/open.csv",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "RequestNum\n"
            }),
        ))
        .await;
        let source = http_source(&base, Duration::from_millis(100));

        let err = source.fetch(Collection::Open).await.unwrap_err();
        assert_eq!(err.collection, Collection::Open);
    }
}
