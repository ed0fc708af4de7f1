use serde::{Deserialize, Serialize};

use crate::store;

pub use crate::store::{
    ticket::{Collection, DateColumn},
    RequestNum,
};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub request_num: RequestNum,
    pub collection: Collection,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub excavator: Option<String>,
    pub assigned_name: Option<String>,
    pub completed_by: Option<String>,
    pub status: Option<String>,
    pub work_to_begin_date: Option<String>,
    pub date_completed: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
}

impl From<&store::Ticket> for Ticket {
    fn from(t: &store::Ticket) -> Self {
        Self {
            request_num: t.request_num.clone(),
            collection: t.collection,
            latitude: t.position.map(|p| p.latitude),
            longitude: t.position.map(|p| p.longitude),
            excavator: t.excavator.clone(),
            assigned_name: t.assigned_name.clone(),
            completed_by: t.completed_by.clone(),
            status: t.status.clone(),
            work_to_begin_date: t.work_to_begin_date.clone(),
            date_completed: t.date_completed.clone(),
            description: t.description.clone(),
            address: t.address.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub tickets: Vec<Ticket>,
    pub total_count: usize,
    /// Collections that could not be loaded and are shown empty.
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub request_num: RequestNum,
    pub latitude: f64,
    pub longitude: f64,
    pub excavator: Option<String>,
    pub address: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Map {
    pub markers: Vec<Marker>,
    /// Matching tickets left off the map for lack of coordinates.
    pub skipped: usize,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Refreshed {
    pub open: usize,
    pub closed: usize,
    pub warnings: Vec<String>,
}
