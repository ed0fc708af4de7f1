use std::time::Duration;

use locate_desk::{
    api, config, http,
    store::{Cache, StaticSource},
};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::net::TcpListener;

pub const OPEN_TICKETS: &str = "\
RequestNum,Latitude,Longitude,Excavator,Assigned Name,Status,Work to Begin Date,Description,Address
00123,40.1,-75.2,AcmeDig,jdoe,Open,2024-03-01,Gas service,12 Main St
\"1,234\",,,BuildCo,asmith,Open,3/10/2024,Fiber drop,4 Oak Ave
00125,40.3,-75.4,AcmeDig,asmith,Open,2024-04-02 09:00,Water main,9 Elm St
";

pub const CLOSED_TICKETS: &str = "\
Request Num,Latitude,Longitude,Excavator,Completed By,Date Completed
00090,40.0,-75.0,AcmeDig,jdoe,2024-02-01
00091,40.0,-75.0,OldCo,retired,2024-01-15
";

/// Starts a server over the fixture spreadsheet and returns its base URL.
pub async fn spawn() -> String {
    spawn_with(StaticSource::new(OPEN_TICKETS, CLOSED_TICKETS)).await
}

pub async fn spawn_with(source: StaticSource) -> String {
    let state = http::AppState::new(
        Cache::new(source, Duration::from_secs(60)),
        config::Admin {
            login: "admin".into(),
            password: "admin123".into(),
        },
        &config::Jwt {
            secret: "test-secret".into(),
            expiration_time: Duration::from_secs(60 * 60),
        },
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("no local address");
    tokio::spawn(async move {
        axum::serve(listener, http::router(state)).await
    });

    format!("http://{addr}")
}

pub struct Client {
    inner: reqwest::Client,
    base_url: String,
    pub auth_token: Option<String>,
}

impl Client {
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.to_owned(),
            auth_token: None,
        }
    }

    pub async fn try_auth(
        &self,
        login: &str,
        password: &str,
    ) -> Result<String, StatusCode> {
        Ok(self
            .inner
            .post(format!("{}/auth", self.base_url))
            .json(&json!({
                "login": login,
                "password": password,
            }))
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .text()
            .await
            .expect("failed to get a response"))
    }

    pub async fn auth(mut self, login: &str, password: &str) -> Self {
        self.auth_token = Some(
            self.try_auth(login, password)
                .await
                .expect("wrong status code"),
        );
        self
    }

    pub async fn user(&self) -> Result<api::User, StatusCode> {
        self.fetch(self.get("/user")).await
    }

    pub async fn get_tickets(
        &self,
        query: &str,
    ) -> Result<api::ticket::List, StatusCode> {
        self.fetch(self.get(&format!("/ticket?{query}"))).await
    }

    pub async fn get_map(
        &self,
        query: &str,
    ) -> Result<api::ticket::Map, StatusCode> {
        self.fetch(self.get(&format!("/ticket/map?{query}"))).await
    }

    pub async fn get_ticket(
        &self,
        id: &str,
    ) -> Result<api::Ticket, StatusCode> {
        self.fetch(self.get(&format!("/ticket/{id}"))).await
    }

    pub async fn refresh_tickets(
        &self,
    ) -> Result<api::ticket::Refreshed, StatusCode> {
        self.fetch(self.post("/ticket/refresh")).await
    }

    pub async fn send_message(
        &self,
        id: &str,
        body: &str,
        attachments: &[(&str, &[u8])],
    ) -> Result<api::Message, StatusCode> {
        let attachments = attachments
            .iter()
            .map(|(filename, data)| {
                json!({ "filename": filename, "data": data })
            })
            .collect::<Vec<_>>();
        self.fetch(self.post(&format!("/ticket/{id}/message")).json(&json!({
            "body": body,
            "attachments": attachments,
        })))
        .await
    }

    pub async fn get_messages(
        &self,
        id: &str,
    ) -> Result<api::message::Thread, StatusCode> {
        self.fetch(self.get(&format!("/ticket/{id}/message"))).await
    }

    pub async fn reply(
        &self,
        id: &str,
        body: &str,
    ) -> Result<api::message::Updated, StatusCode> {
        self.fetch(
            self.post(&format!("/ticket/{id}/message/reply"))
                .json(&json!({ "body": body })),
        )
        .await
    }

    pub async fn close(
        &self,
        id: &str,
    ) -> Result<api::message::Updated, StatusCode> {
        self.fetch(self.post(&format!("/ticket/{id}/message/close")))
            .await
    }

    pub async fn message_board(
        &self,
        status: &str,
    ) -> Result<api::message::Board, StatusCode> {
        self.fetch(self.get(&format!("/message?status={status}"))).await
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorized(self.inner.get(format!("{}{path}", self.base_url)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorized(self.inner.post(format!("{}{path}", self.base_url)))
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => {
                req.header("Authorization", format!("Bearer {token}"))
            }
            None => req,
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<T, StatusCode> {
        Ok(req
            .send()
            .await
            .expect("failed to send a request")
            .error_for_status()
            .map_err(|e| e.status().expect("status error"))?
            .json::<T>()
            .await
            .expect("failed to get a response"))
    }
}
