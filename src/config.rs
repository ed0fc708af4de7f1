use std::{net, time};

use serde::Deserialize;

#[derive(Deserialize)]
pub struct Config {
    pub source: Source,
    pub admin: Admin,
    pub http: Http,
    pub jwt: Jwt,
}

#[derive(Clone, Deserialize)]
pub struct Source {
    pub open_tickets_url: String,
    pub closed_tickets_url: String,
    #[serde(with = "humantime_serde")]
    pub fetch_timeout: time::Duration,
    #[serde(with = "humantime_serde")]
    pub cache_ttl: time::Duration,
}

/// The single administrator credential pair.
#[derive(Clone, Deserialize)]
pub struct Admin {
    pub login: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct Http {
    pub server: Server,
    pub cors: Cors,
}

#[derive(Deserialize)]
pub struct Server {
    pub addr: net::SocketAddr,
}

#[derive(Deserialize)]
pub struct Cors {
    pub allowed_origins: Vec<String>,
}

#[derive(Deserialize)]
pub struct Jwt {
    pub secret: String,
    #[serde(with = "humantime_serde")]
    pub expiration_time: time::Duration,
}
