use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, RequestPartsExt as _, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use derive_more::From;
use itertools::Itertools as _;
use jsonwebtoken::{
    decode, encode, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::info;

use crate::{
    api, config, filter,
    session::{self, Identity, Session},
    store::{
        message::{self, EmptyMessage},
        ticket::{self, Collection, DateColumn},
        Cache, RequestNum,
    },
};

pub fn router(state: SharedAppState) -> Router {
    Router::new()
        .route("/auth", post(auth))
        .route("/user", get(get_user))
        .route("/ticket", get(list_tickets))
        .route("/ticket/map", get(ticket_map))
        .route("/ticket/refresh", post(refresh_tickets))
        .route("/ticket/:id", get(get_ticket))
        .route("/ticket/:id/message", get(list_messages).post(send_message))
        .route("/ticket/:id/message/reply", post(reply_to_messages))
        .route("/ticket/:id/message/close", post(close_messages))
        .route("/message", get(message_board))
        .with_state(state)
}

#[derive(Deserialize)]
struct AuthInput {
    login: String,
    password: String,
}

async fn auth(
    State(state): State<SharedAppState>,
    Json(AuthInput { login, password }): Json<AuthInput>,
) -> Result<String, AuthError> {
    use AuthError as E;

    let snapshot = state.tickets.snapshot().await;
    let identity = session::authenticate(
        &state.admin,
        &snapshot.open,
        &login,
        &password,
    )?;

    let expires_at = OffsetDateTime::now_utc() + state.jwt_expiration_time;
    encode(
        &Header::default(),
        &AuthClaims {
            sub: identity.username,
            role: identity.role,
            exp: expires_at.unix_timestamp(),
        },
        &state.jwt_encoding_key,
    )
    .map_err(|_| E::InvalidToken)
}

#[derive(Debug, From)]
pub enum AuthError {
    InvalidToken,
    #[from]
    WrongLoginOrPassword(session::InvalidCredentials),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::WrongLoginOrPassword(_) => StatusCode::FORBIDDEN,
        }
        .into_response()
    }
}

async fn get_user(session: Session) -> Json<api::User> {
    Json(api::User {
        username: session.identity.username,
        role: session.identity.role,
    })
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTicketsInput {
    #[serde(default)]
    collection: Collection,
    date_column: Option<DateColumn>,
    start: Option<String>,
    end: Option<String>,
    contractor: Option<String>,
    assignee: Option<String>,
    q: Option<String>,
}

impl ListTicketsInput {
    fn into_query(self) -> Result<(Collection, filter::Query), InvalidDate> {
        let date = |raw: Option<String>| {
            raw.filter(|s| !s.trim().is_empty())
                .map(|s| filter::parse_date(&s).ok_or(InvalidDate(s)))
                .transpose()
        };
        let query = filter::Query {
            date_column: self.date_column,
            start: date(self.start)?,
            end: date(self.end)?,
            contractor: self.contractor.unwrap_or_default(),
            assignee: self.assignee.unwrap_or_default(),
            text: self.q.unwrap_or_default(),
        };
        Ok((self.collection, query))
    }
}

#[derive(Debug)]
pub struct InvalidDate(String);

/// Tickets the session may see in one collection, plus the interactively
/// filtered subset of them.
fn visible_and_matching<'s>(
    session: &'s Session,
    collection: Collection,
    query: &filter::Query,
) -> (usize, Vec<&'s ticket::Ticket>) {
    let visible = session.visible(collection);
    let total = visible.len();
    (total, query.apply(collection, visible, &session.identity))
}

async fn list_tickets(
    session: Session,
    Query(input): Query<ListTicketsInput>,
) -> Result<Json<api::ticket::List>, ListTicketsError> {
    let (collection, query) = input.into_query()?;
    let (total_count, tickets) =
        visible_and_matching(&session, collection, &query);

    Ok(Json(api::ticket::List {
        tickets: tickets.into_iter().map(api::Ticket::from).collect(),
        total_count,
        warnings: session.snapshot.warnings.clone(),
    }))
}

#[derive(Debug, From)]
pub enum ListTicketsError {
    #[from]
    InvalidDate(InvalidDate),
}

impl IntoResponse for ListTicketsError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidDate(_) => StatusCode::BAD_REQUEST,
        }
        .into_response()
    }
}

async fn ticket_map(
    session: Session,
    Query(input): Query<ListTicketsInput>,
) -> Result<Json<api::ticket::Map>, ListTicketsError> {
    let (collection, query) = input.into_query()?;
    let (_, tickets) = visible_and_matching(&session, collection, &query);

    let matching = tickets.len();
    let markers = ticket::markers(tickets)
        .into_iter()
        .map(|(t, position)| api::ticket::Marker {
            request_num: t.request_num.clone(),
            latitude: position.latitude,
            longitude: position.longitude,
            excavator: t.excavator.clone(),
            address: t.address.clone(),
        })
        .collect::<Vec<_>>();

    Ok(Json(api::ticket::Map {
        skipped: matching - markers.len(),
        markers,
        warnings: session.snapshot.warnings.clone(),
    }))
}

async fn get_ticket(
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<api::Ticket>, GetTicketError> {
    use GetTicketError as E;

    let ticket = session
        .find(&RequestNum::new(&id))
        .ok_or(E::TicketNotFound)?;

    Ok(Json(api::Ticket::from(ticket)))
}

#[derive(Debug)]
pub enum GetTicketError {
    TicketNotFound,
}

impl IntoResponse for GetTicketError {
    fn into_response(self) -> Response {
        match self {
            Self::TicketNotFound => StatusCode::NOT_FOUND,
        }
        .into_response()
    }
}

async fn refresh_tickets(
    State(state): State<SharedAppState>,
    session: Session,
) -> Result<Json<api::ticket::Refreshed>, RefreshTicketsError> {
    use RefreshTicketsError as E;

    if !session.is_admin() {
        return Err(E::NotAllowed);
    }

    let snapshot = state.tickets.refresh().await;
    info!(username = %session.identity.username, "tickets refreshed");

    Ok(Json(api::ticket::Refreshed {
        open: snapshot.open.len(),
        closed: snapshot.closed.len(),
        warnings: snapshot.warnings.clone(),
    }))
}

#[derive(Debug)]
pub enum RefreshTicketsError {
    NotAllowed,
}

impl IntoResponse for RefreshTicketsError {
    fn into_response(self) -> Response {
        match self {
            Self::NotAllowed => StatusCode::FORBIDDEN,
        }
        .into_response()
    }
}

#[derive(Deserialize)]
struct SendMessageInput {
    #[serde(default)]
    body: String,
    #[serde(default)]
    attachments: Vec<message::Attachment>,
}

async fn send_message(
    State(state): State<SharedAppState>,
    session: Session,
    Path(id): Path<String>,
    Json(SendMessageInput { body, attachments }): Json<SendMessageInput>,
) -> Result<Json<api::Message>, SendMessageError> {
    use SendMessageError as E;

    let id = RequestNum::new(&id);
    if !session.can_access(&id) {
        return Err(E::TicketNotFound);
    }

    let message = state.messages.write().await.send(
        id,
        &session.identity.username,
        &body,
        attachments,
    )?;

    Ok(Json(api::Message::from(&message)))
}

#[derive(Debug, From)]
pub enum SendMessageError {
    #[from]
    EmptyMessage(EmptyMessage),
    TicketNotFound,
}

impl IntoResponse for SendMessageError {
    fn into_response(self) -> Response {
        match self {
            Self::EmptyMessage(_) => StatusCode::BAD_REQUEST,
            Self::TicketNotFound => StatusCode::NOT_FOUND,
        }
        .into_response()
    }
}

async fn list_messages(
    State(state): State<SharedAppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<api::message::Thread>, ThreadError> {
    let id = accessible_ticket(&session, &id)?;

    let messages = state.messages.read().await;
    Ok(Json(api::message::Thread {
        messages: messages
            .list_by_ticket(&id)
            .into_iter()
            .map(api::Message::from)
            .collect(),
    }))
}

#[derive(Deserialize)]
struct ReplyInput {
    body: String,
}

async fn reply_to_messages(
    State(state): State<SharedAppState>,
    session: Session,
    Path(id): Path<String>,
    Json(ReplyInput { body }): Json<ReplyInput>,
) -> Result<Json<api::message::Updated>, ThreadError> {
    let id = accessible_ticket(&session, &id)?;

    let threads = state.messages.write().await.reply(
        &id,
        &session.identity.username,
        &body,
    );

    Ok(Json(api::message::Updated { threads }))
}

async fn close_messages(
    State(state): State<SharedAppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<api::message::Updated>, ThreadError> {
    let id = accessible_ticket(&session, &id)?;

    let threads = state.messages.write().await.close(&id);

    Ok(Json(api::message::Updated { threads }))
}

fn accessible_ticket(
    session: &Session,
    raw: &str,
) -> Result<RequestNum, ThreadError> {
    let id = RequestNum::new(raw);
    if session.can_access(&id) {
        Ok(id)
    } else {
        Err(ThreadError::TicketNotFound)
    }
}

#[derive(Debug)]
pub enum ThreadError {
    TicketNotFound,
}

impl IntoResponse for ThreadError {
    fn into_response(self) -> Response {
        match self {
            Self::TicketNotFound => StatusCode::NOT_FOUND,
        }
        .into_response()
    }
}

#[derive(Deserialize)]
struct MessageBoardInput {
    #[serde(default)]
    status: message::Status,
}

async fn message_board(
    State(state): State<SharedAppState>,
    session: Session,
    Query(MessageBoardInput { status }): Query<MessageBoardInput>,
) -> Json<api::message::Board> {
    let messages = state.messages.read().await;

    let tickets = messages
        .list_by_status(status)
        .into_iter()
        .filter(|(id, _)| session.can_access(id))
        .map(|(id, thread)| {
            (id, thread.into_iter().map(api::Message::from).collect_vec())
        })
        .collect();

    Json(api::message::Board { tickets })
}

pub type SharedAppState = Arc<AppState>;

pub struct AppState {
    tickets: Cache,

    messages: RwLock<message::Store>,

    admin: config::Admin,

    jwt_expiration_time: Duration,

    jwt_decoding_key: DecodingKey,

    jwt_encoding_key: EncodingKey,
}

impl AppState {
    pub fn new(
        tickets: Cache,
        admin: config::Admin,
        jwt: &config::Jwt,
    ) -> SharedAppState {
        Arc::new(Self {
            tickets,
            messages: RwLock::new(message::Store::new()),
            admin,
            jwt_expiration_time: jwt.expiration_time,
            jwt_decoding_key: DecodingKey::from_secret(jwt.secret.as_bytes()),
            jwt_encoding_key: EncodingKey::from_secret(jwt.secret.as_bytes()),
        })
    }

    pub fn tickets(&self) -> &Cache {
        &self.tickets
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AuthClaims {
    sub: String,
    role: session::Role,
    exp: i64,
}

#[async_trait]
impl FromRequestParts<SharedAppState> for AuthClaims {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::InvalidToken)?;
        let token_data = decode::<Self>(
            bearer.token(),
            &state.jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(|_| AuthError::InvalidToken)?;

        Ok(token_data.claims)
    }
}

#[async_trait]
impl FromRequestParts<SharedAppState> for Session {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = AuthClaims::from_request_parts(parts, state).await?;
        let snapshot = state.tickets.snapshot().await;

        Ok(Session::new(
            Identity {
                role: claims.role,
                username: claims.sub,
            },
            snapshot,
        ))
    }
}
