pub mod message;
pub mod ticket;
pub mod user;

pub use self::{message::Message, ticket::Ticket, user::User};
