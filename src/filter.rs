//! Narrowing a ticket collection down to what a dashboard shows.
//!
//! Every filter keeps source order and returns borrowed tickets, so its
//! output can be fed back into any filter here, itself included.

use time::{macros::format_description, Date};

use crate::{
    session::{Identity, Role},
    store::ticket::{Collection, DateColumn, Ticket},
};

/// Interactive filters applied on top of identity scoping.
#[derive(Clone, Debug, Default)]
pub struct Query {
    /// Defaults to [`DateColumn::default_for`] the ticket's collection.
    pub date_column: Option<DateColumn>,
    pub start: Option<Date>,
    pub end: Option<Date>,
    pub contractor: String,
    pub assignee: String,
    pub text: String,
}

impl Query {
    /// Scopes `collection`'s tickets to `identity`, then applies the date
    /// range, then the text filters.
    pub fn apply<'a, I>(
        &self,
        collection: Collection,
        tickets: I,
        identity: &Identity,
    ) -> Vec<&'a Ticket>
    where
        I: IntoIterator<Item = &'a Ticket>,
    {
        let column = self
            .date_column
            .unwrap_or_else(|| DateColumn::default_for(collection));
        let found = by_identity(tickets, identity);
        let found = by_date_range(found, column, self.start, self.end);
        let found = by_contractor(found, &self.contractor);
        let found = by_assignee(found, &self.assignee);
        search(found, &self.text)
    }
}

pub fn is_visible(ticket: &Ticket, identity: &Identity) -> bool {
    match identity.role {
        Role::Admin => true,
        Role::Locator => ticket.locator() == Some(identity.username.as_str()),
        Role::Contractor => {
            ticket.excavator.as_deref() == Some(identity.username.as_str())
        }
    }
}

pub fn by_identity<'a, I>(tickets: I, identity: &Identity) -> Vec<&'a Ticket>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    tickets
        .into_iter()
        .filter(|t| is_visible(t, identity))
        .collect()
}

/// Keeps tickets whose `column` date lies within `start..=end`.
///
/// An absent bound is not applied, and with both absent nothing is dropped.
/// Otherwise rows without a parseable date are dropped.
pub fn by_date_range<'a, I>(
    tickets: I,
    column: DateColumn,
    start: Option<Date>,
    end: Option<Date>,
) -> Vec<&'a Ticket>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    if start.is_none() && end.is_none() {
        return tickets.into_iter().collect();
    }
    tickets
        .into_iter()
        .filter(|t| in_range(t, column, start, end))
        .collect()
}

fn in_range(
    ticket: &Ticket,
    column: DateColumn,
    start: Option<Date>,
    end: Option<Date>,
) -> bool {
    let Some(date) = ticket.date(column).and_then(parse_date) else {
        return false;
    };
    start.map_or(true, |s| s <= date) && end.map_or(true, |e| date <= e)
}

/// Case-insensitive substring match on the excavator.
pub fn by_contractor<'a, I>(tickets: I, needle: &str) -> Vec<&'a Ticket>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let needle = needle.trim().to_lowercase();
    tickets
        .into_iter()
        .filter(|t| {
            needle.is_empty()
                || t.excavator
                    .as_deref()
                    .is_some_and(|e| e.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Case-insensitive match on the locator responsible in the ticket's
/// collection.
pub fn by_assignee<'a, I>(tickets: I, name: &str) -> Vec<&'a Ticket>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let name = name.trim();
    tickets
        .into_iter()
        .filter(|t| {
            name.is_empty()
                || t.locator().is_some_and(|l| l.eq_ignore_ascii_case(name))
        })
        .collect()
}

/// Free-text search over request number, address, description and excavator.
pub fn search<'a, I>(tickets: I, text: &str) -> Vec<&'a Ticket>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let text = text.trim().to_lowercase();
    tickets
        .into_iter()
        .filter(|t| {
            text.is_empty()
                || [
                    Some(t.request_num.as_str()),
                    t.address.as_deref(),
                    t.description.as_deref(),
                    t.excavator.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&text))
        })
        .collect()
}

/// Reads the calendar day of a spreadsheet date cell. Any time of day after a
/// space or `T` is ignored.
pub fn parse_date(raw: &str) -> Option<Date> {
    let day = raw.trim().split([' ', 'T']).next()?;
    let formats = [
        format_description!("[year]-[month]-[day]"),
        format_description!("[month padding:none]/[day padding:none]/[year]"),
        format_description!("[year]/[month padding:none]/[day padding:none]"),
    ];
    formats.iter().find_map(|f| Date::parse(day, *f).ok())
}
