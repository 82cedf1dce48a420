use std::collections::HashSet;

use crate::models::Client;

/// Length of a phone number as stored in `phone.phone_number`
pub const PHONE_NUMBER_LEN: usize = 11;

/// Whether a free-text term should also be matched against phone numbers
pub fn looks_like_phone_number(term: &str) -> bool {
    term.len() == PHONE_NUMBER_LEN && term.bytes().all(|b| b.is_ascii_digit())
}

/// Drops repeated clients, keeping the first occurrence of each `client_id`
pub fn dedup_clients(clients: Vec<Client>) -> Vec<Client> {
    let mut seen = HashSet::new();
    clients
        .into_iter()
        .filter(|c| seen.insert(c.client_id))
        .collect()
}
