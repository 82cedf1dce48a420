mod client;
mod phone;

pub use client::{render_rows, Client, ClientFilter, ClientUpdate};
pub use phone::Phone;

/// Treats an empty string the same as an absent value.
pub(crate) fn supplied(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
