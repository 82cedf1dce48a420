//! Decides how a phone number update applies to a client's existing phones.

use crate::error::{StoreError, StoreResult};
use crate::models::Phone;

/// What an update of a client's phone number turns into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneChange {
    /// The client has no phone yet; add one
    Insert,
    /// Overwrite the number stored in this row
    Replace { phone_id: i32 },
}

/// Picks the phone row a new number should land in.
///
/// With one existing phone that row is replaced unconditionally. With several,
/// `replace` must name one of the client's current numbers.
pub fn plan_phone_update(
    client_id: i32,
    current: &[Phone],
    replace: Option<&str>,
) -> StoreResult<PhoneChange> {
    match current {
        [] => Ok(PhoneChange::Insert),
        [only] => Ok(PhoneChange::Replace {
            phone_id: only.phone_id,
        }),
        many => {
            let Some(old) = replace else {
                return Err(StoreError::AmbiguousPhone {
                    client_id,
                    numbers: many.iter().map(|p| p.phone_number.clone()).collect(),
                });
            };

            many.iter()
                .find(|p| p.phone_number == old)
                .map(|p| PhoneChange::Replace {
                    phone_id: p.phone_id,
                })
                .ok_or_else(|| StoreError::PhoneNotFound(old.to_owned()))
        }
    }
}
