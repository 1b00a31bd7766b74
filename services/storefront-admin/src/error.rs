//! Command errors that are not backend failures

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("not logged in, run `storefront-admin login` first")]
    NotLoggedIn,

    #[error("session expired, run `storefront-admin login` again")]
    SessionExpired,

    #[error("order {id} is {status} and can no longer change status")]
    OrderFinal { id: u64, status: String },

    #[error("unknown order status {0:?}, expected pending, processing, shipped, delivered, completed or cancelled")]
    UnknownStatus(String),
}
