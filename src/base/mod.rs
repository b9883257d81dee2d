//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): network error codes in the style of
//!   Chromium's `net_error_list.h`
//! - [`context`]: endpoint context for IO errors

pub mod context;
pub mod neterror;
