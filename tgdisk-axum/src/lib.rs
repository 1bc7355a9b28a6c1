//! tgdisk-axum: HTTP boundary for the tgdisk transfer engine.
//!
//! Routes:
//! - `POST /upload` streams a multipart `file` field into the engine
//! - `GET /d` streams a stored file back (`?ref=<token>` or `?file_id=&kind=`)
//! - `POST /verify` checks the access password
//! - `GET /health`

pub mod access;
pub mod app;
pub mod links;
pub mod middlewares;
pub mod params;
pub mod routes;
pub mod state;
mod error;
pub use access::AccessGuard;
pub use error::{ErrorKind, TgDiskError};
pub use links::{download_link, LinkBuilder};
pub use state::TgDiskState;

pub use app::{axum, TgDiskApp};
