mod conn;
mod cursor;
mod stream;

pub use conn::{Conn, PendingResponse, Response};
pub use cursor::Cursor;
