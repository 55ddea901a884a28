//! Static single-page frontend.
//!
//! Files under the static directory are served as-is; any other path falls
//! back to `index.html` so client-side routes resolve.

use std::path::Path;

use tower_http::services::{ServeDir, ServeFile};

pub fn service(static_dir: impl AsRef<Path>) -> ServeDir<ServeFile> {
    let static_dir = static_dir.as_ref();
    ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")))
}
