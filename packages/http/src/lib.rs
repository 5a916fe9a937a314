//! # objectdoc-http
//!
//! The HTTP-backed [`objectdoc_store::DocumentStore`] implementation.
//!
//! [`CouchStore`] speaks the CouchDB-style API: documents live at
//! `GET/PUT {db}/{id}`, creation posts to the database root, queries post
//! Mango selectors to `{db}/_find`, and bulk writes post to
//! `{db}/_bulk_docs`. Deletion writes a tombstone; the store performs
//! physical removal.
//!
//! ```ignore
//! use objectdoc_http::CouchStore;
//! use objectdoc_store::DocumentStore;
//!
//! let store = CouchStore::new("http://localhost:5984/app")?
//!     .with_basic_auth("admin", "secret");
//!
//! let doc = store.get("class:Note").await?;
//! ```

mod couch;

pub use couch::CouchStore;
