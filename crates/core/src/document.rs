//! Document trait: membership in a named collection.

/// A record stored in the document database.
pub trait Document {
    /// Name of the collection the document lives in.
    const COLLECTION: &'static str;
}
