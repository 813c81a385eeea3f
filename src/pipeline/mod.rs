pub mod dedup;
pub mod digest;
pub mod normalize;
pub mod scorer;

pub use dedup::collapse_batch;
pub use digest::{in_quiet_hours, render_digest};
pub use normalize::{canonicalize_url, normalize_record, normalize_text};
pub use scorer::Scorer;
