mod profile_cache;

pub use profile_cache::{ProfileCache, ProfileSource};
