use uuid::Uuid;

pub mod config;
pub mod errors;
pub mod mongo;
pub mod token_codec;
pub mod urls;


pub fn generate_id() -> String {
    Uuid::new_v4().to_hyphenated().to_string()
}

///
/// Cut a value down to at most max characters, on a character boundary.
///
pub fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
