pub mod assets;
pub mod persistence;
pub mod time_window;
pub mod version;

/// Fresh identifier for locally created records.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
