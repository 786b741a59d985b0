use intake_core::ports::PortError;

pub mod chat_llm;
pub mod db;
pub mod geocoding;
pub mod places;
pub mod structured_llm;

pub use chat_llm::OpenAiChatAdapter;
pub use db::DbAdapter;
pub use geocoding::GoogleGeocodingAdapter;
pub use places::GooglePlacesAdapter;
pub use structured_llm::OpenAiStructuredAdapter;

/// Maps a failed HTTP call to a Google API onto the port error taxonomy.
pub(crate) fn request_error(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Timeout(e.to_string())
    } else {
        PortError::Unexpected(e.to_string())
    }
}
