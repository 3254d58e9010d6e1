use crate::value_objects::instrument::Instrument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub access_token: String,
    pub user_id: Option<String>,
}

/// Brokerage login flow.
pub trait SessionService {
    fn login_url(&self) -> String;
    fn generate_session(&self, request_token: &str) -> Result<SessionGrant, String>;
}

/// Brokerage instrument catalog.
pub trait InstrumentCatalog {
    fn list_instruments(&self, exchange: &str) -> Result<Vec<Instrument>, String>;
}
