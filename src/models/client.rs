use serde::{Deserialize, Serialize};

use super::enums::{ClientType, DocumentState, RiskLevel};

/// A KYC subject (natural or legal person).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub code: String,
    pub client_type: ClientType,
    pub risk_level: RiskLevel,
    /// Aggregate documental state, derived from the document set.
    /// `None` until the client has at least one document.
    pub documental_state: Option<DocumentState>,
    pub primary_manager_id: Option<String>,
    pub kyc_manager_id: Option<String>,
}
