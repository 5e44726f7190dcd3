use serde::{Deserialize, Serialize};
use serde_json::Value;

///
/// A request for the mailer to render a template and send it to a single recipient.
///
/// The variables may carry secrets (the reset link) so this must never be logged.
///
#[derive(Deserialize, Serialize)]
pub struct EmailRequested {
    pub to: String,
    pub subject_key: String,
    pub template_name: String,
    pub variables: Value,
    pub locale: String,
}
