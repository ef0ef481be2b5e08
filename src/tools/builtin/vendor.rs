//! Vendor onboarding tools: company lookup, the two section saves, and the
//! application summary.
//!
//! Every tool writes through the injected `SessionStore`. Saves stamp the
//! section with the current UTC time; repeating an identical save only
//! refreshes that timestamp.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::onboarding::{SessionStore, SessionUpdate, VendorSession};
use crate::retrieval::Retriever;
use crate::tools::tool::{Tool, ToolContext, ToolError, ToolKind, ToolOutput, parse_params};

/// Reply for a session nobody has written to.
pub const NO_APPLICATION_MESSAGE: &str =
    "No application data found. Please start the vendor application process.";

/// Retrieval query for a company, optionally narrowed by country.
pub fn company_query(company_name: &str, country: Option<&str>) -> String {
    let mut query = format!("company information for {}", company_name);
    if let Some(country) = country.filter(|c| !c.trim().is_empty()) {
        query.push_str(&format!(" incorporated in {}", country));
    }
    query
}

/// Looks a company up in the directory and marks the session's company step.
pub struct LookupCompanyTool {
    retriever: Arc<Retriever>,
    store: Arc<dyn SessionStore>,
}

impl LookupCompanyTool {
    pub fn new(retriever: Arc<Retriever>, store: Arc<dyn SessionStore>) -> Self {
        Self { retriever, store }
    }
}

#[derive(Debug, Deserialize)]
struct LookupArgs {
    company_name: String,
    #[serde(default)]
    country: Option<String>,
    session_id: String,
}

#[async_trait]
impl Tool for LookupCompanyTool {
    fn kind(&self) -> ToolKind {
        ToolKind::LookupCompanyInformation
    }

    fn description(&self) -> &str {
        "Look up information about a company in the vendor database. Returns legal \
         information, compliance status, risk assessments and other relevant details. \
         Call this as soon as the vendor gives their company's legal name."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "company_name": {
                    "type": "string",
                    "description": "The legal name of the company to look up"
                },
                "country": {
                    "type": "string",
                    "description": "Optional country of incorporation to narrow the search"
                },
                "session_id": {
                    "type": "string",
                    "description": "Session identifier to track progress"
                }
            },
            "required": ["company_name", "session_id"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let args: LookupArgs = parse_params(params)?;

        let query = company_query(&args.company_name, args.country.as_deref());
        tracing::info!(session_id = %args.session_id, query = %query, "Company lookup");

        let result = self.retriever.search(&query, &ctx.telemetry).await;

        self.store
            .update(
                &args.session_id,
                SessionUpdate::new()
                    .company_name(&args.company_name)
                    .lookup_complete(),
            )
            .await?;

        Ok(ToolOutput::text(result))
    }
}

/// Saves the vendor's compliance certifications.
pub struct SaveComplianceTool {
    store: Arc<dyn SessionStore>,
}

impl SaveComplianceTool {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Deserialize)]
struct ComplianceArgs {
    session_id: String,
    company_name: String,
    certifications: String,
}

#[async_trait]
impl Tool for SaveComplianceTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SaveComplianceCertifications
    }

    fn description(&self) -> &str {
        "Save the compliance certifications a vendor holds (e.g. SOC 2, ISO 27001, GDPR)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Unique session identifier for this onboarding process"
                },
                "company_name": {
                    "type": "string",
                    "description": "Name of the company being onboarded"
                },
                "certifications": {
                    "type": "string",
                    "description": "Description of compliance certifications, e.g. \"SOC 2, ISO 27001, GDPR compliant\""
                }
            },
            "required": ["session_id", "company_name", "certifications"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let args: ComplianceArgs = parse_params(params)?;

        self.store
            .update(
                &args.session_id,
                SessionUpdate::new()
                    .company_name(&args.company_name)
                    .certifications(&args.certifications, Utc::now()),
            )
            .await?;

        tracing::info!(
            session_id = %args.session_id,
            company = %args.company_name,
            "Saved compliance certifications"
        );

        Ok(ToolOutput::text(format!(
            "✅ Compliance certifications saved for {}:\n{}\n\n\
             This information has been stored for the vendor risk assessment.",
            args.company_name, args.certifications
        )))
    }
}

/// Saves what data and systems the vendor needs access to.
pub struct SaveDataAccessTool {
    store: Arc<dyn SessionStore>,
}

impl SaveDataAccessTool {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Deserialize)]
struct DataAccessArgs {
    session_id: String,
    company_name: String,
    data_access_needs: String,
}

#[async_trait]
impl Tool for SaveDataAccessTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SaveDataAccessRequirements
    }

    fn description(&self) -> &str {
        "Save the vendor's data access requirements (customer data, financial systems, etc.)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Unique session identifier for this onboarding process"
                },
                "company_name": {
                    "type": "string",
                    "description": "Name of the company being onboarded"
                },
                "data_access_needs": {
                    "type": "string",
                    "description": "Description of data access requirements"
                }
            },
            "required": ["session_id", "company_name", "data_access_needs"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let args: DataAccessArgs = parse_params(params)?;

        self.store
            .update(
                &args.session_id,
                SessionUpdate::new()
                    .company_name(&args.company_name)
                    .data_access(&args.data_access_needs, Utc::now()),
            )
            .await?;

        tracing::info!(
            session_id = %args.session_id,
            company = %args.company_name,
            "Saved data access requirements"
        );

        Ok(ToolOutput::text(format!(
            "✅ Data access requirements saved for {}:\n{}\n\n\
             This information has been stored for review.",
            args.company_name, args.data_access_needs
        )))
    }
}

/// Summarizes everything collected for a session.
pub struct OnboardingSummaryTool {
    store: Arc<dyn SessionStore>,
}

impl OnboardingSummaryTool {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Deserialize)]
struct SummaryArgs {
    session_id: String,
}

#[async_trait]
impl Tool for OnboardingSummaryTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GetOnboardingSummary
    }

    fn description(&self) -> &str {
        "Get a summary of all information collected so far in this vendor application."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Unique session identifier for this onboarding process"
                }
            },
            "required": ["session_id"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let args: SummaryArgs = parse_params(params)?;
        let session = self.store.get(&args.session_id).await?;
        Ok(ToolOutput::text(render_summary(session.as_ref())))
    }
}

/// Human-readable application summary.
pub fn render_summary(session: Option<&VendorSession>) -> String {
    let Some(session) = session else {
        return NO_APPLICATION_MESSAGE.to_string();
    };

    let mut summary = String::from("📋 VENDOR APPLICATION SUMMARY\n\n");

    if let Some(ref name) = session.company_name {
        summary.push_str(&format!("**Company:** {}\n", name));
    }
    if let Some(ref certs) = session.compliance_certifications {
        summary.push_str(&format!("**Compliance Certifications:** {}\n", certs));
    }
    if let Some(ref needs) = session.data_access_needs {
        summary.push_str(&format!("**Data Access Requirements:** {}\n", needs));
    }

    let progress = session.progress();
    summary.push_str(&format!(
        "\n**Application Status:** {}/{} sections completed\n",
        progress.completed, progress.total
    ));

    let missing = session.missing_sections();
    if missing.is_empty() {
        summary.push_str(
            "\n✅ **Application Complete** - All required information has been collected.",
        );
    } else {
        let labels: Vec<&str> = missing.iter().map(|s| s.label()).collect();
        summary.push_str(&format!("\n⏳ **Pending:** {}", labels.join(", ")));
    }

    summary
}
