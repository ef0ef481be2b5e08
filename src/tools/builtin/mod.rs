//! Built-in vendor onboarding tools.

pub mod vendor;

pub use vendor::{
    LookupCompanyTool, NO_APPLICATION_MESSAGE, OnboardingSummaryTool, SaveComplianceTool,
    SaveDataAccessTool, company_query, render_summary,
};
