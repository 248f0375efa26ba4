use crate::infra::{http_backends, DirectoryThresholdStore, InMemoryDecisionRepository};
use chrono::NaiveDate;
use clap::Args;
use loan_filtering::config::AppConfig;
use loan_filtering::error::AppError;
use loan_filtering::screening::thresholds::{self, ThresholdConfig};
use loan_filtering::screening::{
    ApplicantProfile, FilteringDecision, FilteringService, ScreeningRequest,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScreenArgs {
    /// Applicant profile as JSON (same shape as the `application` field of the HTTP request)
    #[arg(long)]
    pub(crate) application: PathBuf,
    /// Evaluation date for tenure and vehicle age (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Force the regular eKYC flow even for preferred customers
    #[arg(long)]
    pub(crate) override_to_regular_flow: bool,
    /// Treat the applicant as already known to the bureau
    #[arg(long)]
    pub(crate) prior_bureau_hit: bool,
    /// Print the full decision record instead of the summary
    #[arg(long)]
    pub(crate) full: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CheckThresholdsArgs {
    /// Line of business to load (defaults to FILTERING_LOB)
    #[arg(long)]
    pub(crate) lob: Option<String>,
}

pub(crate) async fn run_screen(args: ScreenArgs) -> Result<(), AppError> {
    let ScreenArgs {
        application,
        as_of,
        override_to_regular_flow,
        prior_bureau_hit,
        full,
    } = args;

    let config = AppConfig::load()?;
    let raw = fs::read_to_string(&application)?;
    let profile: ApplicantProfile = serde_json::from_str(&raw)?;

    let backends = http_backends(&config.pipeline)?;
    let repository = Arc::new(InMemoryDecisionRepository::default());
    let service = FilteringService::new(repository, backends, config.pipeline);

    let decision = service
        .screen(ScreeningRequest {
            application: profile,
            override_to_regular_flow,
            prior_bureau_hit,
            as_of,
        })
        .await?;

    render_decision(&decision, full)
}

pub(crate) async fn run_check_thresholds(args: CheckThresholdsArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let lob = args
        .lob
        .unwrap_or_else(|| config.pipeline.line_of_business.clone());
    let store = DirectoryThresholdStore::new(config.pipeline.threshold_dir.clone());

    let loaded = thresholds::load(&store, &lob).await?;
    println!("{}", threshold_summary(&lob, &loaded));
    Ok(())
}

fn render_decision(decision: &FilteringDecision, full: bool) -> Result<(), AppError> {
    let rendered = if full {
        serde_json::to_string_pretty(decision)?
    } else {
        serde_json::to_string_pretty(&decision.summary_view())?
    };
    println!("{rendered}");
    Ok(())
}

fn threshold_summary(lob: &str, loaded: &ThresholdConfig) -> String {
    let mut lines = vec![
        format!("Thresholds for {lob}"),
        format!("- version: {}", loaded.version),
        format!(
            "- data provider: {} | face provider: {}",
            loaded.verification.data_provider.label(),
            loaded.verification.face_provider.label()
        ),
        format!(
            "- inquiry ceiling: {} | overdue ceiling: {} days",
            loaded.bureau.max_inquiries_last_month, loaded.bureau.global_overdue_ceiling_days
        ),
        format!("- fpd bands: {}", loaded.fpd_table.len()),
        format!("- ltv rows: {}", loaded.ltv_table.rows.len()),
    ];
    if loaded.ltv_table.is_empty() {
        lines.push("  warning: no ltv rows published, every run ends without product".into());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[tokio::test]
    async fn summary_lists_versions_and_table_sizes() {
        let store = DirectoryThresholdStore::new(
            Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/thresholds"),
        );
        let loaded = thresholds::load(&store, "NEW_CAR")
            .await
            .expect("sample thresholds load");

        let summary = threshold_summary("NEW_CAR", &loaded);

        assert!(summary.starts_with("Thresholds for NEW_CAR"));
        assert!(summary.contains("verification@2024-06-01"));
        assert!(summary.contains("- fpd bands: 5"));
        assert!(summary.contains("- ltv rows: 12"));
        assert!(!summary.contains("warning"));
    }
}
