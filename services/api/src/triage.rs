use civic_triage::config::AppConfig;
use civic_triage::error::AppError;
use civic_triage::telemetry;
use civic_triage::workflows::triage::{
    normalize, score_by_rules, CivicIssueAnalyzer, GeminiClient, Location, PhotoArtifact,
    PriorityAssessment,
};
use clap::Args;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct TriageArgs {
    /// Short title of the reported problem
    #[arg(long)]
    pub(crate) title: String,
    /// Free-text description from the citizen
    #[arg(long)]
    pub(crate) description: String,
    /// Category label, e.g. potholes or sewage-overflow
    #[arg(long, default_value = "other")]
    pub(crate) category: String,
    /// Metropolitan city of the report
    #[arg(long, default_value = "")]
    pub(crate) city: String,
    /// Area or neighbourhood within the city
    #[arg(long, default_value = "")]
    pub(crate) area: String,
    /// Street address or landmark
    #[arg(long, default_value = "")]
    pub(crate) address: String,
    /// Image file to attach; repeat for more (only the first three valid images are sent)
    #[arg(long = "photo")]
    pub(crate) photos: Vec<PathBuf>,
    /// Skip the model and print the rule-based assessment
    #[arg(long)]
    pub(crate) rules_only: bool,
}

pub(crate) async fn run_triage(args: TriageArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let photos = args
        .photos
        .iter()
        .map(|path| load_photo(path))
        .collect::<Result<Vec<_>, _>>()?;
    let location = Location {
        metropolitan_city: args.city,
        area: args.area,
        exact_address: args.address,
    };

    let assessment = if args.rules_only {
        score_by_rules(&args.title, &args.description, &args.category)
    } else {
        let model = Arc::new(GeminiClient::from_config(&config.triage)?);
        CivicIssueAnalyzer::from_config(model, &config.triage)
            .analyze_issue(
                &args.title,
                &args.description,
                &args.category,
                &photos,
                &location,
            )
            .await
    };

    println!("{}", render_report(&assessment, &photos)?);
    Ok(())
}

fn load_photo(path: &Path) -> Result<PhotoArtifact, AppError> {
    let data = std::fs::read(path)?;
    let mime_type = mime_guess::from_path(path).first_or_octet_stream();
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(PhotoArtifact::new(mime_type.essence_str(), filename, data))
}

fn render_report(
    assessment: &PriorityAssessment,
    photos: &[PhotoArtifact],
) -> Result<String, AppError> {
    let considered: Vec<&str> = normalize(photos)
        .into_iter()
        .map(|photo| photo.filename.as_str())
        .collect();
    let report = json!({
        "assessment": assessment,
        "photosConsidered": considered,
    });
    Ok(serde_json::to_string_pretty(&report)?)
}
