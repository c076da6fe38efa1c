use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use recruit_flow::config::AppConfig;
use recruit_flow::error::AppError;
use recruit_flow::telemetry;
use recruit_flow::workflows::outreach::{
    outreach_router, Candidate, CandidateId, CancellationToken, CourierClient, EnrollmentService,
    InMemoryEnrollmentStore, SequenceCompiler, SequenceDefinition, SequenceLibrary,
    EMAIL_TEMPLATES,
};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Recruit Flow Outreach Service",
    about = "Compile recruiter outreach sequences and manage candidate enrollments from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Work with outreach sequences without touching the automation service
    Sequence {
        #[command(subcommand)]
        command: SequenceCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum SequenceCommand {
    /// Compile a sequence into its automation program and print the JSON
    Preview(SequencePreviewArgs),
    /// List the built-in sequence templates and email template catalog
    Templates,
}

#[derive(Args, Debug)]
struct SequencePreviewArgs {
    /// Path to a sequence definition JSON file
    #[arg(long, conflicts_with = "template", required_unless_present = "template")]
    file: Option<PathBuf>,
    /// Key of a built-in sequence template (see `sequence templates`)
    #[arg(long)]
    template: Option<String>,
    /// Candidate id used in the status webhook URL
    #[arg(long, default_value = "preview-candidate")]
    candidate_id: String,
    /// Candidate display name
    #[arg(long)]
    candidate_name: String,
    /// Candidate email address
    #[arg(long)]
    candidate_email: String,
    /// Open position merged into the email templates
    #[arg(long)]
    position: Option<String>,
    /// Date the sequence should begin (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    start_date: NaiveDate,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Sequence {
            command: SequenceCommand::Preview(args),
        } => run_sequence_preview(args),
        Command::Sequence {
            command: SequenceCommand::Templates,
        } => {
            render_sequence_templates();
            Ok(())
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let gateway = Arc::new(CourierClient::new(&config.courier)?);
    let repository = Arc::new(InMemoryEnrollmentStore::default());
    let compiler = SequenceCompiler::new(&config.outreach);
    let service = Arc::new(EnrollmentService::new(compiler, gateway, repository));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(outreach_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "outreach service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_sequence_preview(args: SequencePreviewArgs) -> Result<(), AppError> {
    let SequencePreviewArgs {
        file,
        template,
        candidate_id,
        candidate_name,
        candidate_email,
        position,
        start_date,
    } = args;

    let config = AppConfig::load()?;
    let compiler = SequenceCompiler::new(&config.outreach);

    let sequence = load_sequence(file, template)?;
    let candidate = Candidate {
        id: CandidateId(candidate_id),
        name: candidate_name,
        email: candidate_email,
        position,
        status: None,
        progress: None,
        sequence: None,
    };

    // The preview never reaches the automation service, so a placeholder
    // token stands in for the one minted at enroll time.
    let token = CancellationToken("preview".to_string());
    let program = compiler.compile(&sequence, &candidate, start_date, &token)?;

    println!("{}", serde_json::to_string_pretty(&program)?);
    Ok(())
}

fn load_sequence(
    file: Option<PathBuf>,
    template: Option<String>,
) -> Result<SequenceDefinition, AppError> {
    if let Some(path) = file {
        let raw = fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&raw)?);
    }

    let key = template.unwrap_or_default();
    let library = SequenceLibrary::standard();
    match library.find(&key) {
        Some(found) => Ok(found.to_sequence()),
        None => Err(AppError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no built-in sequence template named '{key}'"),
        ))),
    }
}

fn render_sequence_templates() {
    let library = SequenceLibrary::standard();

    println!("Built-in sequence templates");
    for template in library.templates() {
        println!("\n{} ({})", template.name, template.key);
        println!("  {}", template.description);
        for step in &template.steps {
            let timing = match step.delay {
                Some(delay) => format!("after {delay}"),
                None => "immediately".to_string(),
            };
            let gate = if step.check_status {
                ", gated on candidate status"
            } else {
                ""
            };
            println!("  {}. {} ({timing}{gate})", step.id, step.email_template);
        }
    }

    println!("\nEmail templates: {}", EMAIL_TEMPLATES.join(", "));
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_iso_dates() {
        assert_eq!(
            parse_date(" 2025-06-01 ").expect("parses"),
            NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
        );
        assert!(parse_date("06/01/2025").is_err());
    }

    #[test]
    fn load_sequence_resolves_library_templates() {
        let sequence = load_sequence(None, Some("candidate-rejection".to_string()))
            .expect("template resolves");
        assert_eq!(sequence.name, "Candidate Rejection");
        assert_eq!(sequence.steps.len(), 2);

        assert!(load_sequence(None, Some("nonexistent".to_string())).is_err());
    }
}
