use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all task runner metrics
const PREFIX: &str = "http_task_runner";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Attempt Metrics
    pub static ref ATTEMPTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_attempts_total"), "Total HTTP attempts by outcome"),
        &["outcome"]
    ).expect("Failed to create attempts_total metric");

    pub static ref ATTEMPT_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_attempt_duration_seconds"),
            "HTTP attempt latency in seconds"
        )
        .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])
    ).expect("Failed to create attempt_duration_seconds metric");

    // Run Metrics
    pub static ref RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_runs_total"), "Finished runs by status"),
        &["status"]
    ).expect("Failed to create runs_total metric");

    pub static ref RUN_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_run_duration_seconds"),
            "Run duration in seconds"
        )
        .buckets(vec![0.1, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0]),
        &["origin"]
    ).expect("Failed to create run_duration_seconds metric");

    pub static ref ACTIVE_RUNS: Gauge = Gauge::new(
        format!("{PREFIX}_active_runs"),
        "Number of runs in progress"
    ).expect("Failed to create active_runs metric");

    // Scheduler Metrics
    pub static ref SCHEDULED_TASKS: Gauge = Gauge::new(
        format!("{PREFIX}_scheduled_tasks"),
        "Number of tasks registered with the scheduler"
    ).expect("Failed to create scheduled_tasks metric");

    pub static ref SCHEDULE_TRIGGERS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_schedule_triggers_total"), "Cron triggers by result"),
        &["result"]
    ).expect("Failed to create schedule_triggers_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(ATTEMPTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ATTEMPT_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RUN_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(ACTIVE_RUNS.clone()));
    let _ = REGISTRY.register(Box::new(SCHEDULED_TASKS.clone()));
    let _ = REGISTRY.register(Box::new(SCHEDULE_TRIGGERS_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record one HTTP attempt
pub fn record_attempt(success: bool, latency: Duration) {
    let outcome = if success { "success" } else { "failure" };
    ATTEMPTS_TOTAL.with_label_values(&[outcome]).inc();
    ATTEMPT_DURATION_SECONDS.observe(latency.as_secs_f64());
}

/// Record a finished run
pub fn record_run(status: &str, origin: &str, duration: Duration) {
    RUNS_TOTAL.with_label_values(&[status]).inc();
    RUN_DURATION_SECONDS
        .with_label_values(&[origin])
        .observe(duration.as_secs_f64());
}

pub fn run_started() {
    ACTIVE_RUNS.inc();
}

pub fn run_finished() {
    ACTIVE_RUNS.dec();
}

pub fn set_scheduled_tasks(count: usize) {
    SCHEDULED_TASKS.set(count as f64);
}

/// Record a cron trigger ("started", "skipped" or "failed")
pub fn record_schedule_trigger(result: &str) {
    SCHEDULE_TRIGGERS_TOTAL.with_label_values(&[result]).inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
