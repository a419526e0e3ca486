use once_cell::sync::Lazy;
use prometheus::{register_histogram, register_int_counter_vec, Histogram, IntCounterVec};
use log::info;

/// Общее количество рендеров конфигурации по шаблонам
pub static RENDERS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "config_renders_total",
        "Total configuration renders",
        &["template", "result"]
    )
    .expect("Failed to register config_renders_total metric")
});

/// Длительность одного рендера
pub static RENDER_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "config_render_duration_seconds",
        "Configuration render duration in seconds"
    )
    .expect("Failed to register config_render_duration_seconds metric")
});

/// Инициализация метрик
pub fn init_metrics() {
    info!("Prometheus metrics initialized");
    info!("Available metrics:");
    info!("  - config_renders_total");
    info!("  - config_render_duration_seconds");
}
