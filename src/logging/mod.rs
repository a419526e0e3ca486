use tracing::info;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Инициализирует систему логирования
pub fn init_logging(level: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    // Проверяем, не установлен ли уже глобальный логгер
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", level);
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let result = if format == "json" {
        // JSON формат для production
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(false)
            .with_target(true)
            .try_init()
    } else {
        // Обычный текстовый формат для разработки
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .try_init()
    };

    match result {
        Ok(_) => {
            info!("Logging initialized with level: {}, format: {}", level, format);
        }
        Err(_) => {
            // Логгер уже установлен, используем существующий
            eprintln!("Global logger already set, using existing configuration");
        }
    }

    Ok(())
}
