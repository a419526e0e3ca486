use std::collections::HashMap;
use std::time::Instant;

use log::{debug, warn};
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::config::{IngressConfig, MainConfig};
use crate::metrics::{RENDERS_TOTAL, RENDER_DURATION};
use crate::render::ingress::render_ingress;
use crate::render::main_config::render_main;
use crate::render::{Edition, RenderError};

pub const NGINX_MAIN_TMPL: &str = "nginx.tmpl";
pub const NGINX_INGRESS_TMPL: &str = "nginx.ingress.tmpl";
pub const NGINX_PLUS_MAIN_TMPL: &str = "nginx-plus.tmpl";
pub const NGINX_PLUS_INGRESS_TMPL: &str = "nginx-plus.ingress.tmpl";

/// Ошибки генерации конфигурации. Два вида: шаблон не найден и
/// несовместимость модели с шаблоном. Частичный вывод наружу не
/// попадает ни в одном из случаев.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("template '{name}' not found")]
    Load { name: String },
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Какой вид модели принимает шаблон
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadKind {
    Main,
    Ingress,
}

/// Описание зарегистрированного шаблона
#[derive(Debug, Clone, Copy)]
struct Template {
    edition: Edition,
    kind: PayloadKind,
}

/// Реестр шаблонов заполняется один раз и дальше только читается,
/// в том числе из параллельных вызовов render
static TEMPLATES: Lazy<HashMap<&'static str, Template>> = Lazy::new(|| {
    let mut templates = HashMap::new();
    templates.insert(
        NGINX_MAIN_TMPL,
        Template { edition: Edition::Oss, kind: PayloadKind::Main },
    );
    templates.insert(
        NGINX_INGRESS_TMPL,
        Template { edition: Edition::Oss, kind: PayloadKind::Ingress },
    );
    templates.insert(
        NGINX_PLUS_MAIN_TMPL,
        Template { edition: Edition::Plus, kind: PayloadKind::Main },
    );
    templates.insert(
        NGINX_PLUS_INGRESS_TMPL,
        Template { edition: Edition::Plus, kind: PayloadKind::Ingress },
    );
    templates
});

/// Модель, привязываемая к шаблону
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigPayload {
    Main(MainConfig),
    Ingress(IngressConfig),
}

impl ConfigPayload {
    fn kind_name(&self) -> &'static str {
        match self {
            ConfigPayload::Main(_) => "MainConfig",
            ConfigPayload::Ingress(_) => "IngressConfig",
        }
    }
}

/// Рендерит модель через именованный шаблон.
///
/// Возвращает либо полный текст конфигурации, либо ошибку. Вызов
/// чистый и не трогает модель, поэтому параллельные рендеры
/// независимых моделей не требуют синхронизации.
pub fn render(name: &str, payload: &ConfigPayload) -> Result<String, TemplateError> {
    let template = match TEMPLATES.get(name) {
        Some(template) => *template,
        None => {
            warn!("Template '{}' not found", name);
            RENDERS_TOTAL.with_label_values(&[name, "error"]).inc();
            return Err(TemplateError::Load { name: name.to_string() });
        }
    };

    let started = Instant::now();
    let result = match (template.kind, payload) {
        (PayloadKind::Main, ConfigPayload::Main(cfg)) => Ok(render_main(cfg, template.edition)),
        (PayloadKind::Ingress, ConfigPayload::Ingress(cfg)) => {
            render_ingress(cfg, template.edition).map_err(TemplateError::from)
        }
        // Модель не того вида, что ожидает шаблон
        (expected, payload) => Err(TemplateError::Render(RenderError {
            field: "payload".to_string(),
            reason: format!(
                "template '{}' expects a {} model, got {}",
                name,
                match expected {
                    PayloadKind::Main => "MainConfig",
                    PayloadKind::Ingress => "IngressConfig",
                },
                payload.kind_name()
            ),
        })),
    };

    RENDER_DURATION.observe(started.elapsed().as_secs_f64());
    match &result {
        Ok(text) => {
            RENDERS_TOTAL.with_label_values(&[name, "success"]).inc();
            debug!("Rendered template '{}' ({} bytes)", name, text.len());
        }
        Err(e) => {
            RENDERS_TOTAL.with_label_values(&[name, "error"]).inc();
            warn!("Failed to render template '{}': {}", name, e);
        }
    }

    result
}
