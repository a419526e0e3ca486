pub mod ingress;
pub mod main_config;

use thiserror::Error;

/// Ошибка привязки модели: модель структурно несовместима с ожиданиями
/// шаблона. Поле field указывает на проблемное место модели.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to bind field '{field}': {reason}")]
pub struct RenderError {
    pub field: String,
    pub reason: String,
}

/// Редакция прокси, под которую генерируется конфигурация.
/// Набор доступных директив различается, формы моделей общие.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edition {
    Oss,
    Plus,
}

/// Собирает access-control префикс для служебных location блоков.
///
/// Трёхзначная логика: не задано / задано пустым / задано значением.
/// Первые два варианта дают неограниченный блок (префикс отсутствует),
/// но через разные ветки, чтобы пустая строка не смешивалась с "не задано".
pub(crate) fn access_restriction(status_allow_ip: Option<&str>, indent: &str) -> Option<String> {
    match status_allow_ip {
        // Не настроено - блок без ограничений
        None => None,
        // Настроено пустым - тоже без ограничений
        Some("") => None,
        Some(ip) => Some(format!(
            "{indent}access_log off;\n{indent}allow {ip};\n{indent}deny all;\n"
        )),
    }
}

/// Добавляет строку-директиву с отступом, если значение задано
pub(crate) fn push_opt_directive(buf: &mut String, indent: &str, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        buf.push_str(&format!("{indent}{name} {value};\n"));
    }
}
