use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::info;

/// Глобальная (process-level) конфигурация nginx.
///
/// Заполняется внешним кодом один раз на цикл генерации и передаётся
/// в рендерер только на чтение.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MainConfig {
    pub worker_processes: String,
    pub worker_cpu_affinity: Option<String>,
    pub worker_shutdown_timeout: Option<String>,
    pub worker_connections: String,
    pub worker_rlimit_nofile: Option<String>,
    pub server_names_hash_max_size: String,
    pub server_names_hash_bucket_size: Option<String>,
    pub server_tokens: String,
    /// Включает location /nginx-health в default server
    pub health_status: bool,
    /// Включает location /stub_status (только OSS edition)
    pub stub_status: bool,
    /// IP/CIDR для ограничения доступа к служебным location.
    /// None и Some("") оба дают неограниченный вариант блока.
    pub status_allow_ip: Option<String>,
}

impl Default for MainConfig {
    fn default() -> Self {
        Self {
            worker_processes: "auto".to_string(),
            worker_cpu_affinity: None,
            worker_shutdown_timeout: None,
            worker_connections: "1024".to_string(),
            worker_rlimit_nofile: None,
            server_names_hash_max_size: "512".to_string(),
            server_names_hash_bucket_size: None,
            server_tokens: "on".to_string(),
            health_status: false,
            stub_status: false,
            status_allow_ip: None,
        }
    }
}

/// Конфигурация виртуальных серверов одного ingress-а.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct IngressConfig {
    pub servers: Vec<Server>,
    pub upstreams: Vec<Upstream>,
    /// Количество keepalive соединений к upstream (директива keepalive)
    pub keepalive: Option<String>,
}

/// Именованный пул backend серверов.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Upstream {
    pub name: String,
    pub servers: Vec<UpstreamServer>,
}

/// Один backend сервер внутри upstream блока.
///
/// max_fails=0 это легитимное значение (отключает учёт ошибок),
/// поэтому поле рендерится всегда, даже нулевое.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamServer {
    pub address: String,
    pub port: String,
    pub max_fails: u32,
    pub fail_timeout: String,
    /// Плавный ввод сервера в ротацию (только NGINX Plus)
    pub slow_start: Option<String>,
}

impl Default for UpstreamServer {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: String::new(),
            max_fails: 1,
            fail_timeout: "10s".to_string(),
            slow_start: None,
        }
    }
}

/// Один виртуальный сервер (server блок).
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Server {
    pub name: String,
    /// Метка status_zone для NGINX Plus API
    pub status_zone: Option<String>,
    pub server_tokens: Option<String>,
    pub ssl: bool,
    pub ssl_certificate: Option<String>,
    pub ssl_certificate_key: Option<String>,
    pub ssl_ports: Vec<u16>,
    pub ssl_redirect: bool,
    /// JWT аутентификация на уровне сервера
    pub jwt_auth: Option<JwtAuth>,
    pub jwt_redirect_locations: Vec<JwtRedirectLocation>,
    /// Health check-и по имени upstream (только NGINX Plus)
    pub health_checks: BTreeMap<String, HealthCheck>,
    pub locations: Vec<Location>,
}

/// Один location блок внутри виртуального сервера.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Location {
    pub path: String,
    pub upstream: Upstream,
    pub proxy_connect_timeout: String,
    pub proxy_read_timeout: String,
    pub client_max_body_size: String,
    /// JWT аутентификация уровня location. Полностью замещает
    /// серверную для этого пути (замещение, не слияние).
    pub jwt_auth: Option<JwtAuth>,
}

/// Параметры JWT аутентификации.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct JwtAuth {
    pub key: String,
    pub realm: String,
    pub token: String,
    /// Имя именованного location для редиректа по 401.
    /// Если задано, сервер обязан содержать JwtRedirectLocation
    /// с таким же именем.
    pub redirect_location_name: Option<String>,
}

/// Именованный внутренний location для редиректа на страницу логина.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct JwtRedirectLocation {
    pub name: String,
    pub login_url: String,
}

/// Параметры активной проверки здоровья upstream (только NGINX Plus).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheck {
    pub upstream_name: String,
    pub fails: u32,
    pub interval: u32,
    pub passes: u32,
    /// Дополнительные заголовки для health check запросов
    pub headers: BTreeMap<String, String>,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            upstream_name: String::new(),
            fails: 1,
            interval: 5,
            passes: 1,
            headers: BTreeMap::new(),
        }
    }
}

/// Загружает MainConfig из YAML файла
pub fn load_main_from_file<P: AsRef<Path>>(path: P) -> Result<MainConfig, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(&path)?;
    let config: MainConfig = serde_yaml::from_str(&content)?;
    info!("Loaded main config model from: {}", path.as_ref().display());
    Ok(config)
}

/// Загружает IngressConfig из YAML файла
pub fn load_ingress_from_file<P: AsRef<Path>>(path: P) -> Result<IngressConfig, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(&path)?;
    let config: IngressConfig = serde_yaml::from_str(&content)?;
    info!(
        "Loaded ingress config model from: {} ({} servers, {} upstreams)",
        path.as_ref().display(),
        config.servers.len(),
        config.upstreams.len()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_main_config_defaults() {
        let config = MainConfig::default();

        assert_eq!(config.worker_processes, "auto");
        assert_eq!(config.worker_connections, "1024");
        assert!(!config.health_status);
        assert!(!config.stub_status);
        assert!(config.status_allow_ip.is_none());
    }

    #[test]
    fn test_structural_equality() {
        // Равенство структурное, не по идентичности
        let a = MainConfig::default();
        let b = MainConfig::default();
        assert_eq!(a, b);

        let mut c = MainConfig::default();
        c.status_allow_ip = Some(String::new());
        assert_ne!(a, c);
    }

    #[test]
    fn test_load_ingress_from_yaml() {
        let yaml = r#"
servers:
  - name: test.example.com
    locations:
      - path: /
        upstream:
          name: backend
          servers:
            - address: 127.0.0.1
              port: "8080"
        proxy_connect_timeout: 10s
        proxy_read_timeout: 10s
        client_max_body_size: 2m
upstreams:
  - name: backend
    servers:
      - address: 127.0.0.1
        port: "8080"
keepalive: "16"
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = load_ingress_from_file(file.path()).unwrap();

        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].name, "test.example.com");
        assert_eq!(config.upstreams.len(), 1);
        assert_eq!(config.upstreams[0].servers[0].port, "8080");
        assert_eq!(config.keepalive.as_deref(), Some("16"));
        // Необъявленные поля получают дефолты
        assert!(!config.servers[0].ssl);
        assert!(config.servers[0].jwt_auth.is_none());
    }

    #[test]
    fn test_load_main_from_yaml() {
        let yaml = r#"
worker_processes: "4"
worker_connections: "2048"
health_status: true
stub_status: true
status_allow_ip: "10.0.0.0/8"
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = load_main_from_file(file.path()).unwrap();

        assert_eq!(config.worker_processes, "4");
        assert!(config.health_status);
        assert!(config.stub_status);
        assert_eq!(config.status_allow_ip.as_deref(), Some("10.0.0.0/8"));
        // Остальное осталось дефолтным
        assert_eq!(config.server_names_hash_max_size, "512");
    }
}
