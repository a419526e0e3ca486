use crate::config::MainConfig;
use crate::render::{access_restriction, push_opt_directive, Edition};

/// Рендерит process-level конфигурацию (nginx.conf) для выбранной редакции.
///
/// Служебные location собираются отдельными чистыми функциями, чтобы
/// комбинации переключателей health_status/stub_status/status_allow_ip
/// проверялись независимо друг от друга.
pub fn render_main(cfg: &MainConfig, edition: Edition) -> String {
    let mut buf = String::new();

    buf.push_str("user nginx;\n");
    buf.push_str(&format!("worker_processes {};\n", cfg.worker_processes));
    push_opt_directive(&mut buf, "", "worker_cpu_affinity", cfg.worker_cpu_affinity.as_deref());
    push_opt_directive(
        &mut buf,
        "",
        "worker_shutdown_timeout",
        cfg.worker_shutdown_timeout.as_deref(),
    );
    buf.push('\n');
    buf.push_str("daemon off;\n");
    buf.push('\n');
    buf.push_str("error_log /var/log/nginx/error.log warn;\n");
    buf.push_str("pid /var/run/nginx.pid;\n");
    push_opt_directive(&mut buf, "", "worker_rlimit_nofile", cfg.worker_rlimit_nofile.as_deref());
    buf.push('\n');

    buf.push_str("events {\n");
    buf.push_str(&format!("    worker_connections {};\n", cfg.worker_connections));
    buf.push_str("}\n");
    buf.push('\n');

    buf.push_str("http {\n");
    buf.push_str("    include /etc/nginx/mime.types;\n");
    buf.push_str("    default_type application/octet-stream;\n");
    buf.push('\n');
    buf.push_str("    log_format main '$remote_addr - $remote_user [$time_local] \"$request\" '\n");
    buf.push_str("                    '$status $body_bytes_sent \"$http_referer\" '\n");
    buf.push_str("                    '\"$http_user_agent\" \"$http_x_forwarded_for\"';\n");
    buf.push('\n');
    buf.push_str("    access_log /var/log/nginx/access.log main;\n");
    buf.push('\n');
    buf.push_str("    sendfile on;\n");
    buf.push('\n');
    buf.push_str("    keepalive_timeout 65;\n");
    buf.push('\n');
    buf.push_str(&format!(
        "    server_names_hash_max_size {};\n",
        cfg.server_names_hash_max_size
    ));
    push_opt_directive(
        &mut buf,
        "    ",
        "server_names_hash_bucket_size",
        cfg.server_names_hash_bucket_size.as_deref(),
    );
    buf.push('\n');
    buf.push_str("    include /etc/nginx/conf.d/*.conf;\n");
    buf.push('\n');

    // Default server со служебными location
    buf.push_str("    server {\n");
    buf.push_str("        listen 80 default_server;\n");
    buf.push('\n');
    buf.push_str("        server_name _;\n");
    buf.push_str(&format!("        server_tokens \"{}\";\n", cfg.server_tokens));
    buf.push('\n');

    if let Some(block) = health_location(cfg) {
        buf.push_str(&block);
        buf.push('\n');
    }

    // /stub_status есть только в OSS: в Plus его заменяет API модуль
    if edition == Edition::Oss {
        if let Some(block) = stub_status_location(cfg) {
            buf.push_str(&block);
            buf.push('\n');
        }
    }

    // Status/metrics API присутствует всегда, ровно один раз,
    // и никогда не попадает под access-control ограничение
    buf.push_str(&api_location(edition));
    buf.push('\n');

    buf.push_str("        location / {\n");
    buf.push_str("            return 404;\n");
    buf.push_str("        }\n");
    buf.push_str("    }\n");
    buf.push_str("}\n");

    buf
}

/// Location /nginx-health: присутствует только при health_status=true,
/// ограничивается при непустом status_allow_ip
fn health_location(cfg: &MainConfig) -> Option<String> {
    if !cfg.health_status {
        return None;
    }

    let mut block = String::new();
    block.push_str("        location /nginx-health {\n");
    if let Some(restriction) = access_restriction(cfg.status_allow_ip.as_deref(), "            ") {
        block.push_str(&restriction);
        block.push('\n');
    }
    block.push_str("            default_type text/plain;\n");
    block.push_str("            return 200 \"healthy\\n\";\n");
    block.push_str("        }\n");
    Some(block)
}

/// Location /stub_status: присутствует только при stub_status=true,
/// ограничивается при непустом status_allow_ip
fn stub_status_location(cfg: &MainConfig) -> Option<String> {
    if !cfg.stub_status {
        return None;
    }

    let mut block = String::new();
    block.push_str("        location /stub_status {\n");
    if let Some(restriction) = access_restriction(cfg.status_allow_ip.as_deref(), "            ") {
        block.push_str(&restriction);
        block.push('\n');
    }
    block.push_str("            stub_status;\n");
    block.push_str("        }\n");
    Some(block)
}

/// Location /api: status/metrics API, безусловный и без ограничений
fn api_location(edition: Edition) -> String {
    let mut block = String::new();
    block.push_str("        location /api {\n");
    match edition {
        Edition::Plus => {
            block.push_str("            api write=off;\n");
        }
        Edition::Oss => {
            block.push_str("            access_log off;\n");
            block.push('\n');
            block.push_str("            default_type application/json;\n");
            block.push_str("            return 200 \"{}\\n\";\n");
        }
    }
    block.push_str("        }\n");
    block
}
