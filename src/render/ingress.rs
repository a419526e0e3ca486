use std::collections::BTreeSet;

use crate::config::{IngressConfig, JwtAuth, Location, Server, Upstream};
use crate::render::{push_opt_directive, Edition, RenderError};

/// Рендерит конфигурацию виртуальных серверов одного ingress-а.
///
/// Порядок блоков повторяет порядок входных последовательностей
/// байт-в-байт: от него зависят веса балансировки и порядок
/// сопоставления location.
pub fn render_ingress(cfg: &IngressConfig, edition: Edition) -> Result<String, RenderError> {
    let mut buf = String::new();

    for upstream in &cfg.upstreams {
        buf.push_str(&upstream_block(upstream, cfg.keepalive.as_deref(), edition));
        buf.push('\n');
    }

    for server in &cfg.servers {
        buf.push_str(&server_block(server, edition)?);
        buf.push('\n');
    }

    Ok(buf)
}

/// Рендерит один upstream блок.
///
/// max_fails и fail_timeout выводятся всегда: нулевое значение
/// max_fails это осознанное "выключено", а не отсутствие настройки.
fn upstream_block(upstream: &Upstream, keepalive: Option<&str>, edition: Edition) -> String {
    let mut block = String::new();
    block.push_str(&format!("upstream {} {{\n", upstream.name));
    if edition == Edition::Plus {
        block.push_str(&format!("    zone {} 256k;\n", upstream.name));
    }
    for server in &upstream.servers {
        block.push_str(&format!(
            "    server {}:{} max_fails={} fail_timeout={}",
            server.address, server.port, server.max_fails, server.fail_timeout
        ));
        if edition == Edition::Plus {
            if let Some(slow_start) = server.slow_start.as_deref() {
                if !slow_start.is_empty() {
                    block.push_str(&format!(" slow_start={}", slow_start));
                }
            }
        }
        block.push_str(";\n");
    }
    if let Some(keepalive) = keepalive {
        if !keepalive.is_empty() {
            block.push_str(&format!("    keepalive {};\n", keepalive));
        }
    }
    block.push_str("}\n");
    block
}

/// Рендерит один server блок со всеми его location
fn server_block(server: &Server, edition: Edition) -> Result<String, RenderError> {
    // Ссылки на redirect location проверяются до начала сборки,
    // чтобы при ошибке не возвращать частичный текст
    let mut redirect_names = referenced_redirect_names(server)?;

    let mut block = String::new();
    block.push_str("server {\n");
    block.push_str("    listen 80;\n");
    if server.ssl {
        if server.ssl_ports.is_empty() {
            // Порт по умолчанию, если явно не задан
            block.push_str("    listen 443 ssl;\n");
        } else {
            for port in &server.ssl_ports {
                block.push_str(&format!("    listen {} ssl;\n", port));
            }
        }
        push_opt_directive(&mut block, "    ", "ssl_certificate", server.ssl_certificate.as_deref());
        push_opt_directive(
            &mut block,
            "    ",
            "ssl_certificate_key",
            server.ssl_certificate_key.as_deref(),
        );
    }
    block.push('\n');
    block.push_str(&format!("    server_name {};\n", server.name));
    if edition == Edition::Plus {
        push_opt_directive(&mut block, "    ", "status_zone", server.status_zone.as_deref());
    }
    push_opt_directive(&mut block, "    ", "server_tokens", server.server_tokens.as_deref());

    // Серверная JWT аутентификация действует на все location,
    // кроме тех, где задана собственная
    if edition == Edition::Plus {
        if let Some(jwt) = &server.jwt_auth {
            block.push('\n');
            block.push_str(&jwt_directives(jwt, "    "));
        }
    }

    // Редирект на https разрешён только при включённом TLS
    if server.ssl && server.ssl_redirect {
        block.push('\n');
        block.push_str("    if ($scheme = http) {\n");
        block.push_str("        return 301 https://$host$request_uri;\n");
        block.push_str("    }\n");
    }

    for location in &server.locations {
        block.push('\n');
        block.push_str(&location_block(location, server, edition));
    }

    // Именованные redirect location: ровно один блок на каждое
    // реально используемое имя, в порядке объявления
    if edition == Edition::Plus {
        for redirect in &server.jwt_redirect_locations {
            if redirect_names.remove(redirect.name.as_str()) {
                block.push('\n');
                block.push_str(&format!("    location {} {{\n", redirect.name));
                block.push_str("        internal;\n");
                block.push_str(&format!("        return 302 {};\n", redirect.login_url));
                block.push_str("    }\n");
            }
        }
    }

    block.push_str("}\n");
    Ok(block)
}

/// Рендерит один location блок
fn location_block(location: &Location, server: &Server, edition: Edition) -> String {
    let mut block = String::new();
    block.push_str(&format!("    location {} {{\n", location.path));
    block.push_str("        proxy_http_version 1.1;\n");

    if edition == Edition::Plus {
        // Замещение по наличию: собственная JWT аутентификация
        // location полностью вытесняет серверную для этого пути
        if let Some(jwt) = &location.jwt_auth {
            block.push('\n');
            block.push_str(&jwt_directives(jwt, "        "));
        }

        if let Some(hc) = server.health_checks.get(&location.upstream.name) {
            block.push('\n');
            block.push_str(&format!(
                "        health_check interval={}s fails={} passes={};\n",
                hc.interval, hc.fails, hc.passes
            ));
            for (name, value) in &hc.headers {
                block.push_str(&format!("        proxy_set_header {} \"{}\";\n", name, value));
            }
        }
    }

    block.push('\n');
    block.push_str(&format!("        proxy_connect_timeout {};\n", location.proxy_connect_timeout));
    block.push_str(&format!("        proxy_read_timeout {};\n", location.proxy_read_timeout));
    block.push_str(&format!("        client_max_body_size {};\n", location.client_max_body_size));
    block.push('\n');
    block.push_str("        proxy_set_header Host $host;\n");
    block.push_str("        proxy_set_header X-Real-IP $remote_addr;\n");
    block.push_str("        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;\n");
    block.push_str("        proxy_set_header X-Forwarded-Host $host;\n");
    block.push_str("        proxy_set_header X-Forwarded-Port $server_port;\n");
    block.push_str("        proxy_set_header X-Forwarded-Proto $scheme;\n");
    block.push('\n');
    block.push_str(&format!("        proxy_pass http://{};\n", location.upstream.name));
    block.push_str("    }\n");
    block
}

/// Рендерит директивы JWT аутентификации
fn jwt_directives(jwt: &JwtAuth, indent: &str) -> String {
    let mut block = String::new();
    block.push_str(&format!("{indent}auth_jwt_key_file {};\n", jwt.key));
    if jwt.token.is_empty() {
        block.push_str(&format!("{indent}auth_jwt \"{}\";\n", jwt.realm));
    } else {
        block.push_str(&format!("{indent}auth_jwt \"{}\" token={};\n", jwt.realm, jwt.token));
    }
    if let Some(name) = jwt.redirect_location_name.as_deref() {
        if !name.is_empty() {
            block.push_str(&format!("{indent}error_page 401 {};\n", name));
        }
    }
    block
}

/// Собирает имена redirect location, на которые ссылается хотя бы одна
/// JWT аутентификация сервера. Ссылка на необъявленное имя это ошибка
/// привязки модели.
fn referenced_redirect_names(server: &Server) -> Result<BTreeSet<&str>, RenderError> {
    let defined: BTreeSet<&str> = server
        .jwt_redirect_locations
        .iter()
        .map(|r| r.name.as_str())
        .collect();

    let mut referenced = BTreeSet::new();
    let auths = server
        .jwt_auth
        .iter()
        .chain(server.locations.iter().filter_map(|l| l.jwt_auth.as_ref()));

    for jwt in auths {
        if let Some(name) = jwt.redirect_location_name.as_deref() {
            if name.is_empty() {
                continue;
            }
            if !defined.contains(name) {
                return Err(RenderError {
                    field: "jwt_auth.redirect_location_name".to_string(),
                    reason: format!(
                        "redirect location '{}' is not defined in server '{}'",
                        name, server.name
                    ),
                });
            }
            referenced.insert(name);
        }
    }

    Ok(referenced)
}
