use env_logger;
use log::info;
use std::fs;
use std::process;

use clap::{Arg, Command};

use nginx_confgen::config::{self, IngressConfig};
use nginx_confgen::logging::init_logging;
use nginx_confgen::metrics::init_metrics;
use nginx_confgen::template::{
    self, ConfigPayload, NGINX_INGRESS_TMPL, NGINX_MAIN_TMPL, NGINX_PLUS_INGRESS_TMPL,
    NGINX_PLUS_MAIN_TMPL,
};

fn main() {
    // Парсим аргументы командной строки
    let matches = Command::new("nginx-confgen")
        .version("0.1.0")
        .about("nginx-confgen - Renders typed proxy configuration models into nginx config text")
        .arg(Arg::new("test")
            .long("test")
            .help("Test configuration model and exit")
            .action(clap::ArgAction::SetTrue))
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .value_name("FILE")
            .help("Configuration model file path (YAML)")
            .required(true))
        .arg(Arg::new("template")
            .short('t')
            .long("template")
            .value_name("NAME")
            .help("Template name: nginx.tmpl, nginx-plus.tmpl, nginx.ingress.tmpl, nginx-plus.ingress.tmpl")
            .default_value(NGINX_MAIN_TMPL))
        .arg(Arg::new("output")
            .short('o')
            .long("output")
            .value_name("FILE")
            .help("Output file path (stdout if omitted)"))
        .arg(Arg::new("log-level")
            .long("log-level")
            .value_name("LEVEL")
            .default_value("info"))
        .arg(Arg::new("log-format")
            .long("log-format")
            .value_name("FORMAT")
            .default_value("text"))
        .get_matches();

    let config_path = matches.get_one::<String>("config").unwrap();
    let template_name = matches.get_one::<String>("template").unwrap();

    // Если запрошена проверка модели
    if matches.get_flag("test") {
        // Инициализируем базовое логирование только для тестирования
        env_logger::init();
        test_configuration(config_path, template_name);
        return;
    }

    let level = matches.get_one::<String>("log-level").unwrap();
    let format = matches.get_one::<String>("log-format").unwrap();
    if let Err(e) = init_logging(level, format) {
        eprintln!("Failed to initialize logging: {}, falling back to env_logger", e);
        env_logger::init();
    }

    init_metrics();

    // Загружаем модель того вида, который ожидает шаблон
    let payload = match template_name.as_str() {
        NGINX_MAIN_TMPL | NGINX_PLUS_MAIN_TMPL => {
            match config::load_main_from_file(config_path) {
                Ok(cfg) => ConfigPayload::Main(cfg),
                Err(e) => {
                    eprintln!("Failed to load config model from {}: {}", config_path, e);
                    process::exit(1);
                }
            }
        }
        NGINX_INGRESS_TMPL | NGINX_PLUS_INGRESS_TMPL => {
            match config::load_ingress_from_file(config_path) {
                Ok(cfg) => ConfigPayload::Ingress(cfg),
                Err(e) => {
                    eprintln!("Failed to load config model from {}: {}", config_path, e);
                    process::exit(1);
                }
            }
        }
        other => {
            eprintln!("Unknown template: {}", other);
            process::exit(1);
        }
    };

    let text = match template::render(template_name, &payload) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Failed to render template {}: {}", template_name, e);
            process::exit(1);
        }
    };

    match matches.get_one::<String>("output") {
        Some(output_path) => {
            if let Err(e) = fs::write(output_path, &text) {
                eprintln!("Failed to write {}: {}", output_path, e);
                process::exit(1);
            }
            info!("Rendered {} to {} ({} bytes)", template_name, output_path, text.len());
        }
        None => {
            print!("{}", text);
        }
    }
}

/// Функция проверки модели конфигурации (как nginx -t).
///
/// Ссылочная целостность проверяется здесь, на границе CLI:
/// сам рендерер её повторно не проверяет.
fn test_configuration(config_path: &str, template_name: &str) {
    println!("nginx-confgen: testing configuration model...");

    let mut errors = 0;
    let mut warnings = 0;

    match template_name {
        NGINX_MAIN_TMPL | NGINX_PLUS_MAIN_TMPL => {
            match config::load_main_from_file(config_path) {
                Ok(_) => {
                    println!("nginx-confgen: configuration model {} syntax is ok", config_path);
                }
                Err(e) => {
                    println!("nginx-confgen: [error] model {} test failed: {}", config_path, e);
                    errors += 1;
                }
            }
        }
        NGINX_INGRESS_TMPL | NGINX_PLUS_INGRESS_TMPL => {
            match config::load_ingress_from_file(config_path) {
                Ok(cfg) => {
                    println!("nginx-confgen: configuration model {} syntax is ok", config_path);
                    let (e, w) = check_ingress_model(&cfg);
                    errors += e;
                    warnings += w;
                }
                Err(e) => {
                    println!("nginx-confgen: [error] model {} test failed: {}", config_path, e);
                    errors += 1;
                }
            }
        }
        other => {
            println!("nginx-confgen: [error] unknown template: {}", other);
            errors += 1;
        }
    }

    // Выводим результат
    if errors > 0 {
        println!("nginx-confgen: configuration model {} test failed", config_path);
        process::exit(1);
    } else if warnings > 0 {
        println!(
            "nginx-confgen: configuration model {} test is successful (with {} warning(s))",
            config_path, warnings
        );
    } else {
        println!("nginx-confgen: configuration model {} test is successful", config_path);
    }
}

/// Ссылочные проверки ingress модели
fn check_ingress_model(cfg: &IngressConfig) -> (u32, u32) {
    let mut errors = 0;
    let mut warnings = 0;

    println!(
        "nginx-confgen: found {} server(s) and {} upstream(s)",
        cfg.servers.len(),
        cfg.upstreams.len()
    );

    let upstream_names: Vec<&str> = cfg.upstreams.iter().map(|u| u.name.as_str()).collect();

    // Проверяем upstreams
    for upstream in &cfg.upstreams {
        if upstream.servers.is_empty() {
            println!("nginx-confgen: [error] upstream '{}' has no servers", upstream.name);
            errors += 1;
        } else {
            println!(
                "nginx-confgen: upstream '{}' has {} server(s)",
                upstream.name,
                upstream.servers.len()
            );
        }
    }

    // Проверяем каждый сервер
    for (i, server) in cfg.servers.iter().enumerate() {
        println!("nginx-confgen: testing server {} ({})", i + 1, server.name);

        if server.ssl {
            if server.ssl_certificate.is_none() {
                println!("nginx-confgen: [warn] server '{}' has SSL enabled but no certificate", server.name);
                warnings += 1;
            }
            if server.ssl_certificate_key.is_none() {
                println!("nginx-confgen: [warn] server '{}' has SSL enabled but no private key", server.name);
                warnings += 1;
            }
        } else if server.ssl_redirect {
            println!(
                "nginx-confgen: [warn] server '{}' requests SSL redirect without SSL, redirect will be skipped",
                server.name
            );
            warnings += 1;
        }

        // Проверяем ссылки location -> upstream
        for location in &server.locations {
            if !upstream_names.contains(&location.upstream.name.as_str()) {
                println!(
                    "nginx-confgen: [error] upstream '{}' not found for location '{}'",
                    location.upstream.name, location.path
                );
                errors += 1;
            }
        }

        // Проверяем ссылки на redirect locations
        let redirect_names: Vec<&str> = server
            .jwt_redirect_locations
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        let auths = server
            .jwt_auth
            .iter()
            .chain(server.locations.iter().filter_map(|l| l.jwt_auth.as_ref()));
        for jwt in auths {
            if let Some(name) = jwt.redirect_location_name.as_deref() {
                if !name.is_empty() && !redirect_names.contains(&name) {
                    println!(
                        "nginx-confgen: [error] redirect location '{}' not found in server '{}'",
                        name, server.name
                    );
                    errors += 1;
                }
            }
        }

        // Проверяем health checks
        for upstream_name in server.health_checks.keys() {
            if !upstream_names.contains(&upstream_name.as_str()) {
                println!(
                    "nginx-confgen: [warn] health check references unknown upstream '{}'",
                    upstream_name
                );
                warnings += 1;
            }
        }
    }

    (errors, warnings)
}
