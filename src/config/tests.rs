use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn ttls_default_to_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.auth.session_ttl, Duration::from_secs(14 * 24 * 3600));
    assert_eq!(settings.cache.post_ttl, Duration::from_secs(4 * 3600));
    assert_eq!(settings.cache.slug_exists_ttl, Duration::from_secs(3600));
    assert_eq!(settings.cache.draft_ttl, Duration::from_secs(7 * 24 * 3600));
}

#[test]
fn kv_defaults_to_memory_with_namespace() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.kv.backend, KvBackend::Memory);
    assert_eq!(settings.kv.prefix, "nuxtpress");
}

#[test]
fn redis_backend_requires_url() {
    let mut raw = RawSettings::default();
    raw.kv.backend = Some("redis".to_string());

    let err = Settings::from_raw(raw).expect_err("missing url must fail");
    assert!(matches!(err, LoadError::Invalid { key: "kv.url", .. }));
}

#[test]
fn redis_backend_accepts_cli_url() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        kv_backend: Some("Redis".to_string()),
        kv_url: Some("redis://127.0.0.1:6379".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(
        settings.kv.backend,
        KvBackend::Redis {
            url: "redis://127.0.0.1:6379".to_string()
        }
    );
}

#[test]
fn kv_prefix_drops_trailing_separator() {
    let mut raw = RawSettings::default();
    raw.kv.prefix = Some("blog:".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.kv.prefix, "blog");
}

#[test]
fn zero_session_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.auth.session_ttl_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ttl must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "auth.session_ttl_seconds",
            ..
        }
    ));
}

#[test]
fn empty_password_counts_as_unset() {
    let mut raw = RawSettings::default();
    raw.auth.password = Some(String::new());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.auth.password.is_none());
    assert!(settings.auth.secure_cookies);
}

#[test]
fn debug_output_redacts_password() {
    let mut raw = RawSettings::default();
    raw.auth.password = Some("hunter2".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    let rendered = format!("{:?}", settings.auth);
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn site_defaults_fill_missing_values() {
    let mut raw = RawSettings::default();
    raw.site.name = Some("Field Notes".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.site.name, "Field Notes");
    assert_eq!(settings.site.theme_color, DEFAULT_THEME_COLOR);
    assert_eq!(settings.site.github, "");
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["nuxtpress"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_migrate_arguments() {
    let args = CliArgs::parse_from([
        "nuxtpress",
        "migrate",
        "--database-url",
        "postgres://example",
        "--force",
    ]);

    match args.command.expect("migrate command") {
        Command::Migrate(migrate) => {
            assert_eq!(
                migrate.database.database_url.as_deref(),
                Some("postgres://example")
            );
            assert!(migrate.force);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "nuxtpress",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--auth-trust-forwarded-for",
        "true",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.auth_trust_forwarded_for, Some(true));
        }
        _ => panic!("wrong command parsed"),
    }
}
