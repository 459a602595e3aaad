use curio_api::{AppConfig, config::Env};
use serial_test::serial;
use std::{env, panic};

// --- Setup/Teardown Utilities ---

/// All environment variables the configuration loader reads. Each test clears
/// or sets the full list so no ambient variable leaks between cases.
const CONFIG_VARS: &[&str] = &[
    "APP_ENV",
    "MONGODB_URI",
    "MONGODB_DB",
    "PORT",
    "UPLOAD_DIR",
    "JWT_ACCESS_SECRET",
    "JWT_REFRESH_SECRET",
    "CORS_ORIGIN",
];

/// Utility to run a test function and restore environment variables afterward
fn run_with_env<T, R>(test: T, cleanup_vars: Vec<&'static str>) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    // Save current environment variables
    let originals: Vec<(String, Option<String>)> = cleanup_vars
        .iter()
        .map(|&var| (var.to_string(), env::var(var).ok()))
        .collect();

    // Run the test
    let result = panic::catch_unwind(test);

    // Restore original environment variables
    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            if let Some(val) = original_value {
                env::set_var(&key, val);
            } else {
                env::remove_var(&key);
            }
        }
    }

    // Re-panic if the test failed
    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

fn clear_config_vars() {
    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_requires_database_uri() {
    let result = run_with_env(
        || {
            clear_config_vars();
            // MONGODB_URI is missing in every environment, including local.
            panic::catch_unwind(AppConfig::load)
        },
        CONFIG_VARS.to_vec(),
    );

    assert!(
        result.is_err(),
        "Config loading should panic without a database URI"
    );
}

#[test]
#[serial]
fn test_app_config_production_fail_fast() {
    let result = run_with_env(
        || {
            clear_config_vars();
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("MONGODB_URI", "mongodb://mongo:27017");
            }
            // JWT_ACCESS_SECRET, JWT_REFRESH_SECRET and CORS_ORIGIN are missing
            panic::catch_unwind(AppConfig::load)
        },
        CONFIG_VARS.to_vec(),
    );

    assert!(
        result.is_err(),
        "Production config loading should panic on missing secrets"
    );
}

#[test]
#[serial]
fn test_app_config_production_requires_cors_origin() {
    let result = run_with_env(
        || {
            clear_config_vars();
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("MONGODB_URI", "mongodb://mongo:27017");
                env::set_var("JWT_ACCESS_SECRET", "prod-access");
                env::set_var("JWT_REFRESH_SECRET", "prod-refresh");
            }
            panic::catch_unwind(AppConfig::load)
        },
        CONFIG_VARS.to_vec(),
    );

    assert!(
        result.is_err(),
        "Production config loading should panic without a pinned CORS origin"
    );
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    // Local mode should not panic, and should use hardcoded defaults
    let config = run_with_env(
        || {
            clear_config_vars();
            unsafe {
                env::set_var("APP_ENV", "local");
                env::set_var("MONGODB_URI", "mongodb://localhost:27017");
            }
            AppConfig::load()
        },
        CONFIG_VARS.to_vec(),
    );

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.db_name, "curio");
    assert_eq!(config.port, 5000);
    assert_eq!(config.upload_dir, "uploads");
    assert_eq!(config.cors_origin, None);
    // Check local JWT secret fallbacks
    assert_eq!(config.jwt_access_secret, "local-access-secret-not-for-production");
    assert_eq!(config.jwt_refresh_secret, "local-refresh-secret-not-for-production");
}

#[test]
#[serial]
fn test_app_config_reads_overrides() {
    let config = run_with_env(
        || {
            clear_config_vars();
            unsafe {
                env::set_var("MONGODB_URI", "mongodb://localhost:27017");
                env::set_var("MONGODB_DB", "antiques");
                env::set_var("PORT", "8080");
                env::set_var("UPLOAD_DIR", "/var/lib/curio/uploads");
                env::set_var("CORS_ORIGIN", "http://localhost:3000");
            }
            AppConfig::load()
        },
        CONFIG_VARS.to_vec(),
    );

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.db_name, "antiques");
    assert_eq!(config.port, 8080);
    assert_eq!(config.upload_dir, "/var/lib/curio/uploads");
    assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:3000"));
}

#[test]
#[serial]
fn test_app_config_ignores_unparseable_port() {
    let config = run_with_env(
        || {
            clear_config_vars();
            unsafe {
                env::set_var("MONGODB_URI", "mongodb://localhost:27017");
                env::set_var("PORT", "not-a-number");
            }
            AppConfig::load()
        },
        CONFIG_VARS.to_vec(),
    );

    assert_eq!(config.port, 5000);
}

#[test]
#[serial]
fn test_app_config_unknown_env_falls_back_to_local() {
    let config = run_with_env(
        || {
            clear_config_vars();
            unsafe {
                env::set_var("APP_ENV", "staging");
                env::set_var("MONGODB_URI", "mongodb://localhost:27017");
            }
            AppConfig::load()
        },
        CONFIG_VARS.to_vec(),
    );

    assert_eq!(config.env, Env::Local);
}

#[test]
#[serial]
fn test_app_config_production_complete() {
    let config = run_with_env(
        || {
            clear_config_vars();
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("MONGODB_URI", "mongodb://mongo.internal:27017");
                env::set_var("MONGODB_DB", "curio");
                env::set_var("JWT_ACCESS_SECRET", "prod-access");
                env::set_var("JWT_REFRESH_SECRET", "prod-refresh");
                env::set_var("CORS_ORIGIN", "https://curio.example.com");
            }
            AppConfig::load()
        },
        CONFIG_VARS.to_vec(),
    );

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.mongodb_uri, "mongodb://mongo.internal:27017");
    assert_eq!(config.jwt_access_secret, "prod-access");
    assert_eq!(config.jwt_refresh_secret, "prod-refresh");
    assert_eq!(config.cors_origin.as_deref(), Some("https://curio.example.com"));
}
