use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 19] = [
        "RUST_LOG",
        "JIT_HOST",
        "JIT_PORT",
        "JIT_DATABASE_URL",
        "JIT_WEBHOOK_SIGNATURE_HEADER",
        "JIT_WEBHOOK_HMAC_CHECKS",
        "JIT_REDIS_URL",
        "JIT_CACHE_CAPACITY",
        "JIT_CARD_CACHE_TTL",
        "JIT_USER_CACHE_TTL",
        "JIT_DECISION_BUDGET_MS",
        "JIT_LIMIT_ENFORCEMENT",
        "JIT_REMOTE_AUTHORITY_URL",
        "JIT_REMOTE_AUTHORITY_TIMEOUT_MS",
        "JIT_CLEARING_BUFFER_SIZE",
        "JIT_CLEARING_MAX_RETRIES",
        "JIT_CLEARING_RETRY_DELAY_MS",
        "JIT_USE_X_FORWARDED_FOR",
        "JIT_USE_FORWARDED",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
