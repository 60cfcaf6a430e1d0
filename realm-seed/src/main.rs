//! Operator CLI: compute a single realm digest, render a provisioning document
//! as realm properties, or inspect the diagnostic code table.

use std::env;
use std::io;
use std::process::ExitCode;

use realm_seed::config::{config_path, load_config};
use realm_seed::crypto::digest::digest;
use realm_seed::crypto::hex::canonicalize;
use realm_seed::offsets::{self, REGISTRY};
use realm_seed::realm::PropertiesWriter;

fn print_usage() {
    eprintln!("Commands:\n  digest <user> <realm> <password> [algorithm]\n  provision [config-path]\n  offsets [--check]");
}

fn init_tracing(level: Option<&str>) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run_digest(args: &[String]) -> ExitCode {
    if args.len() != 3 && args.len() != 4 {
        print_usage();
        return ExitCode::FAILURE;
    }
    let algorithm = args.get(3).map(String::as_str).unwrap_or("MD5");
    match digest(algorithm, &args[0], &args[1], &args[2]) {
        Ok(bytes) => {
            println!("{}", canonicalize(&bytes));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("digest failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_provision(args: &[String]) -> ExitCode {
    if args.len() > 1 {
        print_usage();
        return ExitCode::FAILURE;
    }
    let path = config_path(args.first().map(String::as_str));
    let config = match load_config(&path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config load failed ({}): {err}", path.display());
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.debug_level.as_deref());

    let mut writer = PropertiesWriter::new(io::stdout().lock());
    let report = match config.provision(&mut writer) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("provisioning aborted: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = writer.finish() {
        eprintln!("writing properties failed: {err}");
        return ExitCode::FAILURE;
    }

    for failure in &report.failures {
        eprintln!("user `{}` not provisioned: {}", failure.username, failure.error);
    }
    if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_offsets(args: &[String]) -> ExitCode {
    let check = match args {
        [] => false,
        [flag] if flag == "--check" => true,
        _ => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    for offset in REGISTRY {
        println!("{:<12} {:>6}..{:<6}", offset.module, offset.base, offset.end());
    }
    match offsets::next_base(REGISTRY) {
        Some(base) => println!("next free base: {base}"),
        None => println!("next free base: none, code space exhausted"),
    }

    if check {
        if let Err(err) = offsets::verify(REGISTRY) {
            eprintln!("collision: {err}");
            return ExitCode::FAILURE;
        }
        println!("no collisions");
    }
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return ExitCode::FAILURE;
    }

    match args[1].as_str() {
        "digest" => {
            init_tracing(None);
            run_digest(&args[2..])
        }
        "provision" => run_provision(&args[2..]),
        "offsets" => {
            init_tracing(None);
            run_offsets(&args[2..])
        }
        _ => {
            print_usage();
            ExitCode::FAILURE
        }
    }
}
