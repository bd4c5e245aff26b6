// src/lib.rs

pub mod cli;
pub mod compile;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod proxy;
pub mod routing;
pub mod supervisor;
pub mod toolchain;
pub mod types;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ConfigFile};
use crate::proxy::resolve_proxy_target;
use crate::supervisor::{Supervisor, SupervisorOptions};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (the only failure that ends the process)
/// - the supervisor (compile half + dev proxy)
/// - Ctrl-C handling and the bounded shutdown
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {:?}", config_path))?;

    if args.dry_run {
        print_dry_run(&cfg, &args);
        return Ok(());
    }

    let options = SupervisorOptions {
        strategy: args.strategy,
        no_dev_server: args.no_dev_server,
    };
    let supervisor = Supervisor::start(cfg, options).await;

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("failed to listen for Ctrl+C: {e}");
    }
    info!("shutdown requested");

    supervisor.shutdown().await;
    Ok(())
}

/// Print the resolved setup without starting anything.
fn print_dry_run(cfg: &ConfigFile, args: &CliArgs) {
    let strategy = args.strategy.unwrap_or(cfg.supervisor.strategy);

    println!("devreload dry-run");
    println!("  project_root = {:?}", cfg.project_root());
    println!("  strategy = {:?}", strategy);
    println!("  quiet_period = {:?}", cfg.supervisor.quiet_period);
    println!("  excluded_dir = {}", cfg.supervisor.excluded_dir);
    println!();

    println!("compiler:");
    if cfg.compiler.enabled {
        println!("  program: {}", cfg.compiler.program);
        println!("  sources: {:?} ({})", cfg.source_root(), cfg.compiler.source_glob);
        println!("  outputs: {:?} (.{})", cfg.output_root(), cfg.compiler.output_extension);
    } else {
        println!("  disabled");
    }
    println!();

    println!("dev server:");
    if cfg.dev_server.enabled && !args.no_dev_server {
        println!("  command: {} {}", cfg.dev_server.program, cfg.dev_server.args.join(" "));
        println!("  working_dir: {:?}", cfg.dev_server_dir());
        match resolve_proxy_target(cfg.tree(), &cfg.dev_server.address_key) {
            Ok(target) => println!("  address: {} ({})", target, target.url()),
            Err(e) => println!("  address: unresolved ({e})"),
        }
    } else {
        println!("  disabled");
    }
    println!();

    println!("routing:");
    println!("  static_root: {:?}", cfg.static_root());
    println!("  reserved_prefix: {}", cfg.routing.reserved_prefix);

    debug!("dry-run complete (nothing started)");
}
