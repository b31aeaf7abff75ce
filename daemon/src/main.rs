use {
    clap::{App, Arg},
    log::{error, info},
    payout_daemon::{exit::EXIT_CONFIG, DaemonConfig, LogNotificationSink, Supervisor},
    std::{path::PathBuf, process, sync::Arc},
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = App::new("payout-daemon")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Proportional staking reward distribution daemon")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .takes_value(true)
                .required(true)
                .help("YAML configuration file"),
        )
        .arg(
            Arg::with_name("dry-run")
                .long("dry-run")
                .help("Simulate and validate payments but never inject them"),
        )
        .arg(
            Arg::with_name("retry-injected")
                .long("retry-injected")
                .help("Also re-pay operations whose confirmation was never observed"),
        )
        .get_matches();

    let path = PathBuf::from(matches.value_of("config").unwrap());
    let mut config = match DaemonConfig::load(&path) {
        Ok(config) => config,
        Err(err) => {
            error!("cannot load {}: {err}", path.display());
            process::exit(EXIT_CONFIG);
        }
    };
    if matches.is_present("dry-run") {
        config.dry_run = true;
    }
    if matches.is_present("retry-injected") {
        config.retry_injected = true;
    }
    if let Err(err) = config.validate() {
        error!("invalid configuration: {err}");
        process::exit(EXIT_CONFIG);
    }

    info!(
        "paying for baker {} from {}",
        config.baking_address, config.payment_address
    );
    let code = Supervisor::new(config).run(Arc::new(LogNotificationSink));
    process::exit(code);
}
