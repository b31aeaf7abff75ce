//! Thread lifecycle: wires the producer, consumer and retry sweep to
//! the bounded queue and turns the first fatal condition into the
//! process exit code.
//!
//! ```text
//!             ┌──────────────┐   bounded    ┌──────────────┐
//!             │   producer   │──  queue  ──▶│   consumer   │──▶ exit code
//!             └──────────────┘      ▲       └──────┬───────┘
//!             ┌──────────────┐      │              │ wake on success
//!             │ retry sweep  │──────┘◀─────────────┘
//!             └──────────────┘
//! ```

use {
    crate::{
        config::{DaemonConfig, RunMode},
        consumer::PaymentConsumer,
        exit::{EXIT_CONFIG, EXIT_SUCCESS},
        notify::NotificationSink,
        producer::PaymentProducer,
        retry::RetryProducer,
    },
    crossbeam_channel::bounded,
    log::{error, info, warn},
    payout_calc::PhasedCalculator,
    payout_model::QueueItem,
    payout_payer::{BatchPayer, BatchPayerConfig},
    payout_rpc::{HttpNodeClient, HttpSignerClient, RpcRewardProvider},
    payout_store::{DirMarkerStore, ReportPaths},
    std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread,
        time::Duration,
    },
};

/// Cycles queue up faster than they pay out; beyond this the producer
/// blocks.
const QUEUE_CAPACITY: usize = 50;
const NODE_TIMEOUT: Duration = Duration::from_secs(30);
const SIGNER_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Supervisor {
    config: DaemonConfig,
}

impl Supervisor {
    pub fn new(config: DaemonConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion and return the process exit code.
    pub fn run(&self, sink: Arc<dyn NotificationSink>) -> i32 {
        let config = &self.config;

        let paths = ReportPaths::new(&config.payments_root, &config.calculations_root);
        if let Err(err) = paths.ensure_layout() {
            error!("cannot create report directories: {err}");
            return EXIT_CONFIG;
        }
        let markers = match DirMarkerStore::new(config.payments_root.join("markers")) {
            Ok(markers) => markers,
            Err(err) => {
                error!("cannot create marker store: {err}");
                return EXIT_CONFIG;
            }
        };

        let node = match HttpNodeClient::new(&config.node_url, NODE_TIMEOUT) {
            Ok(node) => Arc::new(node),
            Err(err) => {
                error!("cannot build node client for {}: {err}", config.node_url);
                return EXIT_CONFIG;
            }
        };
        let signer = match HttpSignerClient::new(
            &config.signer_url,
            &config.payment_address,
            SIGNER_TIMEOUT,
        ) {
            Ok(signer) => Arc::new(signer),
            Err(err) => {
                error!("cannot build signer client for {}: {err}", config.signer_url);
                return EXIT_CONFIG;
            }
        };
        let provider = Arc::new(RpcRewardProvider::new(
            node.clone(),
            &config.baking_address,
            config.network.blocks_per_cycle,
            config.network.frozen_deposit_cycles,
        ));

        let calculator = match PhasedCalculator::new(
            config.fee_calculator(),
            config.rules(),
            config.founders_map.clone(),
            config.owners_map.clone(),
            config.min_delegation,
            config.reactivate_zeroed,
        ) {
            Ok(calculator) => calculator,
            Err(err) => {
                error!("allocator rejected the configuration: {err}");
                return EXIT_CONFIG;
            }
        };

        let payer = BatchPayer::new(
            node.clone(),
            signer,
            BatchPayerConfig {
                source: config.payment_address.clone(),
                delegator_pays_transfer_fee: config.delegator_pays_transfer_fee,
                delegator_pays_reactivation_fee: config.delegator_pays_reactivation_fee,
                block_delay: config.block_delay(),
                contract_fee_ceiling: config.contract_fee_ceiling,
                dry_run: config.dry_run,
            },
        );
        if config.dry_run {
            warn!("dry-run mode: operations are validated but never injected");
        }

        let (sender, receiver) = bounded::<QueueItem>(QUEUE_CAPACITY);
        let (wake_tx, wake_rx) = bounded::<()>(1);
        let shutdown = Arc::new(AtomicBool::new(false));

        let consumer = PaymentConsumer::new(
            receiver,
            Box::new(payer),
            paths.clone(),
            markers,
            config.redirects.clone(),
            config.reactivate_zeroed,
            sink,
            wake_tx,
        );

        let producer = PaymentProducer::new(
            config,
            node,
            provider.clone(),
            calculator,
            paths.clone(),
            sender.clone(),
            shutdown.clone(),
        );

        info!("starting payout pipeline in {:?} mode", config.run_mode);
        let run_mode = config.run_mode;
        let producer_handle = spawn_named("producer", {
            // Non-resident modes sweep the failure reports once before
            // producing; the resident retry thread covers Forever mode.
            let startup_retry = (run_mode != RunMode::Forever).then(|| {
                RetryProducer::new(
                    paths.clone(),
                    provider.clone(),
                    sender.clone(),
                    config.initial_cycle,
                    config.retry_injected,
                )
            });
            let sender = sender.clone();
            move || {
                if let Some(retry) = startup_retry {
                    retry.scan_once();
                }
                if run_mode == RunMode::RetryFailed {
                    let _ = sender.send(QueueItem::Exit { code: EXIT_SUCCESS });
                } else {
                    producer.run();
                }
            }
        });
        let retry_handle = if run_mode == RunMode::Forever {
            let retry = RetryProducer::new(
                paths,
                provider,
                sender,
                config.initial_cycle,
                config.retry_injected,
            );
            let shutdown = shutdown.clone();
            Some(spawn_named("retry", move || retry.run(wake_rx, &shutdown)))
        } else {
            None
        };

        let consumer_handle = spawn_named("consumer", move || consumer.run());
        let code = match consumer_handle.join() {
            Ok(code) => code,
            Err(_) => {
                error!("consumer thread panicked");
                1
            }
        };

        shutdown.store(true, Ordering::Relaxed);
        let _ = producer_handle.join();
        if let Some(handle) = retry_handle {
            let _ = handle.join();
        }
        info!("payout pipeline stopped, exit code {code}");
        code
    }
}

fn spawn_named<T: Send + 'static>(
    name: &str,
    body: impl FnOnce() -> T + Send + 'static,
) -> thread::JoinHandle<T> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .expect("thread spawn")
}
