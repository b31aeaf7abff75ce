//! Executor tests against in-memory node and signer fakes.

use {
    crate::{
        batch_payer::{BatchPayer, BatchPayerConfig, ExitReason},
        constants::{required_fee, DEFAULT_CONTRACT_FEE_CEILING, TX_FEE_ALLOCATED},
    },
    payout_model::{EntryType, PaymentStatus, RewardLog},
    payout_rpc::{
        wire::{
            ForgeRequest, HeadBlock, HeadHeader, HeadMetadata, OperationResult,
            PreapplyOperation, RunOperationRequest, RunOperationResponse, SimulatedContent,
            SimulationMetadata,
        },
        NodeClient, Result as RpcResult, RpcError, SignerClient,
    },
    std::{
        sync::{
            atomic::{AtomicU32, Ordering},
            Arc, Mutex,
        },
        time::Duration,
    },
};

const FORGED: &str = "deadbeef00112233445566778899aabbccddeeff";
const OP_HASH: &str = "onvXXc1h4mYZo6JBarLg6ritTJsEE8drnpTECrrX4Dn1aqQY35Q";

#[derive(Default)]
struct FakeNode {
    balance: u64,
    /// Whether the confirmation poll finds the injected hash.
    confirm: bool,
    /// run_operation attempts that fail with a transport-style error
    /// before succeeding.
    failing_runs: AtomicU32,
    /// Simulated contract pricing, `None` rejects the simulation.
    contract_pricing: Option<(u64, u64)>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeNode {
    fn new(balance: u64) -> Self {
        Self {
            balance,
            confirm: true,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn head_block() -> HeadBlock {
        HeadBlock {
            hash: "BLockHash111".to_string(),
            chain_id: "NetXdQprcVkpaWU".to_string(),
            header: HeadHeader {
                level: 3_000,
                timestamp: "2024-01-01T00:00:00Z".to_string(),
            },
            metadata: HeadMetadata {
                protocol: "PtTestProto".to_string(),
            },
        }
    }

    fn applied(milligas: &str, storage: Option<&str>) -> SimulatedContent {
        SimulatedContent {
            metadata: SimulationMetadata {
                operation_result: Some(OperationResult {
                    status: "applied".to_string(),
                    consumed_milligas: Some(milligas.to_string()),
                    paid_storage_size_diff: storage.map(str::to_string),
                    errors: Vec::new(),
                }),
                internal_operation_results: Vec::new(),
            },
        }
    }
}

impl NodeClient for FakeNode {
    fn head(&self) -> RpcResult<HeadBlock> {
        self.record("head");
        Ok(Self::head_block())
    }

    fn payment_head(&self) -> RpcResult<HeadBlock> {
        self.record("payment_head");
        Ok(Self::head_block())
    }

    fn counter(&self, _address: &str) -> RpcResult<u64> {
        self.record("counter");
        Ok(100)
    }

    fn balance(&self, _address: &str) -> RpcResult<u64> {
        self.record("balance");
        Ok(self.balance)
    }

    fn run_operation(&self, request: &RunOperationRequest) -> RpcResult<RunOperationResponse> {
        self.record("run_operation");
        if self.failing_runs.load(Ordering::SeqCst) > 0 {
            self.failing_runs.fetch_sub(1, Ordering::SeqCst);
            return Err(RpcError::Status {
                status: 503,
                path: "run_operation".to_string(),
                body: "node busy".to_string(),
            });
        }
        let body = serde_json::to_value(request).unwrap();
        let op_count = body["operation"]["contents"].as_array().unwrap().len();
        // Single-operation probes are contract simulations.
        if op_count == 1 && body["operation"]["contents"][0]["destination"]
            .as_str()
            .unwrap()
            .starts_with("KT1")
        {
            return match self.contract_pricing {
                Some((milligas, storage)) => Ok(RunOperationResponse {
                    contents: vec![Self::applied(
                        &milligas.to_string(),
                        Some(storage.to_string()).as_deref(),
                    )],
                }),
                None => Ok(RunOperationResponse {
                    contents: vec![SimulatedContent {
                        metadata: SimulationMetadata {
                            operation_result: Some(OperationResult {
                                status: "failed".to_string(),
                                consumed_milligas: None,
                                paid_storage_size_diff: None,
                                errors: Vec::new(),
                            }),
                            internal_operation_results: Vec::new(),
                        },
                    }],
                }),
            };
        }
        Ok(RunOperationResponse {
            contents: (0..op_count)
                .map(|_| Self::applied("2100000", None))
                .collect(),
        })
    }

    fn forge(&self, _request: &ForgeRequest) -> RpcResult<String> {
        self.record("forge");
        Ok(FORGED.to_string())
    }

    fn preapply(&self, _operations: &[PreapplyOperation]) -> RpcResult<serde_json::Value> {
        self.record("preapply");
        Ok(serde_json::json!([]))
    }

    fn inject(&self, _signed_bytes_hex: &str) -> RpcResult<String> {
        self.record("inject");
        Ok(OP_HASH.to_string())
    }

    fn operation_hashes(&self, _level: u64) -> RpcResult<Vec<Vec<String>>> {
        self.record("operation_hashes");
        if self.confirm {
            Ok(vec![vec![OP_HASH.to_string()]])
        } else {
            Ok(vec![vec!["other_hash".to_string()]])
        }
    }
}

struct FakeSigner;

impl SignerClient for FakeSigner {
    fn sign(&self, _op_bytes_hex: &str) -> RpcResult<String> {
        // A structurally valid edsig over 64 zero bytes.
        let mut payload = vec![0x09, 0xf5, 0xcd, 0x86, 0x12];
        payload.extend([0u8; 64]);
        Ok(bs58::encode(payload).with_check().into_string())
    }
}

fn config(delegator_pays: bool) -> BatchPayerConfig {
    BatchPayerConfig {
        source: "tz1payout".to_string(),
        delegator_pays_transfer_fee: delegator_pays,
        delegator_pays_reactivation_fee: delegator_pays,
        block_delay: Duration::ZERO,
        contract_fee_ceiling: DEFAULT_CONTRACT_FEE_CEILING,
        dry_run: false,
    }
}

fn payer(node: Arc<FakeNode>, delegator_pays: bool) -> BatchPayer {
    BatchPayer::new(node, Arc::new(FakeSigner), config(delegator_pays))
}

fn payable(address: &str, amount: u64) -> RewardLog {
    let mut entry = RewardLog::new(address, EntryType::Delegator, 1_000, 1_000);
    entry.amount = amount;
    entry.payable = true;
    entry
}

#[test]
fn test_below_threshold_entry_done_without_network_calls() {
    let node = Arc::new(FakeNode::new(10_000_000));
    // Threshold is 1 + 298 when the delegator pays the transfer fee.
    let result = payer(Arc::clone(&node), true)
        .pay(vec![payable("tz1tiny", TX_FEE_ALLOCATED)])
        .unwrap();

    assert_eq!(result.logs[0].paid, PaymentStatus::Done);
    assert_eq!(result.attempts, 0);
    assert!(node.calls().is_empty(), "no network calls expected");
}

#[test]
fn test_insufficient_funds_fails_batch_before_submission() {
    let node = Arc::new(FakeNode::new(100));
    let result = payer(Arc::clone(&node), false)
        .pay(vec![payable("tz1rich", 5_000_000)])
        .unwrap();

    assert_eq!(result.exit, Some(ExitReason::InsufficientFunds));
    assert_eq!(result.future_payable_cycles, Some(-1));
    assert!(result.logs[0].paid.is_fail());
    assert!(result.logs[0].skip_reason.contains("Insufficient funds"));
    assert_eq!(node.calls(), vec!["balance"]);
}

#[test]
fn test_happy_path_paid_with_hash() {
    let node = Arc::new(FakeNode::new(1_000_000_000));
    let result = payer(Arc::clone(&node), false)
        .pay(vec![payable("tz1alice", 2_000_000)])
        .unwrap();

    let entry = &result.logs[0];
    assert_eq!(entry.paid, PaymentStatus::Paid);
    assert_eq!(entry.hash.as_deref(), Some(OP_HASH));
    assert_eq!(result.attempts, 1);
    // Delegate pays: the fee lands on the delegate side, topped up to
    // the batch minimum.
    let size = 64 + (FORGED.len() as u64) / 2;
    assert_eq!(entry.delegate_transaction_fee, required_fee(3_400, size));
    assert_eq!(entry.delegator_transaction_fee, 0);

    let calls = node.calls();
    assert!(calls.contains(&"run_operation"));
    assert!(calls.contains(&"inject"));
    // Balance projection for a funded address.
    assert!(result.future_payable_cycles.unwrap() > 0);
}

#[test]
fn test_transient_failure_retried_then_paid() {
    let node = Arc::new(FakeNode::new(1_000_000_000));
    node.failing_runs.store(1, Ordering::SeqCst);

    let result = payer(Arc::clone(&node), false)
        .pay(vec![payable("tz1bob", 3_000_000)])
        .unwrap();

    assert_eq!(result.logs[0].paid, PaymentStatus::Paid);
    assert_eq!(result.attempts, 2);
    // The counter is re-read on the second attempt.
    let counters = node.calls().iter().filter(|c| **c == "counter").count();
    assert_eq!(counters, 2);
}

#[test]
fn test_exhausted_confirmation_window_is_injected() {
    let mut node = FakeNode::new(1_000_000_000);
    node.confirm = false;
    let node = Arc::new(node);

    let result = payer(Arc::clone(&node), false)
        .pay(vec![payable("tz1carol", 2_000_000)])
        .unwrap();

    let entry = &result.logs[0];
    assert_eq!(entry.paid, PaymentStatus::Injected);
    assert_eq!(entry.hash.as_deref(), Some(OP_HASH));
    assert!(entry.skip_reason.contains("confirmation window exhausted"));
    // Injected is terminal for this run: exactly one injection.
    let injects = node.calls().iter().filter(|c| **c == "inject").count();
    assert_eq!(injects, 1);
}

#[test]
fn test_contract_over_fee_ceiling_is_avoided() {
    let mut node = FakeNode::new(1_000_000_000);
    // 600 storage bytes burn 150_000 mutez, above the 100_000 ceiling.
    node.contract_pricing = Some((2_000_000, 600));
    let node = Arc::new(node);

    let mut oven = payable("tz1origin", 2_000_000);
    oven.payment_address = "KT1LiquidatedOven111111111111111111".to_string();

    let result = payer(Arc::clone(&node), false)
        .pay(vec![oven, payable("tz1dave", 2_000_000)])
        .unwrap();

    let by_addr = |a: &str| result.logs.iter().find(|e| e.address == a).unwrap();
    let avoided = by_addr("tz1origin");
    assert_eq!(avoided.paid, PaymentStatus::Avoided);
    assert!(!avoided.skip_reason.is_empty());
    // The plain transfer still goes through in its own batch.
    assert_eq!(by_addr("tz1dave").paid, PaymentStatus::Paid);
}

#[test]
fn test_rejected_contract_simulation_is_avoided() {
    let node = Arc::new(FakeNode::new(1_000_000_000));

    let mut oven = payable("tz1origin", 2_000_000);
    oven.payment_address = "KT1NoDefaultEntrypoint1111111111111".to_string();

    let result = payer(Arc::clone(&node), false).pay(vec![oven]).unwrap();

    assert_eq!(result.logs[0].paid, PaymentStatus::Avoided);
    assert!(result.logs[0].skip_reason.contains("Simulation rejected"));
    assert!(!node.calls().contains(&"inject"));
}

#[test]
fn test_processed_entries_pass_through_untouched() {
    let node = Arc::new(FakeNode::new(1_000_000_000));
    let mut already = payable("tz1done", 2_000_000);
    already.paid = PaymentStatus::Paid;
    already.hash = Some("oldhash".to_string());

    let result = payer(Arc::clone(&node), false).pay(vec![already]).unwrap();

    assert_eq!(result.logs[0].hash.as_deref(), Some("oldhash"));
    assert!(node.calls().is_empty());
}

#[test]
fn test_dry_run_never_injects() {
    let node = Arc::new(FakeNode::new(1_000_000_000));
    let mut cfg = config(false);
    cfg.dry_run = true;
    let payer = BatchPayer::new(Arc::clone(&node) as Arc<dyn NodeClient>, Arc::new(FakeSigner), cfg);

    let result = payer.pay(vec![payable("tz1erin", 2_000_000)]).unwrap();

    assert_eq!(result.logs[0].paid, PaymentStatus::Done);
    let calls = node.calls();
    assert!(calls.contains(&"preapply"));
    assert!(!calls.contains(&"inject"));
}
