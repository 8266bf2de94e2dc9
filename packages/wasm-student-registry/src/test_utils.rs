//! In-memory chain and wallet doubles for testing
//!
//! `MockChain` behaves like a JSON-RPC node with the registry contract
//! deployed: it decodes real ABI calldata, keeps students in insertion
//! order and answers reverts the way geth does (code 3, revert bytes in
//! `data`). `MockWallet` wraps a chain as an EIP-1193 provider.

use crate::config::{NetworkConfig, SEPOLIA_CHAIN_ID};
use crate::contract::{
    getCompletedCoursesCall, getStudentByMSSVCall, getStudentsInRangeCall, getTotalStudentsCall,
    IStudentRegistry, IStudentRegistryCalls,
};
use crate::provider::{AccountsListener, JsonRpc, ListenerId, RpcError, Sleeper, WalletProvider};
use alloy_primitives::{Address, U256};
use alloy_sol_types::{SolCall, SolError, SolInterface};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::str::FromStr;

pub const ALICE: &str = "0x00000000000000000000000000000000000a11ce";
pub const BOB: &str = "0x0000000000000000000000000000000000000b0b";
pub const CONTRACT: &str = "0x000000000000000000000000000000000c0ffee1";

/// Sepolia config pointing at the mock contract
pub fn test_config() -> NetworkConfig {
    let mut config = NetworkConfig::sepolia(CONTRACT);
    config.poll_interval_ms = 1;
    config
}

#[derive(Debug, Clone)]
struct StoredStudent {
    name: String,
    birth_year: u64,
    class_label: String,
    exists: bool,
    courses: Vec<u64>,
}

/// A transaction accepted by `eth_sendTransaction`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTx {
    pub hash: String,
    pub from: String,
    pub function: String,
}

#[derive(Debug, Clone)]
struct PendingReceipt {
    remaining_polls: u32,
    success: bool,
}

#[derive(Default)]
struct ChainState {
    order: Vec<u64>,
    students: HashMap<u64, StoredStudent>,
    owner: Option<String>,
    pending_polls: u32,
    revert_next_inclusion: bool,
    receipts: HashMap<String, PendingReceipt>,
    sent: Vec<SentTx>,
    calls: Vec<String>,
    failing_details: HashSet<u64>,
    fail_range_queries: bool,
}

type Revert = Vec<u8>;

/// In-memory JSON-RPC node with the registry contract deployed
#[derive(Default)]
pub struct MockChain {
    state: RefCell<ChainState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an existing student directly (appended to the index order)
    pub fn insert(&self, id: u64, name: &str, birth_year: u64, class_label: &str) {
        let mut state = self.state.borrow_mut();
        if !state.students.contains_key(&id) {
            state.order.push(id);
        }
        state.students.insert(
            id,
            StoredStudent {
                name: name.to_string(),
                birth_year,
                class_label: class_label.to_string(),
                exists: true,
                courses: Vec::new(),
            },
        );
    }

    /// Mark a student as deleted; its index slot stays in the order
    pub fn remove(&self, id: u64) {
        if let Some(student) = self.state.borrow_mut().students.get_mut(&id) {
            student.exists = false;
        }
    }

    pub fn exists(&self, id: u64) -> bool {
        self.state
            .borrow()
            .students
            .get(&id)
            .is_some_and(|s| s.exists)
    }

    pub fn name_of(&self, id: u64) -> Option<String> {
        self.state.borrow().students.get(&id).map(|s| s.name.clone())
    }

    pub fn set_completed_courses(&self, id: u64, courses: Vec<u64>) {
        if let Some(student) = self.state.borrow_mut().students.get_mut(&id) {
            student.courses = courses;
        }
    }

    /// Restrict writes to `owner`
    pub fn set_owner(&self, owner: &str) {
        self.state.borrow_mut().owner = Some(owner.to_lowercase());
    }

    /// Number of `null` receipt responses before a new transaction is included
    pub fn set_pending_polls(&self, polls: u32) {
        self.state.borrow_mut().pending_polls = polls;
    }

    /// The next submitted transaction is included with status `0x0`
    pub fn revert_next_inclusion(&self) {
        self.state.borrow_mut().revert_next_inclusion = true;
    }

    /// `getStudentByMSSV(id)` fails at the transport level
    pub fn fail_detail(&self, id: u64) {
        self.state.borrow_mut().failing_details.insert(id);
    }

    /// `getStudentsInRange` fails at the transport level
    pub fn fail_range_queries(&self) {
        self.state.borrow_mut().fail_range_queries = true;
    }

    pub fn sent_transactions(&self) -> Vec<SentTx> {
        self.state.borrow().sent.clone()
    }

    /// How many `eth_call`s hit `function`
    pub fn call_count(&self, function: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|name| name.as_str() == function)
            .count()
    }

    /// Apply a signed transaction the way the wallet would broadcast it
    pub fn submit(&self, from: &str, data: &str) -> Result<String, RpcError> {
        let call = decode_call(data)?;
        let function = function_name(&call).to_string();
        let mut state = self.state.borrow_mut();

        let hash = format!("0x{:064x}", state.sent.len() + 1);
        // A reverted transaction is still mined but leaves the state untouched
        let success = !std::mem::take(&mut state.revert_next_inclusion);
        if success {
            let _ = execute(&mut state, Some(from), call, true);
        }
        let remaining_polls = state.pending_polls;
        state.receipts.insert(
            hash.clone(),
            PendingReceipt {
                remaining_polls,
                success,
            },
        );
        state.sent.push(SentTx {
            hash: hash.clone(),
            from: from.to_lowercase(),
            function,
        });
        Ok(hash)
    }

    fn eth_call(&self, params: &Value) -> Result<Value, RpcError> {
        let request = params
            .get(0)
            .ok_or_else(|| RpcError::new(-32602, "missing call object"))?;
        let data = request
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::new(-32602, "missing data"))?;
        let from = request.get("from").and_then(Value::as_str);
        let call = decode_call(data)?;

        let mut state = self.state.borrow_mut();
        state.calls.push(function_name(&call).to_string());
        if let IStudentRegistryCalls::getStudentByMSSV(c) = &call {
            if state.failing_details.contains(&c.id.to::<u64>()) {
                return Err(RpcError::transport("upstream request timed out"));
            }
        }
        if matches!(call, IStudentRegistryCalls::getStudentsInRange(_)) && state.fail_range_queries
        {
            return Err(RpcError::transport("upstream request timed out"));
        }

        match execute(&mut state, from, call, false) {
            Ok(output) => Ok(json!(format!("0x{}", hex::encode(output)))),
            Err(revert) => Err(RpcError::new(RpcError::EXECUTION_REVERTED, "execution reverted")
                .with_data(json!(format!("0x{}", hex::encode(revert))))),
        }
    }

    fn receipt(&self, params: &Value) -> Result<Value, RpcError> {
        let hash = params
            .get(0)
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::new(-32602, "missing hash"))?;
        let mut state = self.state.borrow_mut();
        let Some(pending) = state.receipts.get_mut(hash) else {
            return Ok(Value::Null);
        };
        if pending.remaining_polls > 0 {
            pending.remaining_polls -= 1;
            return Ok(Value::Null);
        }
        Ok(json!({
            "transactionHash": hash,
            "status": if pending.success { "0x1" } else { "0x0" },
            "blockNumber": "0x10",
            "gasUsed": "0x5208",
        }))
    }
}

#[async_trait(?Send)]
impl JsonRpc for MockChain {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "eth_chainId" => Ok(json!(format!("0x{:x}", SEPOLIA_CHAIN_ID))),
            "eth_call" => self.eth_call(&params),
            "eth_getTransactionReceipt" => self.receipt(&params),
            other => Err(RpcError::new(
                -32601,
                &format!("the method {} does not exist/is not available", other),
            )),
        }
    }
}

fn decode_call(data: &str) -> Result<IStudentRegistryCalls, RpcError> {
    let bytes = data
        .strip_prefix("0x")
        .and_then(|digits| hex::decode(digits).ok())
        .ok_or_else(|| RpcError::new(-32602, "invalid calldata"))?;
    IStudentRegistryCalls::abi_decode(&bytes, true)
        .map_err(|_| RpcError::new(RpcError::EXECUTION_REVERTED, "execution reverted"))
}

fn function_name(call: &IStudentRegistryCalls) -> &'static str {
    match call {
        IStudentRegistryCalls::addStudent(_) => "addStudent",
        IStudentRegistryCalls::updateStudentName(_) => "updateStudentName",
        IStudentRegistryCalls::deleteStudent(_) => "deleteStudent",
        IStudentRegistryCalls::getStudentByMSSV(_) => "getStudentByMSSV",
        IStudentRegistryCalls::getStudentsInRange(_) => "getStudentsInRange",
        IStudentRegistryCalls::getTotalStudents(_) => "getTotalStudents",
        IStudentRegistryCalls::getCompletedCourses(_) => "getCompletedCourses",
    }
}

fn check_owner(state: &ChainState, from: Option<&str>) -> Result<(), Revert> {
    let Some(owner) = state.owner.as_deref() else {
        return Ok(());
    };
    let caller = from.unwrap_or_default().to_lowercase();
    if caller == owner {
        return Ok(());
    }
    let caller = Address::from_str(&caller).unwrap_or(Address::ZERO);
    Err(IStudentRegistry::NotOwner { caller }.abi_encode())
}

fn existing(state: &ChainState, id: U256) -> Result<u64, Revert> {
    let key = id.to::<u64>();
    if state.students.get(&key).is_some_and(|s| s.exists) {
        Ok(key)
    } else {
        Err(IStudentRegistry::StudentNotFound { id }.abi_encode())
    }
}

/// Run `call` against the state; `commit` applies writes
fn execute(
    state: &mut ChainState,
    from: Option<&str>,
    call: IStudentRegistryCalls,
    commit: bool,
) -> Result<Vec<u8>, Revert> {
    match call {
        IStudentRegistryCalls::addStudent(c) => {
            check_owner(state, from)?;
            let key = c.id.to::<u64>();
            if state.students.get(&key).is_some_and(|s| s.exists) {
                return Err(IStudentRegistry::StudentAlreadyExists { id: c.id }.abi_encode());
            }
            if commit {
                if !state.students.contains_key(&key) {
                    state.order.push(key);
                }
                state.students.insert(
                    key,
                    StoredStudent {
                        name: c.name,
                        birth_year: c.birthYear.to::<u64>(),
                        class_label: c.classLabel,
                        exists: true,
                        courses: Vec::new(),
                    },
                );
            }
            Ok(Vec::new())
        }
        IStudentRegistryCalls::updateStudentName(c) => {
            check_owner(state, from)?;
            let key = existing(state, c.id)?;
            if commit {
                if let Some(student) = state.students.get_mut(&key) {
                    student.name = c.newName;
                }
            }
            Ok(Vec::new())
        }
        IStudentRegistryCalls::deleteStudent(c) => {
            check_owner(state, from)?;
            let key = existing(state, c.id)?;
            if commit {
                if let Some(student) = state.students.get_mut(&key) {
                    student.exists = false;
                }
            }
            Ok(Vec::new())
        }
        IStudentRegistryCalls::getStudentByMSSV(c) => {
            let key = c.id.to::<u64>();
            let ret = match state.students.get(&key) {
                Some(s) => (
                    c.id,
                    s.name.clone(),
                    U256::from(s.birth_year),
                    s.class_label.clone(),
                    s.exists,
                ),
                None => (U256::ZERO, String::new(), U256::ZERO, String::new(), false),
            };
            Ok(getStudentByMSSVCall::abi_encode_returns(&ret))
        }
        IStudentRegistryCalls::getStudentsInRange(c) => {
            let (start, end) = (c.start.to::<usize>(), c.end.to::<usize>());
            if start > end || end > state.order.len() {
                return Err(IStudentRegistry::InvalidRange {
                    start: c.start,
                    end: c.end,
                }
                .abi_encode());
            }
            let ids: Vec<U256> = state.order[start..end]
                .iter()
                .map(|id| U256::from(*id))
                .collect();
            Ok(getStudentsInRangeCall::abi_encode_returns(&(ids,)))
        }
        IStudentRegistryCalls::getTotalStudents(_) => {
            let total = state.students.values().filter(|s| s.exists).count();
            Ok(getTotalStudentsCall::abi_encode_returns(&(U256::from(
                total,
            ),)))
        }
        IStudentRegistryCalls::getCompletedCourses(c) => {
            let key = existing(state, c.id)?;
            let courses: Vec<U256> = state
                .students
                .get(&key)
                .map(|s| s.courses.iter().map(|c| U256::from(*c)).collect())
                .unwrap_or_default();
            Ok(getCompletedCoursesCall::abi_encode_returns(&(courses,)))
        }
    }
}

/// EIP-1193 wallet double backed by a [`MockChain`]
pub struct MockWallet {
    chain: Rc<MockChain>,
    accounts: RefCell<Vec<String>>,
    chain_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, AccountsListener)>>,
    next_listener: Cell<u64>,
    request_accounts_error: RefCell<Option<RpcError>>,
    send_error: RefCell<Option<RpcError>>,
}

impl MockWallet {
    pub fn new(accounts: Vec<String>) -> Self {
        Self::with_chain(Rc::new(MockChain::new()), accounts)
    }

    pub fn with_chain(chain: Rc<MockChain>, accounts: Vec<String>) -> Self {
        Self {
            chain,
            accounts: RefCell::new(accounts),
            chain_id: Cell::new(SEPOLIA_CHAIN_ID),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
            request_accounts_error: RefCell::new(None),
            send_error: RefCell::new(None),
        }
    }

    pub fn chain(&self) -> Rc<MockChain> {
        self.chain.clone()
    }

    /// Switch the network the wallet reports
    pub fn set_chain_id(&self, chain_id: u64) {
        self.chain_id.set(chain_id);
    }

    /// Fail the next `eth_requestAccounts`
    pub fn fail_request_accounts(&self, err: RpcError) {
        *self.request_accounts_error.borrow_mut() = Some(err);
    }

    /// Fail the next `eth_sendTransaction`
    pub fn fail_next_send(&self, err: RpcError) {
        *self.send_error.borrow_mut() = Some(err);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Switch accounts and notify listeners
    pub fn emit_accounts_changed(&self, accounts: Vec<String>) {
        *self.accounts.borrow_mut() = accounts.clone();
        let listeners: Vec<AccountsListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(accounts.clone());
        }
    }

    fn send_transaction(&self, params: &Value) -> Result<Value, RpcError> {
        if let Some(err) = self.send_error.borrow_mut().take() {
            return Err(err);
        }
        let tx = params
            .get(0)
            .ok_or_else(|| RpcError::new(-32602, "missing transaction"))?;
        let from = tx
            .get("from")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::new(-32602, "missing from"))?;
        let data = tx
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::new(-32602, "missing data"))?;
        if !self
            .accounts
            .borrow()
            .iter()
            .any(|a| a.eq_ignore_ascii_case(from))
        {
            return Err(RpcError::new(
                4100,
                "The requested account has not been authorized by the user.",
            ));
        }
        self.chain.submit(from, data).map(|hash| json!(hash))
    }
}

#[async_trait(?Send)]
impl JsonRpc for MockWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "eth_requestAccounts" => {
                if let Some(err) = self.request_accounts_error.borrow_mut().take() {
                    return Err(err);
                }
                Ok(json!(self.accounts.borrow().clone()))
            }
            "eth_accounts" => Ok(json!(self.accounts.borrow().clone())),
            "eth_chainId" => Ok(json!(format!("0x{:x}", self.chain_id.get()))),
            "eth_sendTransaction" => self.send_transaction(&params),
            other => self.chain.request(other, params).await,
        }
    }
}

impl WalletProvider for MockWallet {
    fn add_accounts_listener(&self, listener: AccountsListener) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn remove_accounts_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(existing, _)| *existing != id);
    }
}

/// Sleeper that returns immediately and counts how often it was asked to wait
#[derive(Default)]
pub struct InstantSleeper {
    sleeps: Cell<u32>,
    on_first_sleep: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl InstantSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` during the first sleep, i.e. while a transaction is in flight
    pub fn on_first_sleep(&self, hook: impl FnOnce() + 'static) {
        *self.on_first_sleep.borrow_mut() = Some(Box::new(hook));
    }

    pub fn count(&self) -> u32 {
        self.sleeps.get()
    }
}

#[async_trait(?Send)]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, _millis: u32) {
        self.sleeps.set(self.sleeps.get() + 1);
        let hook = self.on_first_sleep.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
    }
}
