//! REST API handlers for vault operations

use crate::api::websocket::WsBroadcaster;
use crate::crypto::Address;
use crate::multisig::{
    authorize, Action, AuthError, Authorization, CallReceipt, EventRecord, MultisigError,
    MultisigWallet, TxStatus, Vault,
};
use crate::storage::Storage;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub vault: Arc<RwLock<Vault>>,
    pub storage: Arc<Storage>,
    pub ws_broadcaster: Arc<WsBroadcaster>,
}

impl ApiState {
    pub fn new(vault: Vault, storage: Storage) -> Self {
        Self {
            vault: Arc::new(RwLock::new(vault)),
            storage: Arc::new(storage),
            ws_broadcaster: Arc::new(WsBroadcaster::new()),
        }
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct WalletInfo {
    pub address: Address,
    pub label: Option<String>,
    pub owners: Vec<Address>,
    pub quorum: usize,
    pub description: String,
    pub balance: u64,
    pub transaction_count: usize,
    pub sequence: u64,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct OwnerResponse {
    pub address: Address,
    pub is_owner: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct TransactionResponse {
    pub id: u64,
    pub to: Address,
    pub value: u64,
    pub data: String,
    pub status: TxStatus,
    pub approvals: usize,
    pub quorum: usize,
    pub approved_by: Vec<Address>,
    pub submitted_by: Address,
    pub submitted_at: String,
}

impl TransactionResponse {
    fn new(wallet: &MultisigWallet, tx_id: u64) -> Result<Self, MultisigError> {
        let tx = wallet.transaction(tx_id)?;

        Ok(Self {
            id: tx_id,
            to: tx.to(),
            value: tx.value(),
            data: hex::encode(tx.data()),
            status: wallet.status(tx_id)?,
            approvals: wallet.approvals_count(tx_id),
            quorum: wallet.quorum(),
            approved_by: wallet.approvers(tx_id),
            submitted_by: tx.submitted_by(),
            submitted_at: tx.submitted_at().to_rfc3339(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    pub tx_id: u64,
    pub owner: Address,
    pub approved: bool,
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub tx_id: u64,
    pub returned: String,
    pub balance: u64,
}

#[derive(Debug, Serialize)]
pub struct DepositResponse {
    pub from: Address,
    pub amount: u64,
    pub balance: u64,
}

#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub accounts: BTreeMap<Address, u64>,
    pub receipts: Vec<CallReceipt>,
    pub rejecting: Vec<Address>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub to: Address,
    pub value: u64,
    #[serde(default, with = "hex::serde")]
    pub data: Vec<u8>,
    #[serde(flatten)]
    pub auth: Authorization,
}

#[derive(Deserialize)]
pub struct DepositRequest {
    pub from: Address,
    pub amount: u64,
}

#[derive(Deserialize)]
pub struct EventsQuery {
    pub since: Option<u64>,
}

// ============================================================================
// Error mapping
// ============================================================================

fn api_error(status: StatusCode, error: String) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError { error }))
}

fn multisig_error(e: MultisigError) -> (StatusCode, Json<ApiError>) {
    let status = match &e {
        MultisigError::NotOwner(_) => StatusCode::FORBIDDEN,
        MultisigError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
        MultisigError::ExecutionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::BAD_REQUEST,
    };
    api_error(status, e.to_string())
}

fn auth_error(e: AuthError) -> (StatusCode, Json<ApiError>) {
    api_error(StatusCode::UNAUTHORIZED, format!("Authorization failed: {}", e))
}

/// Apply `mutation` to a copy of the vault and persist it
///
/// The copy replaces `vault` and its new events are broadcast only once the
/// save succeeded, so a failed save leaves memory, disk and subscribers as
/// they were.
fn commit<T>(
    state: &ApiState,
    vault: &mut Vault,
    mutation: impl FnOnce(&mut Vault) -> Result<T, MultisigError>,
) -> Result<T, (StatusCode, Json<ApiError>)> {
    let from = vault.wallet.sequence();
    let mut staged = vault.clone();
    let output = mutation(&mut staged).map_err(multisig_error)?;

    state.storage.save(&staged).map_err(|e| {
        log::error!("Failed to save vault, change discarded: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to save vault: {}", e),
        )
    })?;

    *vault = staged;
    state
        .ws_broadcaster
        .broadcast_records(vault.wallet.events_since(from));
    Ok(output)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Health check
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /api/wallet - Wallet summary
pub async fn get_wallet(State(state): State<ApiState>) -> Json<WalletInfo> {
    let vault = state.vault.read().await;
    let wallet = &vault.wallet;

    Json(WalletInfo {
        address: wallet.address(),
        label: wallet.label().map(str::to_string),
        owners: wallet.owners().to_vec(),
        quorum: wallet.quorum(),
        description: wallet.description(),
        balance: wallet.balance(),
        transaction_count: wallet.transaction_count(),
        sequence: wallet.sequence(),
        created_at: wallet.created_at().to_rfc3339(),
    })
}

/// GET /api/owners/{address} - Owner membership
pub async fn get_owner(
    State(state): State<ApiState>,
    Path(address): Path<Address>,
) -> Json<OwnerResponse> {
    let vault = state.vault.read().await;
    Json(OwnerResponse {
        address,
        is_owner: vault.wallet.is_owner(&address),
    })
}

/// GET /api/transactions - List all transactions
pub async fn list_transactions(State(state): State<ApiState>) -> Json<Vec<TransactionResponse>> {
    let vault = state.vault.read().await;
    let txs = vault
        .wallet
        .transactions()
        .filter_map(|tx| TransactionResponse::new(&vault.wallet, tx.id()).ok())
        .collect();

    Json(txs)
}

/// GET /api/transactions/{id} - Get transaction
pub async fn get_transaction(
    State(state): State<ApiState>,
    Path(tx_id): Path<u64>,
) -> ApiResult<TransactionResponse> {
    let vault = state.vault.read().await;
    TransactionResponse::new(&vault.wallet, tx_id)
        .map(Json)
        .map_err(multisig_error)
}

/// GET /api/transactions/{id}/approvals/{owner} - Has `owner` approved
pub async fn get_approval(
    State(state): State<ApiState>,
    Path((tx_id, owner)): Path<(u64, Address)>,
) -> ApiResult<ApprovalResponse> {
    let vault = state.vault.read().await;
    vault.wallet.transaction(tx_id).map_err(multisig_error)?;

    Ok(Json(ApprovalResponse {
        tx_id,
        owner,
        approved: vault.wallet.has_approved(tx_id, &owner),
    }))
}

/// POST /api/transactions - Submit a signed transaction proposal
pub async fn submit_transaction(
    State(state): State<ApiState>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<TransactionResponse> {
    let mut vault = state.vault.write().await;

    let action = Action::Submit {
        to: req.to,
        value: req.value,
        data: req.data.clone(),
    };
    let owner = authorize(&vault.wallet, &action, &req.auth).map_err(auth_error)?;

    let tx_id = commit(&state, &mut vault, |staged| {
        staged.wallet.submit(owner, req.to, req.value, req.data)
    })?;

    TransactionResponse::new(&vault.wallet, tx_id)
        .map(Json)
        .map_err(multisig_error)
}

/// POST /api/transactions/{id}/approve - Approve with an owner signature
pub async fn approve_transaction(
    State(state): State<ApiState>,
    Path(tx_id): Path<u64>,
    Json(auth): Json<Authorization>,
) -> ApiResult<TransactionResponse> {
    let mut vault = state.vault.write().await;

    let owner =
        authorize(&vault.wallet, &Action::Approve { tx_id }, &auth).map_err(auth_error)?;
    commit(&state, &mut vault, |staged| staged.wallet.approve(tx_id, owner))?;

    TransactionResponse::new(&vault.wallet, tx_id)
        .map(Json)
        .map_err(multisig_error)
}

/// POST /api/transactions/{id}/revoke - Revoke with an owner signature
pub async fn revoke_transaction(
    State(state): State<ApiState>,
    Path(tx_id): Path<u64>,
    Json(auth): Json<Authorization>,
) -> ApiResult<TransactionResponse> {
    let mut vault = state.vault.write().await;

    let owner =
        authorize(&vault.wallet, &Action::Revoke { tx_id }, &auth).map_err(auth_error)?;
    commit(&state, &mut vault, |staged| staged.wallet.revoke(tx_id, owner))?;

    TransactionResponse::new(&vault.wallet, tx_id)
        .map(Json)
        .map_err(multisig_error)
}

/// POST /api/transactions/{id}/execute - Execute a transaction at quorum
pub async fn execute_transaction(
    State(state): State<ApiState>,
    Path(tx_id): Path<u64>,
) -> ApiResult<ExecuteResponse> {
    let mut vault = state.vault.write().await;

    let returned = commit(&state, &mut vault, |staged| staged.execute(tx_id))?;

    Ok(Json(ExecuteResponse {
        tx_id,
        returned: hex::encode(returned),
        balance: vault.wallet.balance(),
    }))
}

/// POST /api/deposit - Credit value to the wallet
pub async fn deposit(
    State(state): State<ApiState>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<DepositResponse> {
    let mut vault = state.vault.write().await;

    let balance = commit(&state, &mut vault, |staged| {
        staged.wallet.deposit(req.from, req.amount)
    })?;

    Ok(Json(DepositResponse {
        from: req.from,
        amount: req.amount,
        balance,
    }))
}

/// GET /api/events?since=N - Event records from sequence N onwards
pub async fn get_events(
    State(state): State<ApiState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<EventRecord>> {
    let vault = state.vault.read().await;
    Json(vault.wallet.events_since(query.since.unwrap_or(0)).to_vec())
}

/// GET /api/ledger - Value forwarded to each target
pub async fn get_ledger(State(state): State<ApiState>) -> Json<LedgerResponse> {
    let vault = state.vault.read().await;
    Json(LedgerResponse {
        accounts: vault.ledger.accounts().clone(),
        receipts: vault.ledger.receipts().to_vec(),
        rejecting: vault.ledger.rejecting().copied().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::multisig::MultisigConfig;
    use crate::storage::StorageConfig;

    struct Fixture {
        state: ApiState,
        keys: Vec<KeyPair>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(StorageConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let owners = keys.iter().map(|k| k.address()).collect();
        let vault = Vault::new(MultisigConfig::new(owners, 2, None).unwrap()).unwrap();

        Fixture {
            state: ApiState::new(vault, storage),
            keys,
            _dir: dir,
        }
    }

    async fn sign(state: &ApiState, key: &KeyPair, action: &Action) -> Authorization {
        let vault = state.vault.read().await;
        Authorization::sign(key, action, &vault.wallet.address(), vault.wallet.sequence()).unwrap()
    }

    async fn submit(
        state: &ApiState,
        key: &KeyPair,
        to: Address,
        value: u64,
    ) -> ApiResult<TransactionResponse> {
        let action = Action::Submit {
            to,
            value,
            data: vec![],
        };
        let auth = sign(state, key, &action).await;
        submit_transaction(
            State(state.clone()),
            Json(SubmitRequest {
                to,
                value,
                data: vec![],
                auth,
            }),
        )
        .await
    }

    async fn approve(f: &Fixture, key: usize, tx_id: u64) -> ApiResult<TransactionResponse> {
        let auth = sign(&f.state, &f.keys[key], &Action::Approve { tx_id }).await;
        approve_transaction(State(f.state.clone()), Path(tx_id), Json(auth)).await
    }

    fn status_of<T>(result: ApiResult<T>) -> StatusCode {
        match result {
            Ok(_) => StatusCode::OK,
            Err((status, _)) => status,
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, "OK");
    }

    #[tokio::test]
    async fn test_signed_flow_to_execution() {
        let f = fixture();
        let target = Address::from_bytes([9; 20]);

        deposit(
            State(f.state.clone()),
            Json(DepositRequest {
                from: target,
                amount: 50,
            }),
        )
        .await
        .unwrap();

        let Json(tx) = submit(&f.state, &f.keys[0], target, 20).await.unwrap();
        assert_eq!(tx.status, TxStatus::Pending);

        approve(&f, 0, tx.id).await.unwrap();
        let Json(tx) = approve(&f, 1, tx.id).await.unwrap();
        assert_eq!(tx.status, TxStatus::Executable);
        assert_eq!(tx.approvals, 2);

        let Json(done) = execute_transaction(State(f.state.clone()), Path(tx.id))
            .await
            .unwrap();
        assert_eq!(done.balance, 30);

        let Json(ledger) = get_ledger(State(f.state.clone())).await;
        assert_eq!(ledger.accounts.get(&target), Some(&20));

        // Every mutation was persisted
        let stored = f.state.storage.load().unwrap();
        assert_eq!(stored.wallet.sequence(), 5);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let f = fixture();
        let target = Address::from_bytes([9; 20]);

        // Unknown transaction
        assert_eq!(
            status_of(get_transaction(State(f.state.clone()), Path(3)).await),
            StatusCode::NOT_FOUND
        );

        // Valid signature from a key that is not an owner
        let outsider = KeyPair::generate();
        assert_eq!(
            status_of(submit(&f.state, &outsider, target, 1).await),
            StatusCode::FORBIDDEN
        );

        let Json(tx) = submit(&f.state, &f.keys[0], target, 1).await.unwrap();

        // Below quorum
        assert_eq!(
            status_of(execute_transaction(State(f.state.clone()), Path(tx.id)).await),
            StatusCode::BAD_REQUEST
        );

        // Signature over a different action
        let wrong = sign(&f.state, &f.keys[0], &Action::Revoke { tx_id: tx.id }).await;
        assert_eq!(
            status_of(approve_transaction(State(f.state.clone()), Path(tx.id), Json(wrong)).await),
            StatusCode::UNAUTHORIZED
        );

        // Quorum reached but the wallet holds nothing to forward
        approve(&f, 0, tx.id).await.unwrap();
        approve(&f, 2, tx.id).await.unwrap();
        assert_eq!(
            status_of(execute_transaction(State(f.state.clone()), Path(tx.id)).await),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_revoke_and_approval_query() {
        let f = fixture();
        let owner = f.keys[1].address();
        let Json(tx) = submit(&f.state, &f.keys[1], Address::from_bytes([9; 20]), 0).await.unwrap();
        approve(&f, 1, tx.id).await.unwrap();

        let Json(approval) = get_approval(State(f.state.clone()), Path((tx.id, owner)))
            .await
            .unwrap();
        assert!(approval.approved);

        let auth = sign(&f.state, &f.keys[1], &Action::Revoke { tx_id: tx.id }).await;
        let Json(tx) = revoke_transaction(State(f.state.clone()), Path(tx.id), Json(auth))
            .await
            .unwrap();
        assert_eq!(tx.approvals, 0);
        assert!(tx.approved_by.is_empty());
    }

    #[tokio::test]
    async fn test_events_and_broadcast() {
        let f = fixture();
        let mut rx = f.state.ws_broadcaster.subscribe();

        deposit(
            State(f.state.clone()),
            Json(DepositRequest {
                from: Address::from_bytes([5; 20]),
                amount: 0,
            }),
        )
        .await
        .unwrap();
        let _ = submit(&f.state, &f.keys[2], Address::from_bytes([9; 20]), 0)
            .await
            .unwrap();

        let Json(events) = get_events(
            State(f.state.clone()),
            Query(EventsQuery { since: Some(1) }),
        )
        .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.name(), "Submit");

        for expected in 0..2 {
            match rx.recv().await.unwrap() {
                crate::api::websocket::WsEvent::Event { record } => {
                    assert_eq!(record.sequence, expected)
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_failed_save_discards_change() {
        let f = fixture();
        let mut rx = f.state.ws_broadcaster.subscribe();
        let depositor = Address::from_bytes([5; 20]);
        let request = || {
            Json(DepositRequest {
                from: depositor,
                amount: 5,
            })
        };

        // Data directory replaced by a regular file
        let data_dir = f.state.storage.data_dir().to_path_buf();
        std::fs::remove_dir_all(&data_dir).unwrap();
        std::fs::write(&data_dir, b"not a directory").unwrap();

        assert_eq!(
            status_of(deposit(State(f.state.clone()), request()).await),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let Json(info) = get_wallet(State(f.state.clone())).await;
        assert_eq!(info.balance, 0);
        assert_eq!(info.sequence, 0);
        assert!(rx.try_recv().is_err());

        // Same request once storage is back
        std::fs::remove_file(&data_dir).unwrap();
        std::fs::create_dir(&data_dir).unwrap();
        let Json(done) = deposit(State(f.state.clone()), request()).await.unwrap();
        assert_eq!(done.balance, 5);
        match rx.recv().await.unwrap() {
            crate::api::websocket::WsEvent::Event { record } => assert_eq!(record.sequence, 0),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(f.state.storage.load().unwrap().wallet.balance(), 5);
    }

    #[tokio::test]
    async fn test_wallet_and_owner_queries() {
        let f = fixture();
        let Json(info) = get_wallet(State(f.state.clone())).await;
        assert_eq!(info.quorum, 2);
        assert_eq!(info.description, "2-of-3");
        assert_eq!(info.owners.len(), 3);

        let Json(owner) =
            get_owner(State(f.state.clone()), Path(f.keys[0].address())).await;
        assert!(owner.is_owner);

        let Json(stranger) =
            get_owner(State(f.state.clone()), Path(Address::from_bytes([8; 20]))).await;
        assert!(!stranger.is_owner);
    }
}
