use anyhow::Result as AnyResult;
use chrono::Utc;
use hstorage::config::StorageConfig;
use hstorage::mapping::{MappingConfigurer, ModelMapping};
use hstorage::persist::{InMemoryStatePersister, StatePersister};
use hstorage::storage::Storage;
use hstorage_macros::aggregate;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};
use ulid::Ulid;

#[aggregate(tag = "customer", collection = "customers")]
#[derive(Clone, PartialEq)]
struct Customer {
    name: String,
    email: String,
}

#[aggregate(tag = "deposit", collection = "accounts")]
#[derive(Clone, PartialEq)]
struct DepositAccount {
    owner: String,
    balance: i64,
}

#[aggregate(tag = "credit", collection = "accounts")]
#[derive(Clone, PartialEq)]
struct CreditAccount {
    owner: String,
    limit: i64,
    used: i64,
}

#[derive(Debug, Clone, PartialEq)]
enum Account {
    Deposit(DepositAccount),
    Credit(CreditAccount),
}

impl From<DepositAccount> for Account {
    fn from(account: DepositAccount) -> Self {
        Account::Deposit(account)
    }
}

impl From<CreditAccount> for Account {
    fn from(account: CreditAccount) -> Self {
        Account::Credit(account)
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hstorage=debug"));
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .try_init();
}

/// 配置文件缺失时使用默认配置（仅内存持久化）
fn load_config() -> AnyResult<StorageConfig> {
    match StorageConfig::load_default() {
        Ok(cfg) => Ok(cfg),
        Err(err) => {
            info!(%err, "falling back to default configuration");
            let mut cfg = StorageConfig::default();
            cfg.normalize_and_validate()?;
            Ok(cfg)
        }
    }
}

fn configure_mapping(config: &StorageConfig) -> AnyResult<ModelMapping> {
    let mapping = MappingConfigurer::from_config(config)
        .register::<Customer>()
        .register_subtype::<Account, DepositAccount>()
        .register_subtype::<Account, CreditAccount>()
        .configure()?;
    Ok(mapping)
}

async fn run<P: StatePersister>(storage: Storage<P>) -> AnyResult<()> {
    let customer = Customer {
        id: Ulid::new().to_string(),
        name: "Van".to_string(),
        email: "van@example.com".to_string(),
    };
    storage.save(&customer).await?;
    let loaded: Customer = storage.load(&customer.id).await?;
    info!(id = %loaded.id, name = %loaded.name, "customer loaded");

    let deposit = DepositAccount {
        id: format!("acc-{}", Ulid::new()),
        owner: customer.id.clone(),
        balance: 1_000,
    };
    let credit = CreditAccount {
        id: format!("acc-{}", Ulid::new()),
        owner: customer.id.clone(),
        limit: 5_000,
        used: 120,
    };
    storage.save(&deposit).await?;
    storage.save(&credit).await?;

    for id in [&deposit.id, &credit.id] {
        match storage.load::<Account>(id).await? {
            Account::Deposit(a) => info!(id = %a.id, balance = a.balance, "deposit account"),
            Account::Credit(a) => {
                info!(id = %a.id, available = a.limit - a.used, "credit account")
            }
        }
    }

    // 覆盖保存：同一标识只保留最后一次写入
    let topped_up = DepositAccount {
        balance: deposit.balance + 250,
        ..deposit.clone()
    };
    storage.save(&topped_up).await?;
    let reloaded: DepositAccount = storage.load(&deposit.id).await?;
    info!(balance = reloaded.balance, at = %Utc::now(), "deposit account overwritten");

    if let Err(err) = storage.load::<Customer>("missing").await {
        info!(%err, not_found = err.is_not_found(), "expected failure");
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> AnyResult<()> {
    init_logging();

    let config = load_config()?;
    let mapping = Arc::new(configure_mapping(&config)?);

    #[cfg(feature = "postgres")]
    if config.database.is_configured() {
        let persister = hstorage::persist::PostgresStatePersister::connect(&config.database).await?;
        for collection in ["customers", "accounts"] {
            persister.create_collection(collection).await?;
        }
        return run(Storage::with_system_clock(mapping, Arc::new(persister))).await;
    }

    let persister = Arc::new(InMemoryStatePersister::new());
    run(Storage::with_system_clock(mapping, Arc::clone(&persister))).await?;
    info!(rows = persister.len(), "demo finished");
    Ok(())
}
