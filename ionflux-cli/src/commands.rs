use crate::args::{CliConfig, Command};
use crate::status::{collect_statuses, log_statuses};
use anyhow::{Context, Result, bail};
use chain_registry::{
    ChainDescriptor, FeeCoin, GasPrice, NetworkRegistryEntry, NetworkVariant, build_chain_info, find_by_symbol,
    gas_price_from_registry_entry, load_registry,
};
use ionflux_signers::{
    CredentialSource, DeliverTxResponse, LocalKeyring, get_addr_by_prefix, get_contract_client,
    get_ledger_client, init_wallet_list, resolve_signer,
};
use std::sync::Arc;
use tracing::info;

pub async fn run(command: Command, config: &CliConfig) -> Result<()> {
    match command {
        Command::ConvertAddress { address, prefix } => {
            println!("{}", get_addr_by_prefix(&address, &prefix)?);
        }
        Command::ChainInfo => {
            let registry = load_registry(&config.registry_path)?;
            let descriptor = build_chain_info(Some(selected(&registry, config)?), config.variant)?;
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }
        Command::GasPrice => {
            let registry = load_registry(&config.registry_path)?;
            let entry = selected(&registry, config)?;
            println!("{}", gas_price_from_registry_entry(entry, config.variant));
        }
        Command::Account => {
            let target = Target::load(config)?;
            let resolved = resolve_signer(&target.seed_source(config)?, config.hd_path.as_deref()).await?;
            println!("{}", resolved.owner);
        }
        Command::WalletInit => wallet_init(config).await?,
        Command::Send { to, amount, memo } => {
            let target = Target::load(config)?;
            let source = target.seed_source(config)?;
            let connected = get_ledger_client(&source, config.hd_path.as_deref())
                .await
                .context("Failed to connect ledger client")?;

            let coins = [target.native(amount)];
            let response = connected
                .client
                .send_tokens(&connected.owner, &to, &coins, &target.gas_price()?, &memo)
                .await?;
            report(&response)?;
        }
        Command::Execute {
            contract,
            msg,
            funds,
            memo,
        } => {
            let target = Target::load(config)?;
            let source = target.seed_source(config)?;
            let msg: serde_json::Value =
                serde_json::from_str(&msg).context("Contract message must be valid JSON")?;
            let funds: Vec<FeeCoin> = funds.map(|amount| target.native(amount)).into_iter().collect();

            let connected = get_contract_client(&source, config.hd_path.as_deref())
                .await
                .context("Failed to connect contract client")?;
            let response = connected
                .client
                .execute(
                    &connected.owner,
                    &contract,
                    &msg,
                    &funds,
                    &target.gas_price()?,
                    &memo,
                )
                .await?;
            report(&response)?;
        }
        Command::Query { contract, msg } => {
            let target = Target::load(config)?;
            let source = target.seed_source(config)?;
            let query: serde_json::Value =
                serde_json::from_str(&msg).context("Query must be valid JSON")?;

            let connected = get_contract_client(&source, config.hd_path.as_deref())
                .await
                .context("Failed to connect contract client")?;
            let answer: serde_json::Value = connected
                .client
                .query_contract_smart(&contract, &query)
                .await?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
    }

    Ok(())
}

fn selected<'a>(
    registry: &'a [NetworkRegistryEntry],
    config: &CliConfig,
) -> Result<&'a NetworkRegistryEntry> {
    find_by_symbol(registry, &config.symbol)
        .with_context(|| format!("Symbol {} not found in the registry", config.symbol))
}

/// The configured registry entry together with its descriptor.
struct Target {
    entry: NetworkRegistryEntry,
    descriptor: ChainDescriptor,
    variant: NetworkVariant,
}

impl Target {
    fn load(config: &CliConfig) -> Result<Self> {
        let registry = load_registry(&config.registry_path)?;
        let entry = selected(&registry, config)?.clone();
        let descriptor = build_chain_info(Some(&entry), config.variant)?;
        Ok(Self {
            entry,
            descriptor,
            variant: config.variant,
        })
    }

    fn seed_source(&self, config: &CliConfig) -> Result<CredentialSource> {
        Ok(CredentialSource::Seed {
            seed: config.require_mnemonic()?.to_string(),
            prefix: self.descriptor.bech32_config.bech32_prefix_acc_addr.clone(),
            rpc: config
                .rpc_url
                .clone()
                .unwrap_or_else(|| self.descriptor.rpc.clone()),
        })
    }

    fn gas_price(&self) -> Result<GasPrice> {
        Ok(gas_price_from_registry_entry(&self.entry, self.variant).parse()?)
    }

    fn native(&self, amount: u128) -> FeeCoin {
        FeeCoin {
            denom: self.entry.denom_native.clone(),
            amount,
        }
    }
}

async fn wallet_init(config: &CliConfig) -> Result<()> {
    let registry = load_registry(&config.registry_path)?;
    let mut keyring = LocalKeyring::new("ionflux", config.require_mnemonic()?);
    if let Some(hd_path) = &config.hd_path {
        keyring = keyring.with_hd_path(hd_path)?;
    }
    let keyring = Arc::new(keyring);

    let Some(session) = init_wallet_list(&keyring, Some(registry.as_slice()), config.variant).await?
    else {
        info!("Registry is empty, nothing to register");
        return Ok(());
    };

    let statuses = collect_statuses(&session, &registry, config.variant).await;
    log_statuses(&statuses, config.variant);
    Ok(())
}

fn report(response: &DeliverTxResponse) -> Result<()> {
    if !response.is_success() {
        bail!(
            "Transaction {} failed with code {}: {}",
            response.tx_hash,
            response.code,
            response.raw_log
        );
    }
    info!(
        tx_hash = %response.tx_hash,
        height = response.height,
        gas_used = response.gas_used,
        "Transaction succeeded"
    );
    println!("{}", response.tx_hash);
    Ok(())
}
