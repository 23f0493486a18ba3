use chain_registry::{NetworkRegistryEntry, NetworkVariant};
use ionflux_signers::WalletSession;
use term_table::row::Row;
use term_table::table_cell::{Alignment as CellAlignment, TableCell};
use term_table::{Table, TableStyle};
use tracing::{info, warn};

/// Per-chain outcome of a wallet setup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStatus {
    pub symbol: String,
    pub chain_id: Option<String>,
    pub registered: Option<String>,
    pub authorized: Option<String>,
    pub address: Option<String>,
}

impl ChainStatus {
    fn is_ready(&self) -> bool {
        self.registered.is_none() && self.authorized.is_none() && self.address.is_some()
    }
}

/// Pair every registry entry with its register/authorize results and, when ready, its address.
pub async fn collect_statuses(
    session: &WalletSession,
    registry: &[NetworkRegistryEntry],
    variant: NetworkVariant,
) -> Vec<ChainStatus> {
    let mut statuses = Vec::with_capacity(registry.len());

    for ((entry, registered), authorized) in registry
        .iter()
        .zip(&session.registered)
        .zip(&session.authorized)
    {
        let chain_id = entry.chain_id(variant).map(str::to_string);
        let address = match (&chain_id, authorized) {
            (Some(chain_id), Ok(())) => session
                .wallet
                .get_key(chain_id)
                .await
                .ok()
                .map(|key| key.bech32_address),
            _ => None,
        };

        statuses.push(ChainStatus {
            symbol: entry.symbol.clone(),
            chain_id,
            registered: registered.as_ref().err().map(ToString::to_string),
            authorized: authorized.as_ref().err().map(ToString::to_string),
            address,
        });
    }

    statuses
}

fn label(cell: &str) -> TableCell {
    TableCell::builder(cell.to_owned())
        .alignment(CellAlignment::Right)
        .build()
}

fn value(cell: String) -> TableCell {
    TableCell::builder(cell)
        .alignment(CellAlignment::Left)
        .build()
}

pub fn render_statuses(statuses: &[ChainStatus], variant: NetworkVariant) -> String {
    let mut table = Table::new();
    table.style = TableStyle::extended();

    let ready = statuses.iter().filter(|status| status.is_ready()).count();
    let header = if ready == statuses.len() {
        format!("🎉 {ready} CHAINS READY ({variant}) 🎉")
    } else {
        format!("⚠️  {ready} OF {} CHAINS READY ({variant})", statuses.len())
    };
    table.add_row(Row::new(vec![
        TableCell::builder(header)
            .col_span(2)
            .alignment(CellAlignment::Center)
            .build(),
    ]));

    for status in statuses {
        let chain = status.chain_id.as_deref().unwrap_or("-");
        table.add_row(Row::new(vec![
            label(&status.symbol),
            value(chain.to_string()),
        ]));

        let outcome = match (&status.registered, &status.authorized) {
            (Some(e), _) => format!("❌ register failed: {e}"),
            (None, Some(e)) => format!("❌ authorize failed: {e}"),
            (None, None) => "✅ registered and authorized".to_string(),
        };
        table.add_row(Row::new(vec![label("Status"), value(outcome)]));

        if let Some(address) = &status.address {
            table.add_row(Row::new(vec![label("Address"), value(address.clone())]));
        }
    }

    table.render()
}

/// Log the wallet setup table, as a warning when any chain is not ready.
pub fn log_statuses(statuses: &[ChainStatus], variant: NetworkVariant) {
    let table = render_statuses(statuses, variant);
    if statuses.iter().all(ChainStatus::is_ready) {
        info!("\n{table}");
    } else {
        warn!("\n{table}");
    }
}
