use comfy_table::Table;
use umikit_deploy::{BatchResults, DeploymentOutcome, NetworkRegistry};

pub fn results_table(results: &BatchResults) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Contract", "Status", "Address", "Transaction"]);

    for (name, outcome) in results.iter() {
        match outcome {
            DeploymentOutcome::Deployed(result) => table.add_row(vec![
                name.clone(),
                "deployed".to_string(),
                result
                    .address
                    .address()
                    .map_or_else(|| "unresolved".to_string(), |a| a.to_string()),
                result.hash.to_string(),
            ]),
            DeploymentOutcome::Failed { error } => table.add_row(vec![
                name.clone(),
                "failed".to_string(),
                error.clone(),
                String::new(),
            ]),
        };
    }

    table
}

pub fn networks_table(registry: &NetworkRegistry, default: &str) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Network", "RPC URL", "Chain ID"]);

    for network in registry.iter() {
        let name = if network.name == default {
            format!("{} (default)", network.name)
        } else {
            network.name.clone()
        };
        table.add_row(vec![name, network.rpc_url.to_string(), network.chain_id.to_string()]);
    }

    table
}
