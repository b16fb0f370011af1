// System status display: keyword file, vault state, classifier readiness.

use colored::Colorize;

use crate::config::{Config, ScorerBackend};
use crate::taxonomy::Taxonomy;
use crate::toxicity::download::model_files_present;
use crate::vault::{Vault, VaultState};

/// Display system status to the terminal. Reports problems, never fails.
pub fn show(config: &Config) {
    match Taxonomy::load(&config.keywords_path) {
        Ok(taxonomy) => {
            println!(
                "Keywords: {} ({} categories)",
                config.keywords_path.display(),
                taxonomy.len()
            );
            for category in taxonomy.categories() {
                println!("  {:<24} {} triggers", category.name, category.triggers.len());
            }
        }
        Err(e) => {
            println!("Keywords: {}", e.to_string().red());
        }
    }

    let vault = Vault::new(&config.vault_dir);
    let state = vault.state();
    let state_str = match state {
        VaultState::Provisioned => state.to_string().green(),
        VaultState::Orphaned => state.to_string().red(),
        _ => state.to_string().yellow(),
    };
    println!("Vault: {} ({})", vault.dir().display(), state_str);
    if state != VaultState::Provisioned && state != VaultState::Orphaned {
        println!("  You will be asked for your bearer token on the next `nextsight analyze`");
    }

    match config.scorer_backend {
        ScorerBackend::Onnx => {
            let ready = model_files_present(&config.model_dir);
            println!(
                "Classifier: local ONNX model in {} ({})",
                config.model_dir.display(),
                if ready {
                    "ready".green()
                } else {
                    "missing".red()
                }
            );
            if !ready {
                println!("  Run `nextsight download-model` to fetch it");
            }
        }
        ScorerBackend::Perspective => {
            let ready = !config.perspective_api_key.is_empty();
            println!(
                "Classifier: Perspective API ({})",
                if ready {
                    "key configured".green()
                } else {
                    "PERSPECTIVE_API_KEY not set".red()
                }
            );
        }
    }

    println!("Reports: {}", config.reports_dir.display());
}
