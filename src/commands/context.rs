//! Envelope management commands.

use colored::Colorize;

use crate::config::Config;
use crate::error::Result;
use crate::providers::{AliasClient, AliasProvider, CardClient, CardProvider};
use crate::store::ContextStore;

pub fn list(store: &ContextStore) -> Result<()> {
    let envelopes = store.list()?;
    if envelopes.is_empty() {
        println!("  No contexts yet. Run {} to create one.", "pane enroll".bold());
        return Ok(());
    }

    println!("  {:<24} {:<36} {:<8} {}", "CONTEXT", "ALIAS", "CARD", "STATUS");
    for envelope in envelopes {
        let status = if envelope.tombstoned {
            "burned".red().to_string()
        } else {
            "active".green().to_string()
        };
        println!(
            "  {:<24} {:<36} *{:<7} {}",
            envelope.name, envelope.alias.email, envelope.card.last_four, status
        );
    }
    Ok(())
}

pub fn show(store: &ContextStore, name: &str) -> Result<()> {
    let envelope = store.get(name)?;
    println!("  context:   {}", envelope.name.bold());
    println!("  identity:  {}", envelope.identity.full_name);
    println!("  alias:     {} ({})", envelope.alias.email, envelope.alias.id);
    println!("  card:      *{} ({})", envelope.card.last_four, envelope.card.token);
    if let Some(url) = &envelope.enrollment_url {
        println!("  enrolled:  {url}");
    }
    println!("  created:   {} (unix)", envelope.created_at);
    if envelope.tombstoned {
        println!("  status:    {}", "burned".red());
    }
    Ok(())
}

/// Burn an envelope: delete the alias, freeze the card, tombstone the
/// record. Each provider step is attempted even if an earlier one fails.
pub async fn burn(store: &ContextStore, config: &Config, name: &str) -> Result<()> {
    let envelope = store.get(name)?;

    let alias_client = AliasClient::new(&config.alias.base_url, &config.alias.api_key)?;
    match alias_client.delete(&envelope.alias.id).await {
        Ok(()) => println!("  {} alias {} deleted", "✓".green(), envelope.alias.email),
        Err(e) => println!("  {} alias delete failed: {e}", "✗".red()),
    }

    let card_client = CardClient::new(&config.card.base_url, &config.card.api_key)?;
    match card_client.freeze(&envelope.card.token).await {
        Ok(()) => println!("  {} card *{} frozen", "✓".green(), envelope.card.last_four),
        Err(e) => println!("  {} card freeze failed: {e}", "✗".red()),
    }

    store.tombstone(name)?;
    println!("  {} context {} tombstoned", "✓".green(), name.bold());
    Ok(())
}
