//! Seed phrase generation.
//!
//! Word-pair seeds are the basis for alias identities: the seed becomes the
//! alias name prefix, the alias email local part, and the context label.
//! One seed per service; never reuse one across services.

use std::path::Path;

use colored::Colorize;

use crate::error::Result;
use crate::identity;

pub fn run(count: usize, export: bool) -> Result<()> {
    let seeds = identity::seed_phrases(count);

    println!();
    println!("  {}", "pane scramble — alias seeds".bold());
    println!("  Use one seed per service. Never reuse.");
    println!();
    println!("  {:<28} {:<48} {}", "SEED", "ALIAS EMAIL EXAMPLE", "COMMAND");
    println!("  {:─<28} {:─<48} {:─<28}", "", "", "");
    for seed in &seeds {
        let suffix = identity::seed_suffix(seed);
        let email = format!("{seed}-{suffix}@alias.yourdomain.com");
        let command = format!("pane enroll <url> --seed {seed}");
        println!("  {:<28} {:<48} {}", seed.green(), email, command.dimmed());
    }
    println!();
    println!("  {} seeds generated from OS entropy", seeds.len());
    println!();

    if export {
        let path = Path::new("alias-seeds.txt");
        std::fs::write(path, seeds.join("\n") + "\n")?;
        println!("  Written to {}", path.display());
        println!(
            "  {} Keep this file private. Delete it when done. Never commit it.",
            "⚠".yellow()
        );
        println!();
    }

    Ok(())
}
