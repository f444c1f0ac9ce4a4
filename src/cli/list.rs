// src/cli/list.rs — Module and profile listings

use crate::registry::Registry;

/// Print modules grouped by category, then any discovery warnings.
pub fn show_modules(registry: &Registry) {
    if registry.is_empty() {
        println!("No modules available.");
    }

    for (category, modules) in registry.list_by_category() {
        println!("{category}:");
        for entry in modules {
            let module = entry.module();
            println!(
                "  {:<10} {} ({} profiles)",
                module.name(),
                module.description(),
                module.profiles().len()
            );
        }
        println!();
    }

    let diagnostics = registry.diagnostics();
    if !diagnostics.is_empty() {
        println!("Warnings:");
        for d in diagnostics {
            println!("  {d}");
        }
    }
}

/// Print a module's profile table.
pub fn show_profiles(registry: &Registry, name: &str) -> anyhow::Result<()> {
    let entry = registry.require(name)?;
    let module = entry.module();

    println!("{} ({}): {}", module.name(), entry.category(), module.description());
    println!();
    for profile in module.profiles() {
        let timeout = profile
            .timeout
            .map(|t| format!("{}s", t.as_secs()))
            .unwrap_or_else(|| "default".into());
        println!("  {:<10} {}", profile.name, profile.description);
        if !profile.args.is_empty() {
            println!("             args: {}", profile.args.join(" "));
        }
        if !profile.recommendation.is_empty() {
            println!("             use:  {}", profile.recommendation);
        }
        println!("             timeout: {timeout}");
    }
    Ok(())
}
