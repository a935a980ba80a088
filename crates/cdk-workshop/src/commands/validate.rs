use colored::Colorize;
use std::collections::BTreeMap;

pub fn handle() -> anyhow::Result<()> {
    println!("{}", "Validating stack...".blue());

    let (settings, app) = super::load_app()?;
    super::print_config_source(&settings);

    for (stack, template) in app.synth()? {
        println!("{}", "✓ Stack synthesizes cleanly".green().bold());
        println!();
        println!("Summary:");
        println!("  Stack: {} ({})", stack.id().cyan(), stack.stack_name());
        println!("  Environment: {}", stack.environment().name());

        println!("  Declarations: {}", stack.declarations().len());
        for declaration in stack.dependency_order()? {
            println!("    - {} ({})", declaration.id.cyan(), declaration.kind);
        }

        let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
        for resource in template.resources.values() {
            let resource_type = resource
                .get("Type")
                .and_then(|t| t.as_str())
                .unwrap_or("Unknown");
            *by_type.entry(resource_type).or_default() += 1;
        }
        println!("  Resources: {}", template.resources.len());
        for (resource_type, count) in by_type {
            println!("    - {} × {}", resource_type, count);
        }
        println!("  Parameters: {}", template.parameters.len());
    }

    Ok(())
}
