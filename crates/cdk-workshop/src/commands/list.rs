use colored::Colorize;

pub fn handle() -> anyhow::Result<()> {
    let (_, app) = super::load_app()?;

    for stack in app.stacks() {
        println!(
            "{} ({}, {})",
            stack.id().cyan().bold(),
            stack.stack_name(),
            stack.environment().name().dimmed()
        );
        for declaration in stack.declarations() {
            let references = if declaration.references.is_empty() {
                String::new()
            } else {
                format!(" → {}", declaration.references.join(", "))
            };
            println!(
                "  - {} [{}]{}",
                declaration.id,
                declaration.kind,
                references.dimmed()
            );
        }
    }

    Ok(())
}
