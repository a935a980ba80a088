use cdk_workshop_stack::Assembly;
use colored::Colorize;
use std::path::PathBuf;

pub async fn handle(output: Option<PathBuf>, quiet: bool) -> anyhow::Result<()> {
    let (settings, app) = super::load_app()?;
    let out_dir = super::output_dir(&settings, output);

    if !quiet {
        eprintln!("{}", "Synthesizing...".blue());
        super::print_config_source(&settings);
    }

    let synthesized = app.synth()?;
    let stacks: Vec<_> = synthesized
        .iter()
        .map(|(stack, template)| (*stack, template))
        .collect();

    let assembly = Assembly::new(&out_dir);
    let manifest = assembly.write(&stacks).await?;

    if quiet {
        return Ok(());
    }

    for (_, template) in &stacks {
        println!("{}", template.to_json_pretty()?);
    }

    for (stack_id, artifact) in &manifest.artifacts {
        eprintln!(
            "{} {} ({} resources) → {}",
            "✓".green().bold(),
            stack_id.cyan(),
            stacks
                .iter()
                .find(|(stack, _)| stack.id() == stack_id)
                .map(|(_, template)| template.resources.len())
                .unwrap_or(0),
            out_dir
                .join(&artifact.properties.template_file)
                .display()
                .to_string()
                .dimmed()
        );
    }

    Ok(())
}
