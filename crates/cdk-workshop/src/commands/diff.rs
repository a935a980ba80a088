use cdk_workshop_stack::{ActionType, Assembly, diff_templates};
use colored::Colorize;
use std::path::PathBuf;

pub async fn handle(output: Option<PathBuf>) -> anyhow::Result<()> {
    let (settings, app) = super::load_app()?;
    let assembly = Assembly::new(super::output_dir(&settings, output));

    println!("{}", "Comparing with previous synthesis...".blue());
    super::print_config_source(&settings);

    for (stack, template) in app.synth()? {
        let previous = assembly.load_template(stack.id()).await?;
        println!();
        if previous.is_none() {
            println!(
                "Stack {} {}",
                stack.id().cyan().bold(),
                "(no previous template)".dimmed()
            );
        } else {
            println!("Stack {}", stack.id().cyan().bold());
        }

        let plan = diff_templates(previous.as_ref(), &template);
        for action in &plan.actions {
            match action.action_type {
                ActionType::Create => {
                    println!("  {} {}", "+".green().bold(), action.description.green())
                }
                ActionType::Update => {
                    println!("  {} {}", "~".yellow().bold(), action.description.yellow())
                }
                ActionType::Delete => {
                    println!("  {} {}", "-".red().bold(), action.description.red())
                }
                ActionType::NoOp => {}
            }
        }

        if plan.has_changes {
            println!();
            println!("  {}", plan.summary().to_string().bold());
        } else {
            println!("  {}", "There were no differences".green());
        }
    }

    Ok(())
}
