use clap::Args;
use mala_app::{context::AppContext, render};

#[derive(Debug, Args)]
pub(crate) struct MenuArgs {
    /// Include sold-out items
    #[arg(long)]
    all: bool,
}

pub(crate) async fn run(context: &AppContext, args: MenuArgs) -> Result<(), String> {
    let records = context.records().map_err(|error| error.to_string())?;

    let mut items = records
        .list_menu_items()
        .await
        .map_err(|error| format!("failed to load menu: {error}"))?;

    if !args.all {
        items.retain(|item| item.is_available);
    }

    if items.is_empty() {
        println!("the menu is empty");
        return Ok(());
    }

    println!("{}", render::menu_table(&items, context.currency));

    Ok(())
}
