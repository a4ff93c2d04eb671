use clap::{Parser, Subcommand};
use mala_app::{config::AppConfig, context::AppContext, observability};

mod cart;
mod checkout;
mod history;
mod menu;
mod order;

#[derive(Debug, Parser)]
#[command(name = "mala", about = "Mala skewer ordering CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    config: AppConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the menu
    Menu(menu::MenuArgs),
    /// Inspect or change the cart
    Cart(cart::CartCommand),
    /// Place an order for the cart
    Checkout(checkout::CheckoutArgs),
    /// List orders placed from this device
    History(history::HistoryArgs),
    /// Show one order
    Order(order::OrderArgs),
}

impl Cli {
    pub(crate) fn load() -> Self {
        _ = dotenvy::dotenv();

        Self::parse()
    }

    pub(crate) async fn run(self) -> Result<(), String> {
        observability::init_subscriber(&self.config.logging)
            .map_err(|error| format!("failed to initialise logging: {error}"))?;

        let context = AppContext::from_config(&self.config)
            .map_err(|error| format!("failed to load device state: {error}"))?;

        match self.command {
            Commands::Menu(args) => menu::run(&context, args).await,
            Commands::Cart(command) => cart::run(&context, command).await,
            Commands::Checkout(args) => checkout::run(&context, args).await,
            Commands::History(args) => history::run(&context, args).await,
            Commands::Order(args) => order::run(&context, args).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    const ITEM: &str = "018f2b6e-7c1a-7000-8000-000000000001";

    #[test]
    fn adding_zero_items_is_rejected() {
        let result = Cli::try_parse_from(["mala", "cart", "add", ITEM, "--quantity", "0"]);

        assert!(result.is_err());
    }

    #[test]
    fn adding_one_item_is_the_default() -> TestResult {
        let cli = Cli::try_parse_from(["mala", "cart", "add", ITEM])?;

        assert!(matches!(cli.command, Commands::Cart(_)));

        Ok(())
    }

    #[test]
    fn history_can_follow_updates() -> TestResult {
        let cli = Cli::try_parse_from(["mala", "history", "--follow", "--interval", "2"])?;

        assert!(matches!(cli.command, Commands::History(_)));
        assert!(Cli::try_parse_from(["mala", "history", "--follow", "--interval", "0"]).is_err());

        Ok(())
    }
}
