use clap::{Args, Subcommand};
use mala::{
    cart::{CartEvent, CartProduct},
    menu::MenuItemUuid,
    uuids::TypedUuid,
};
use mala_app::{context::AppContext, render};
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct CartCommand {
    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartSubcommand {
    /// Show the cart and its totals
    Show,
    /// Add a menu item
    Add(AddArgs),
    /// Set an item's quantity; zero or less removes it
    Set(SetArgs),
    /// Remove an item
    Remove(ItemArgs),
    /// Empty the cart
    Clear,
}

#[derive(Debug, Args)]
struct ItemArgs {
    /// Menu item ID
    item: Uuid,
}

#[derive(Debug, Args)]
struct AddArgs {
    /// Menu item ID
    item: Uuid,

    /// How many to add
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    quantity: u32,
}

#[derive(Debug, Args)]
struct SetArgs {
    /// Menu item ID
    item: Uuid,

    /// New quantity
    #[arg(allow_negative_numbers = true)]
    quantity: i64,
}

pub(crate) async fn run(context: &AppContext, command: CartCommand) -> Result<(), String> {
    let subscription = context.cart.subscribe(report);

    let result = match command.command {
        CartSubcommand::Show => show(context),
        CartSubcommand::Add(args) => add(context, args).await,
        CartSubcommand::Set(args) => context
            .cart
            .set_quantity(TypedUuid::from_uuid(args.item), args.quantity)
            .map_err(|error| format!("failed to update cart: {error}")),
        CartSubcommand::Remove(args) => context
            .cart
            .remove(TypedUuid::from_uuid(args.item))
            .map_err(|error| format!("failed to update cart: {error}")),
        CartSubcommand::Clear => context
            .cart
            .clear()
            .map_err(|error| format!("failed to clear cart: {error}")),
    };

    context.cart.unsubscribe(subscription);

    result
}

fn report(event: &CartEvent) {
    match event {
        CartEvent::Added { id, quantity } => println!("added {id}, now {quantity} in cart"),
        CartEvent::QuantityChanged { id, quantity } => println!("{id} set to {quantity}"),
        CartEvent::Removed { id } => println!("removed {id}"),
        CartEvent::Cleared => println!("cart cleared"),
    }
}

fn show(context: &AppContext) -> Result<(), String> {
    let items = context
        .cart
        .read()
        .map_err(|error| format!("failed to read cart: {error}"))?;

    if items.is_empty() {
        println!("your cart is empty");
        return Ok(());
    }

    let totals = context
        .cart
        .totals(&context.schedule)
        .map_err(|error| format!("failed to price cart: {error}"))?;

    println!("{}", render::cart_table(&items, &totals));

    Ok(())
}

async fn add(context: &AppContext, args: AddArgs) -> Result<(), String> {
    let id: MenuItemUuid = TypedUuid::from_uuid(args.item);
    let records = context.records().map_err(|error| error.to_string())?;

    let item = records
        .get_menu_item(id)
        .await
        .map_err(|error| format!("failed to load menu item {id}: {error}"))?;

    if !item.is_available {
        return Err(format!("{} is sold out", item.name));
    }

    let product = CartProduct::from(&item);

    for _ in 0..args.quantity {
        context
            .cart
            .add(product.clone())
            .map_err(|error| format!("failed to update cart: {error}"))?;
    }

    Ok(())
}
