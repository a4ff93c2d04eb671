use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use mala::{
    checkout::{CheckoutForm, DeliveryLocation, Evidence},
    orders::{PaymentMethod, SpiceLevel},
};
use mala_app::{context::AppContext, render};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Location {
    Hashtag,
    Replay,
    BeToSit,
    PhromMit,
    Alone,
    LangMo,
    Other,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Spice {
    None,
    Mild,
    Medium,
    Hot,
    ExtraHot,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Payment {
    Slip,
    Cash,
}

#[derive(Debug, Args)]
pub(crate) struct CheckoutArgs {
    /// Customer name
    #[arg(long)]
    name: String,

    /// Customer phone number
    #[arg(long)]
    phone: String,

    /// Delivery location
    #[arg(long, value_enum, default_value_t = Location::Hashtag)]
    location: Location,

    /// Delivery address when the location is `other`
    #[arg(long)]
    address: Option<String>,

    /// Spice level
    #[arg(long, value_enum, default_value_t = Spice::Medium)]
    spice: Spice,

    /// Payment method
    #[arg(long, value_enum, default_value_t = Payment::Slip)]
    payment: Payment,

    /// Payment slip image, required for slip payment
    #[arg(long)]
    slip: Option<PathBuf>,

    /// Notes for the kitchen
    #[arg(long, default_value = "")]
    notes: String,
}

impl Location {
    fn into_delivery(self, address: Option<String>) -> DeliveryLocation {
        match self {
            Self::Hashtag => DeliveryLocation::HashTag,
            Self::Replay => DeliveryLocation::Replay,
            Self::BeToSit => DeliveryLocation::BeToSit,
            Self::PhromMit => DeliveryLocation::PhromMit,
            Self::Alone => DeliveryLocation::Alone,
            Self::LangMo => DeliveryLocation::LangMo,
            Self::Other => DeliveryLocation::Other(address.unwrap_or_default()),
        }
    }
}

impl From<Spice> for SpiceLevel {
    fn from(spice: Spice) -> Self {
        match spice {
            Spice::None => Self::None,
            Spice::Mild => Self::Mild,
            Spice::Medium => Self::Medium,
            Spice::Hot => Self::Hot,
            Spice::ExtraHot => Self::ExtraHot,
        }
    }
}

impl From<Payment> for PaymentMethod {
    fn from(payment: Payment) -> Self {
        match payment {
            Payment::Slip => Self::Slip,
            Payment::Cash => Self::Cash,
        }
    }
}

fn read_slip(path: &Path) -> Result<Evidence, String> {
    let bytes = std::fs::read(path)
        .map_err(|error| format!("failed to read {}: {error}", path.display()))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "slip".to_string());

    let content_type = match path.extension().and_then(|ext| ext.to_str()) {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    };

    Ok(Evidence {
        file_name,
        content_type: content_type.to_string(),
        bytes,
    })
}

pub(crate) async fn run(context: &AppContext, args: CheckoutArgs) -> Result<(), String> {
    let service = context.checkout().map_err(|error| error.to_string())?;

    let evidence = args.slip.as_deref().map(read_slip).transpose()?;

    let form = CheckoutForm {
        customer_name: args.name,
        customer_phone: args.phone,
        delivery: args.location.into_delivery(args.address),
        spice_level: args.spice.into(),
        payment_method: args.payment.into(),
        notes: args.notes,
        evidence,
    };

    let order = service
        .submit(form)
        .await
        .map_err(|error| error.user_message())?;

    println!("order placed: {}", order.id);
    println!("status: {}", order.status.as_str());
    println!("total: {}", render::money(order.total, context.currency));

    Ok(())
}
