use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing::error;

use awb_console::{
    app::WorkflowController,
    config::ConsoleConfig,
    domain::{
        format_ron, Client, DeliveryMethod, DraftAction, LockerSelection, PackageSize,
        PickupPoint, Product, Shipment, Step,
    },
    infra::{ListParams, LockerBridge, Resource, ResourceGateway, SortOrder},
    util::{time_window::parse_calendar_date, version::version_label},
};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "awb-console", version, about = "Create and track courier AWBs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List AWBs, optionally for one business day.
    Awbs {
        /// Business day, `YYYY-MM-DD`.
        #[arg(long)]
        date: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Download the A4 PDF of an AWB.
    Download {
        awb_number: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    Products {
        #[command(flatten)]
        page: PageArgs,
    },
    Clients {
        #[command(flatten)]
        page: PageArgs,
    },
    PickupPoints {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Create an AWB by walking through every step of the creation flow.
    Create(CreateArgs),
}

#[derive(Args)]
struct PageArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = 25)]
    per_page: u32,
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long, value_enum)]
    method: MethodArg,
    #[arg(long, value_enum, default_value_t = SizeArg::M)]
    size: SizeArg,
    /// Client id used as recipient.
    #[arg(long)]
    client: String,
    #[arg(long)]
    product: String,
    #[arg(long)]
    pickup_point: String,
    /// Locker id for locker delivery.
    #[arg(long, required_if_eq("method", "locker"))]
    locker_id: Option<u64>,
    #[arg(long)]
    locker_name: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Address,
    Locker,
}

#[derive(Clone, Copy, ValueEnum)]
enum SizeArg {
    M,
    S,
    L,
}

impl From<MethodArg> for DeliveryMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Address => DeliveryMethod::ToAddress,
            MethodArg::Locker => DeliveryMethod::ToLocker,
        }
    }
}

impl From<SizeArg> for PackageSize {
    fn from(arg: SizeArg) -> Self {
        match arg {
            SizeArg::M => PackageSize::Medium,
            SizeArg::S => PackageSize::Small,
            SizeArg::L => PackageSize::Large,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "awb_console=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = ConsoleConfig::from_env()?;
    tracing::debug!(?config, version = %version_label(), "configuration loaded");
    let store = config.open_store()?;
    let gateway = Arc::new(config.gateway(store)?);

    match cli.command {
        Command::Awbs { date, page } => {
            let mut params = ListParams::new(page.page, page.per_page);
            if let Some(date) = date {
                params = params.on_date(parse_calendar_date(&date)?);
            }
            let listed = gateway.list(Resource::Shipments, &params).await?;
            for shipment in listed.items.into_iter().filter_map(Shipment::from_record) {
                println!(
                    "{}\t{}\t{}\t{}",
                    shipment.awb_number,
                    shipment.awb_status.as_deref().unwrap_or("-"),
                    shipment.recipient_name.as_deref().unwrap_or("-"),
                    shipment.cash_on_delivery.map(format_ron).unwrap_or_default(),
                );
            }
            println!("{} AWB(s) in total", listed.total);
        }
        Command::Download { awb_number, output } => {
            let bytes = gateway.remote().download_awb_pdf(&awb_number).await?;
            let path = output.unwrap_or_else(|| PathBuf::from(format!("awb-{awb_number}.pdf")));
            std::fs::write(&path, bytes)?;
            println!("saved {}", path.display());
        }
        Command::Products { page } => {
            let items = list_choices(&gateway, Resource::Products, &page, "name").await?;
            print_labels(items, Product::from_record, |p| p.label());
        }
        Command::Clients { page } => {
            let items = list_choices(&gateway, Resource::Clients, &page, "name").await?;
            print_labels(items, Client::from_record, |c| c.label());
        }
        Command::PickupPoints { page } => {
            let items = list_choices(&gateway, Resource::PickupPoints, &page, "alias").await?;
            print_labels(items, PickupPoint::from_record, |p| p.display());
        }
        Command::Create(args) => create(gateway, args).await?,
    }
    Ok(())
}

async fn list_choices(
    gateway: &ResourceGateway,
    resource: Resource,
    page: &PageArgs,
    sort_field: &str,
) -> CliResult<Vec<Value>> {
    let params = ListParams::new(page.page, page.per_page).sorted_by(sort_field, SortOrder::Asc);
    Ok(gateway.list(resource, &params).await?.items)
}

fn print_labels<T>(
    items: Vec<Value>,
    decode: fn(Value) -> Option<T>,
    label: impl Fn(&T) -> String,
) {
    for item in items.into_iter().filter_map(decode) {
        println!("{}", label(&item));
    }
}

async fn create(gateway: Arc<ResourceGateway>, args: CreateArgs) -> CliResult<()> {
    // No widget in a terminal: locker delivery takes the id from the command line.
    let controller = WorkflowController::new(gateway, Arc::new(LockerBridge::unavailable()));
    controller.start();
    controller.choices_settled().await;

    let method = DeliveryMethod::from(args.method);
    controller.dispatch(DraftAction::SelectDeliveryMethod(method));
    if let (DeliveryMethod::ToLocker, Some(locker_id)) = (method, args.locker_id) {
        let name = args
            .locker_name
            .unwrap_or_else(|| format!("Locker {locker_id}"));
        controller.dispatch(DraftAction::LockerSelected(LockerSelection { locker_id, name }));
    }
    controller.advance()?;

    controller.dispatch(DraftAction::SelectPackageSize(args.size.into()));
    controller.advance()?;

    let client = find(&controller.choices().clients().borrow().items, &args.client, |c| &c.id)
        .ok_or_else(|| format!("unknown client `{}`", args.client))?;
    controller.dispatch(DraftAction::ChooseRecipient(client));
    controller.advance()?;

    let product = find(&controller.choices().products().borrow().items, &args.product, |p| &p.id)
        .ok_or_else(|| format!("unknown product `{}`", args.product))?;
    controller.dispatch(DraftAction::ChooseProduct(product));
    controller.advance()?;

    let pickup_point = find(
        &controller.choices().pickup_points().borrow().items,
        &args.pickup_point,
        |p| &p.id,
    )
    .ok_or_else(|| format!("unknown pickup point `{}`", args.pickup_point))?;
    controller.dispatch(DraftAction::ChoosePickupPoint(pickup_point));
    if controller.advance()? != Step::Summary {
        return Err("workflow did not reach the summary".into());
    }

    let created = controller.submit().await?;
    println!("{}", created.awb_number);
    Ok(())
}

fn find<T: Clone>(items: &[T], id: &str, key: impl Fn(&T) -> &String) -> Option<T> {
    items.iter().find(|item| key(item) == id).cloned()
}
