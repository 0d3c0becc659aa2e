use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use client_core::{
    listing::{self, price_label},
    BrowseQuery, ContactForm, PasswordStrength, SharePlatform, SignupForm, SortOrder, Storefront,
    StorefrontOptions,
};
use shared::{
    domain::{Category, Product, ProductId},
    error::{Severity, UserNotice},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, prepare_database_url};

const DEFAULT_PAGE_URL: &str = "https://pczone.my/";

#[derive(Parser, Debug)]
#[command(name = "storefront", about = "PC Zone storefront client")]
struct Args {
    /// Overrides the configured database url.
    #[arg(long, global = true)]
    database_url: Option<String>,
    /// Prints product listings as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// First two laptops and first two accessories.
    Featured,
    BestSellers,
    Browse {
        #[arg(long, default_value = "laptops")]
        category: Category,
        #[arg(long)]
        sort: Option<SortOrder>,
        #[arg(long)]
        search: Option<String>,
    },
    Show {
        id: i64,
    },
    Share {
        id: i64,
        #[arg(long)]
        platform: SharePlatform,
        #[arg(long, default_value = DEFAULT_PAGE_URL)]
        page_url: String,
    },
    /// Selects up to three products and prints the comparison table.
    Compare {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    Cart {
        #[command(subcommand)]
        action: CartCommand,
    },
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        remember_me: bool,
    },
    Logout,
    Whoami,
    PasswordStrength {
        password: String,
    },
    Subscribe {
        email: String,
    },
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        message: String,
    },
}

#[derive(Subcommand, Debug)]
enum CartCommand {
    Show,
    Add { id: i64 },
    Remove { id: i64 },
    Update { id: i64, quantity: i64 },
    Checkout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = load_settings();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let raw_database_url = args
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database_url.clone());
    let database_url = prepare_database_url(&raw_database_url)?;

    let options = StorefrontOptions {
        database_url: database_url.clone(),
        catalog: settings.catalog_endpoint(),
        email: settings.email(),
    };
    let mut store = Storefront::open(options).await.map_err(|error| {
        error!(%database_url, %error, "storefront: failed to open client storage");
        error
    })?;

    let started = store.start().await?;
    for message in started.welcome.iter().chain(started.status_message.iter()) {
        print_notice(&UserNotice::info(message.clone()));
    }
    if let Some(reason) = store.catalog().last_error() {
        print_notice(&UserNotice::rejected(
            shared::error::ErrorCode::Unavailable,
            format!("Catalog unavailable: {reason}"),
        ));
    }

    run(&mut store, args.command, args.json).await
}

async fn run(store: &mut Storefront, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Featured => {
            let products = listing::featured(store.catalog()).await;
            print_products(&products, json)?;
        }
        Command::BestSellers => {
            let products = listing::best_sellers(store.catalog()).await;
            print_products(&products, json)?;
        }
        Command::Browse {
            category,
            sort,
            search,
        } => {
            let query = BrowseQuery { sort, search };
            let products = listing::browse(store.catalog(), category, &query).await;
            print_products(&products, json)?;
        }
        Command::Show { id } => {
            let product = listing::product_details(store.catalog(), ProductId(id))
                .await
                .map_err(|e| rejected(e.notice()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(product)?);
            } else {
                print_details(product);
            }
        }
        Command::Share {
            id,
            platform,
            page_url,
        } => {
            let product = listing::product_details(store.catalog(), ProductId(id))
                .await
                .map_err(|e| rejected(e.notice()))?;
            let link = listing::share_link(platform, product, &page_url)?;
            println!("{link}");
        }
        Command::Compare { ids } => {
            store.catalog().ensure_loaded().await;
            for id in ids {
                if let Err(err) = store.toggle_compare(ProductId(id), true) {
                    print_notice(&err.notice());
                }
            }
            println!("{}", store.comparison().indicator().label());
            let table = store
                .comparison_table()
                .await
                .map_err(|e| rejected(e.notice()))?;
            let names: Vec<&str> = table.products.iter().map(|p| p.name.as_str()).collect();
            println!("{}", names.join(" | "));
            for row in &table.rows {
                let values: Vec<String> = row.values.iter().map(|v| v.replace('\n', ", ")).collect();
                println!("{}: {}", row.label, values.join(" | "));
            }
        }
        Command::Cart { action } => run_cart(store, action).await?,
        Command::Signup {
            name,
            email,
            password,
            confirm_password,
        } => {
            let form = SignupForm {
                name,
                email,
                password,
                confirm_password,
            };
            let user = store
                .accounts()
                .signup(&form)
                .await
                .map_err(|e| rejected(e.notice()))?;
            print_notice(&UserNotice::success(format!(
                "Account created! Welcome, {}.",
                user.name
            )));
        }
        Command::Login {
            email,
            password,
            remember_me,
        } => {
            let user = store
                .accounts()
                .login(&email, &password, remember_me)
                .await
                .map_err(|e| rejected(e.notice()))?;
            print_notice(&UserNotice::success(format!("Welcome back, {}!", user.name)));
        }
        Command::Logout => {
            store.accounts().logout().await?;
            print_notice(&UserNotice::success("You have been logged out."));
        }
        Command::Whoami => {
            println!("{}", store.accounts().display_name().await?);
        }
        Command::PasswordStrength { password } => {
            let strength = PasswordStrength::of(&password);
            println!("{} ({}%)", strength.label(), strength.meter_width());
        }
        Command::Subscribe { email } => {
            store
                .newsletter()
                .subscribe(&email)
                .await
                .map_err(|e| rejected(e.notice()))?;
            print_notice(&UserNotice::success(
                "Thank you for subscribing to our newsletter!",
            ));
        }
        Command::Contact {
            name,
            email,
            subject,
            message,
        } => {
            let form = ContactForm {
                name,
                email,
                subject,
                message,
            };
            store
                .contact()
                .submit(&form)
                .await
                .map_err(|e| rejected(e.notice()))?;
            print_notice(&UserNotice::success(
                "Your message has been sent. We'll get back to you soon!",
            ));
        }
    }
    Ok(())
}

async fn run_cart(store: &Storefront, action: CartCommand) -> Result<()> {
    match action {
        CartCommand::Show => {}
        CartCommand::Add { id } => {
            store
                .add_to_cart(ProductId(id))
                .await
                .map_err(|e| rejected(e.notice()))?;
        }
        CartCommand::Remove { id } => {
            store
                .cart()
                .remove(ProductId(id))
                .await
                .map_err(|e| rejected(e.notice()))?;
        }
        CartCommand::Update { id, quantity } => {
            let found = store
                .cart()
                .update_quantity(ProductId(id), quantity)
                .await
                .map_err(|e| rejected(e.notice()))?;
            if !found {
                print_notice(&UserNotice::info(format!("Product {id} is not in the cart")));
            }
        }
        CartCommand::Checkout => {
            store.checkout().await.map_err(|e| rejected(e.notice()))?;
            info!("storefront: proceeding to payment");
            print_notice(&UserNotice::success("Proceeding to payment..."));
            return Ok(());
        }
    }

    let summary = store
        .cart()
        .summary()
        .await
        .map_err(|e| rejected(e.notice()))?;
    if summary.is_empty() {
        println!("Your cart is empty.");
        return Ok(());
    }
    for line in &summary.lines {
        println!(
            "{:>4}  {:<32} x{:<3} {}",
            line.id().0,
            line.product.name,
            line.quantity,
            price_label(line.line_total())
        );
    }
    println!("Subtotal: {:.2}", summary.subtotal);
    println!("Tax:      {:.2}", summary.tax);
    println!("Shipping: {}", summary.shipping_label());
    println!("Total:    {:.2}", summary.total);
    Ok(())
}

fn print_products(products: &[&Product], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(products)?);
        return Ok(());
    }
    if products.is_empty() {
        println!("No products found.");
    }
    for product in products {
        let badge = if product.best_seller { " [best seller]" } else { "" };
        println!(
            "{:>4}  {:<32} {}{badge}",
            product.id.0,
            product.name,
            price_label(product.price)
        );
    }
    Ok(())
}

fn print_details(product: &Product) {
    println!("{} (#{})", product.name, product.id);
    match product.old_price {
        Some(old) => println!("Price: {} (was {})", price_label(product.price), price_label(old)),
        None => println!("Price: {}", price_label(product.price)),
    }
    if let Some(category) = &product.category {
        println!("Category: {category}");
    }
    if let Some(description) = &product.description {
        println!("{description}");
    }
    for spec in product.specs.iter().flatten() {
        println!("  - {spec}");
    }
}

fn print_notice(notice: &UserNotice) {
    let tag = match notice.severity {
        Severity::Success => "ok",
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Danger => "error",
    };
    eprintln!("[{tag}] {}", notice.message);
}

fn rejected(notice: UserNotice) -> anyhow::Error {
    anyhow!(notice.message)
}
