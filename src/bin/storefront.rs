//! CLI for browsing and editing storefront state on disk.

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use futures::executor::block_on;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use rust_decimal::Decimal;
use secrecy::SecretString;
use storefront_core::Storefront;
use storefront_core::catalog::{InMemoryCatalog, ProductCatalog, ProductFilter};
use storefront_core::checkout::OrderReceipt;
use storefront_core::config::StorefrontConfig;
use storefront_core::models::{
    Address, AddressDraft, AddressId, CartDisplayItem, Coupon, CouponDraft, CouponId,
    CouponPatch, CouponType, PaymentMethod, Product, ProductId, ProductSort,
};
use storefront_core::payment::{CardDetails, MockPaymentGateway, PaymentInfo};
use storefront_core::pricing::{self, CheckoutSummary};
use storefront_core::storage::{FileStorage, Storage};
use storefront_core::wishlist::WishlistToggle;

/// Storefront CLI: cart, wishlist, addresses, coupons and checkout.
#[derive(Debug, Parser)]
#[command(name = "storefront", version, about)]
struct Cli {
    /// Override the storage directory (default: XDG data dir).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Act as this signed-in user instead of a guest.
    #[arg(long, global = true, value_name = "EMAIL")]
    user: Option<String>,
    /// JSON file holding the product catalog.
    #[arg(long, global = true, value_name = "FILE")]
    catalog: Option<PathBuf>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Show or edit the cart.
    #[command(subcommand)]
    Cart(CartCommand),
    /// Show or edit the wishlist.
    #[command(subcommand)]
    Wishlist(WishlistCommand),
    /// Manage saved shipping addresses.
    #[command(subcommand)]
    Address(AddressCommand),
    /// Manage seller coupons.
    #[command(subcommand)]
    Coupon(CouponCommand),
    /// List catalog products, optionally filtered and sorted.
    Products(ProductArgs),
    /// Pay for the cart.
    Checkout(CheckoutArgs),
    /// Show or change the home page banner.
    #[command(subcommand)]
    Home(HomeCommand),
}

/// `cart` subcommands.
#[derive(Debug, Subcommand)]
enum CartCommand {
    /// List cart rows with totals.
    List,
    /// Add units of a product.
    Add {
        /// Product id.
        product: String,
        /// Units to add.
        #[arg(long, default_value_t = 1)]
        qty: u32,
    },
    /// Set the quantity of a line; zero or less removes it.
    Set {
        /// Product id.
        product: String,
        /// New quantity.
        #[arg(allow_negative_numbers = true)]
        qty: i64,
    },
    /// Remove a line.
    Remove {
        /// Product id.
        product: String,
    },
    /// Remove every line.
    Clear,
}

/// `wishlist` subcommands.
#[derive(Debug, Subcommand)]
enum WishlistCommand {
    /// List wishlisted products, newest first.
    List,
    /// Add a product, or remove it if already wishlisted.
    Toggle {
        /// Product id.
        product: String,
    },
    /// Remove a product.
    Remove {
        /// Product id.
        product: String,
    },
    /// Remove every product.
    Clear,
}

/// `address` subcommands.
#[derive(Debug, Subcommand)]
enum AddressCommand {
    /// List saved addresses.
    List,
    /// Save a new address.
    Add(AddressArgs),
    /// Make an address the default.
    Default {
        /// Address id.
        id: String,
    },
    /// Delete an address.
    Remove {
        /// Address id.
        id: String,
    },
    /// Ship the next order to this address.
    Select {
        /// Address id.
        id: String,
    },
}

/// Fields of a new address.
#[derive(Debug, Args)]
struct AddressArgs {
    /// Recipient name.
    #[arg(long)]
    full_name: String,
    /// Street and house number.
    #[arg(long)]
    street: String,
    /// Apartment, suite, unit.
    #[arg(long)]
    apartment: Option<String>,
    /// City.
    #[arg(long)]
    city: String,
    /// State or province.
    #[arg(long)]
    state: String,
    /// Postal code.
    #[arg(long)]
    zip: String,
    /// Country.
    #[arg(long)]
    country: String,
    /// Phone number including country code.
    #[arg(long)]
    phone: String,
    /// Make this the default address.
    #[arg(long)]
    default: bool,
}

/// `coupon` subcommands.
#[derive(Debug, Subcommand)]
enum CouponCommand {
    /// List every coupon.
    List,
    /// Create a coupon.
    Add(CouponArgs),
    /// Delete a coupon.
    Remove {
        /// Coupon id.
        id: String,
    },
    /// Allow a coupon to be applied.
    Enable {
        /// Coupon id.
        id: String,
    },
    /// Stop a coupon from being applied.
    Disable {
        /// Coupon id.
        id: String,
    },
    /// Check whether a code applies to the cart (or a given subtotal).
    Check {
        /// Coupon code.
        code: String,
        /// Subtotal to check against instead of the cart.
        #[arg(long, value_parser = parse_decimal)]
        subtotal: Option<Decimal>,
    },
}

/// Fields of a new coupon.
#[derive(Debug, Args)]
struct CouponArgs {
    /// Coupon code (stored uppercase).
    #[arg(long)]
    code: String,
    /// `percentage` or `fixed`.
    #[arg(long, value_parser = parse_coupon_type)]
    kind: CouponType,
    /// Percentage (1-100) or flat amount.
    #[arg(long, value_parser = parse_decimal)]
    value: Decimal,
    /// Minimum subtotal required.
    #[arg(long, value_parser = parse_decimal)]
    min: Option<Decimal>,
    /// First valid day (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// Last valid day (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    until: Option<NaiveDate>,
    /// Create the coupon disabled.
    #[arg(long)]
    inactive: bool,
}

/// Arguments for the `products` subcommand.
#[derive(Debug, Args)]
struct ProductArgs {
    /// Search text matched against name, description and category.
    #[arg(long)]
    query: Option<String>,
    /// Only show this category (repeatable).
    #[arg(long)]
    category: Vec<String>,
    /// `price-asc`, `price-desc`, `rating` or `name`.
    #[arg(long)]
    sort: Option<ProductSort>,
    /// Maximum number of products to show.
    #[arg(long)]
    limit: Option<usize>,
}

/// Arguments for the `checkout` subcommand.
#[derive(Debug, Args)]
struct CheckoutArgs {
    /// Coupon code to apply.
    #[arg(long)]
    coupon: Option<String>,
    /// Ship to this address instead of the selected or default one.
    #[arg(long)]
    address: Option<String>,
    /// `phonepe` or `card`.
    #[arg(long, default_value = "phonepe", value_parser = parse_method)]
    method: PaymentMethod,
    /// Name on the card.
    #[arg(long, required_if_eq("method", "card"))]
    card_holder: Option<String>,
    /// Card number.
    #[arg(long, required_if_eq("method", "card"))]
    card_number: Option<String>,
    /// Card expiry (MM/YY).
    #[arg(long, required_if_eq("method", "card"))]
    card_expiry: Option<String>,
    /// Card security code.
    #[arg(long, required_if_eq("method", "card"))]
    card_cvc: Option<String>,
}

/// `home` subcommands.
#[derive(Debug, Subcommand)]
enum HomeCommand {
    /// Print the banner URL.
    Show,
    /// Replace the banner.
    Set {
        /// http(s) or data:image/ URL.
        url: String,
    },
    /// Restore the default banner.
    Reset,
}

/// Parses a date string in `YYYY-MM-DD` format for clap.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|err| format!("{err}"))
}

/// Parses a money amount for clap.
fn parse_decimal(s: &str) -> Result<Decimal, String> {
    s.parse::<Decimal>().map_err(|err| format!("{err}"))
}

/// Parses a coupon type for clap.
fn parse_coupon_type(s: &str) -> Result<CouponType, String> {
    match s.to_ascii_lowercase().as_str() {
        "percentage" | "percent" => Ok(CouponType::Percentage),
        "fixed" => Ok(CouponType::Fixed),
        other => Err(format!("expected percentage or fixed, got {other}")),
    }
}

/// Parses a payment method for clap.
fn parse_method(s: &str) -> Result<PaymentMethod, String> {
    match s.to_ascii_lowercase().as_str() {
        "phonepe" => Ok(PaymentMethod::PhonePe),
        "card" => Ok(PaymentMethod::Card),
        other => Err(format!("expected phonepe or card, got {other}")),
    }
}

/// An open session plus what the commands need around it.
#[derive(Debug)]
struct App<S: Storage> {
    /// Storefront state.
    store: Storefront<S>,
    /// Product catalog.
    catalog: InMemoryCatalog,
    /// Symbol printed before amounts.
    currency: String,
}

impl<S: Storage> App<S> {
    /// Formats an amount with the currency symbol.
    fn money(&self, amount: Decimal) -> String {
        format!("{}{amount:.2}", self.currency)
    }
}

/// Prints `context: err` to stderr and returns a failure exit code.
fn fail<E: core::fmt::Display>(context: &str, err: E) -> io::Result<ExitCode> {
    writeln!(
        io::stderr().lock(),
        "{} {context}: {err}",
        "error:".red().bold()
    )?;
    Ok(ExitCode::FAILURE)
}

/// Prints a success line.
fn done(message: &str) -> io::Result<ExitCode> {
    writeln!(io::stdout().lock(), "{} {message}", "✓".green().bold())?;
    Ok(ExitCode::SUCCESS)
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(err) => return fail("invalid configuration", err),
    };
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir;
    }
    if cli.user.is_some() {
        config.user = cli.user;
    }

    let storage = match create_storage(config.data_dir.clone()) {
        Ok(storage) => storage,
        Err(err) => return fail("failed to initialize storage", err),
    };
    let catalog = match load_catalog(cli.catalog.as_deref()) {
        Ok(catalog) => catalog,
        Err(err) => return fail("failed to load catalog", err),
    };
    let store = match Storefront::builder()
        .storage(storage)
        .config(&config)
        .build()
    {
        Ok(store) => store,
        Err(err) => return fail("failed to open storefront", err),
    };

    let mut app = App {
        store,
        catalog,
        currency: config.currency_symbol,
    };
    dispatch(&mut app, cli.command)
}

/// Creates the storage backend, using `data_dir` if provided or the
/// default XDG data directory otherwise.
fn create_storage(data_dir: Option<PathBuf>) -> storefront_core::error::Result<FileStorage> {
    let dir = match data_dir {
        Some(dir) => dir,
        None => FileStorage::default_dir()?,
    };
    FileStorage::new(dir)
}

/// Loads the catalog file, or an empty catalog when none was given.
fn load_catalog(path: Option<&Path>) -> storefront_core::error::Result<InMemoryCatalog> {
    let Some(file) = path else {
        tracing::debug!("no catalog file given, product details unavailable");
        return Ok(InMemoryCatalog::default());
    };
    let json = std::fs::read_to_string(file).map_err(|err| {
        storefront_core::error::StorefrontError::Catalog(
            format!("{}: {err}", file.display()).into(),
        )
    })?;
    InMemoryCatalog::from_json(&json)
}

/// Dispatches to the appropriate subcommand handler.
fn dispatch<S: Storage>(app: &mut App<S>, command: Command) -> io::Result<ExitCode> {
    match command {
        Command::Cart(cmd) => cmd_cart(app, cmd),
        Command::Wishlist(cmd) => cmd_wishlist(app, cmd),
        Command::Address(cmd) => cmd_address(app, cmd),
        Command::Coupon(cmd) => cmd_coupon(app, cmd),
        Command::Products(args) => cmd_products(app, &args),
        Command::Checkout(args) => cmd_checkout(app, args),
        Command::Home(cmd) => cmd_home(app, cmd),
    }
}

/// Resolves the cart into display rows, printing an error on failure.
fn cart_rows<S: Storage>(app: &App<S>) -> io::Result<Option<Vec<CartDisplayItem>>> {
    match block_on(app.store.resolve_cart(&app.catalog)) {
        Ok(resolved) => Ok(Some(resolved.items)),
        Err(err) => {
            let _code = fail("failed to load products", err)?;
            Ok(None)
        }
    }
}

/// Executes a `cart` subcommand.
fn cmd_cart<S: Storage>(app: &mut App<S>, command: CartCommand) -> io::Result<ExitCode> {
    let cart = app.store.cart_mut();
    let result = match command {
        CartCommand::List => {
            let Some(rows) = cart_rows(app)? else {
                return Ok(ExitCode::FAILURE);
            };
            let summary = match app.store.checkout().summary(&rows) {
                Ok(summary) => summary,
                Err(err) => return fail("cannot price cart", err),
            };
            print_cart_table(app, &rows, &summary)?;
            return Ok(ExitCode::SUCCESS);
        }
        CartCommand::Add { product, qty } => cart
            .add_to_cart(&ProductId::new(product), qty)
            .map(|()| "Added to cart."),
        CartCommand::Set { product, qty } => cart
            .update_quantity(&ProductId::new(product), qty)
            .map(|()| "Quantity updated."),
        CartCommand::Remove { product } => cart
            .remove_from_cart(&ProductId::new(product))
            .map(|()| "Removed from cart."),
        CartCommand::Clear => cart.clear_cart().map(|()| "Cart cleared."),
    };
    match result {
        Ok(message) => done(message),
        Err(err) => fail("cart update failed", err),
    }
}

/// Executes a `wishlist` subcommand.
fn cmd_wishlist<S: Storage>(app: &mut App<S>, command: WishlistCommand) -> io::Result<ExitCode> {
    let wishlist = app.store.wishlist_mut();
    let result = match command {
        WishlistCommand::List => {
            return match block_on(app.store.resolve_wishlist(&app.catalog)) {
                Ok(resolved) => {
                    let products: Vec<Product> =
                        resolved.items.into_iter().map(|row| row.product).collect();
                    print_products_table(app, "Wishlist", &products)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => fail("failed to load products", err),
            };
        }
        WishlistCommand::Toggle { product } => {
            wishlist
                .toggle_wishlist_item(&ProductId::new(product))
                .map(|toggle| match toggle {
                    WishlistToggle::Added => "Added to wishlist.",
                    WishlistToggle::Removed => "Removed from wishlist.",
                })
        }
        WishlistCommand::Remove { product } => wishlist
            .remove_from_wishlist(&ProductId::new(product))
            .map(|removed| {
                if removed {
                    "Removed from wishlist."
                } else {
                    "Product was not wishlisted."
                }
            }),
        WishlistCommand::Clear => wishlist.clear().map(|()| "Wishlist cleared."),
    };
    match result {
        Ok(message) => done(message),
        Err(err) => fail("wishlist update failed", err),
    }
}

/// Executes an `address` subcommand.
fn cmd_address<S: Storage>(app: &mut App<S>, command: AddressCommand) -> io::Result<ExitCode> {
    let book = app.store.addresses_mut();
    let result = match command {
        AddressCommand::List => {
            print_addresses_table(app)?;
            return Ok(ExitCode::SUCCESS);
        }
        AddressCommand::Add(args) => book
            .add_address(AddressDraft {
                full_name: args.full_name,
                street_address: args.street,
                apartment_suite: args.apartment,
                city: args.city,
                state: args.state,
                zip_code: args.zip,
                country: args.country,
                phone_number: args.phone,
                is_default: Some(args.default),
            })
            .map(|address| format!("Address saved ({}).", address.id)),
        AddressCommand::Default { id } => book
            .set_default(&AddressId::new(id))
            .map(|()| "Default address updated.".to_owned()),
        AddressCommand::Remove { id } => book
            .remove_and_reassign_default(&AddressId::new(id))
            .map(|removed| {
                if removed {
                    "Address removed.".to_owned()
                } else {
                    "No address with that id.".to_owned()
                }
            }),
        AddressCommand::Select { id } => book
            .select_for_checkout(&AddressId::new(id))
            .map(|()| "Address selected for checkout.".to_owned()),
    };
    match result {
        Ok(message) => done(&message),
        Err(err) => fail("address update failed", err),
    }
}

/// Executes a `coupon` subcommand.
fn cmd_coupon<S: Storage>(app: &mut App<S>, command: CouponCommand) -> io::Result<ExitCode> {
    let result = match command {
        CouponCommand::List => {
            print_coupons_table(app, app.store.coupons().fetch_all())?;
            return Ok(ExitCode::SUCCESS);
        }
        CouponCommand::Check { code, subtotal } => return cmd_coupon_check(app, &code, subtotal),
        CouponCommand::Add(args) => {
            let mut draft = CouponDraft::new(args.code, args.kind, args.value)
                .valid_between(args.from.map(start_of_day), args.until.map(end_of_day));
            draft.min_purchase_amount = args.min;
            draft.is_active = !args.inactive;
            app.store
                .coupons_mut()
                .add_coupon(draft)
                .map(|coupon| format!("Coupon {} created ({}).", coupon.code, coupon.id))
        }
        CouponCommand::Remove { id } => app
            .store
            .coupons_mut()
            .remove_coupon(&CouponId::new(id))
            .map(|removed| {
                if removed {
                    "Coupon removed.".to_owned()
                } else {
                    "No coupon with that id.".to_owned()
                }
            }),
        CouponCommand::Enable { id } => set_coupon_active(app, id, true),
        CouponCommand::Disable { id } => set_coupon_active(app, id, false),
    };
    match result {
        Ok(message) => done(&message),
        Err(err) => fail("coupon update failed", err),
    }
}

/// Flips a coupon's active flag.
fn set_coupon_active<S: Storage>(
    app: &mut App<S>,
    id: String,
    active: bool,
) -> storefront_core::error::Result<String> {
    let patch = CouponPatch {
        is_active: Some(active),
        ..CouponPatch::default()
    };
    let updated = app.store.coupons_mut().update_coupon(&CouponId::new(id), patch)?;
    Ok(match updated {
        Some(coupon) if active => format!("Coupon {} enabled.", coupon.code),
        Some(coupon) => format!("Coupon {} disabled.", coupon.code),
        None => "No coupon with that id.".to_owned(),
    })
}

/// Executes `coupon check`.
fn cmd_coupon_check<S: Storage>(
    app: &App<S>,
    code: &str,
    subtotal: Option<Decimal>,
) -> io::Result<ExitCode> {
    let amount = match subtotal {
        Some(amount) => amount,
        None => {
            let Some(rows) = cart_rows(app)? else {
                return Ok(ExitCode::FAILURE);
            };
            match pricing::subtotal(&rows) {
                Ok(amount) => amount,
                Err(err) => return fail("cannot price cart", err),
            }
        }
    };
    let validation = app.store.coupons().validate_coupon(code, amount, Utc::now());
    let mut out = io::stdout().lock();
    match validation.coupon.as_ref() {
        Some(coupon) => {
            let discount = pricing::coupon_discount(coupon, amount);
            writeln!(out, "{} {}", "✓".green().bold(), validation.message)?;
            writeln!(
                out,
                "  {} {} off {}",
                coupon.code.bold(),
                app.money(discount),
                app.money(amount)
            )?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            writeln!(out, "{} {}", "✗".red().bold(), validation.message)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `products` subcommand.
fn cmd_products<S: Storage>(app: &App<S>, args: &ProductArgs) -> io::Result<ExitCode> {
    let mut filter = ProductFilter::new();
    if let Some(text) = args.query.as_deref() {
        filter = filter.query(text);
    }
    for name in &args.category {
        filter = filter.category(name.as_str());
    }
    if let Some(order) = args.sort {
        filter = filter.sort(order);
    }
    if let Some(limit) = args.limit {
        filter = filter.limit(limit);
    }
    match block_on(app.catalog.search(&filter)) {
        Ok(products) => {
            print_products_table(app, "Products", &products)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to list products", err),
    }
}

/// Executes the `checkout` subcommand: applies the coupon, shows the
/// summary and pays.
fn cmd_checkout<S: Storage>(app: &mut App<S>, args: CheckoutArgs) -> io::Result<ExitCode> {
    if !app.store.cart().has_items() {
        return fail("cannot check out", "your cart is empty");
    }
    let Some(rows) = cart_rows(app)? else {
        return Ok(ExitCode::FAILURE);
    };
    if let Some(id) = args.address
        && let Err(err) = app.store.addresses_mut().select_for_checkout(&AddressId::new(id))
    {
        return fail("cannot use address", err);
    }
    if let Some(code) = args.coupon.as_deref() {
        match app.store.apply_coupon(code, &rows, Utc::now()) {
            Ok(validation) if validation.is_valid => {
                writeln!(io::stdout().lock(), "{} {}", "✓".green().bold(), validation.message)?;
            }
            Ok(validation) => {
                writeln!(
                    io::stderr().lock(),
                    "{} {} Continuing without a coupon.",
                    "warning:".yellow().bold(),
                    validation.message
                )?;
            }
            Err(err) => return fail("cannot apply coupon", err),
        }
    }
    let summary = match app.store.checkout().summary(&rows) {
        Ok(summary) => summary,
        Err(err) => return fail("cannot price cart", err),
    };
    print_cart_table(app, &rows, &summary)?;

    let info = match args.method {
        PaymentMethod::PhonePe => PaymentInfo::phonepe(),
        PaymentMethod::Card => PaymentInfo::card(CardDetails {
            holder_name: args.card_holder.unwrap_or_default(),
            number: SecretString::from(args.card_number.unwrap_or_default()),
            expiry: args.card_expiry.unwrap_or_default(),
            cvc: SecretString::from(args.card_cvc.unwrap_or_default()),
        }),
    };
    let spinner = make_spinner("Processing payment...");
    let outcome = block_on(
        app.store
            .place_order(&MockPaymentGateway::new(), &rows, info),
    );
    spinner.finish_and_clear();
    match outcome {
        Ok(receipt) => {
            print_receipt(app, &receipt)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("order failed", err),
    }
}

/// Executes a `home` subcommand.
fn cmd_home<S: Storage>(app: &mut App<S>, command: HomeCommand) -> io::Result<ExitCode> {
    let home = app.store.home_mut();
    let result = match command {
        HomeCommand::Show => {
            writeln!(io::stdout().lock(), "{}", home.image_url())?;
            return Ok(ExitCode::SUCCESS);
        }
        HomeCommand::Set { url } => home.set_image_url(&url).map(|()| "Banner updated."),
        HomeCommand::Reset => home.reset().map(|()| "Banner reset to default."),
    };
    match result {
        Ok(message) => done(message),
        Err(err) => fail("banner update failed", err),
    }
}

/// Midnight UTC at the start of `date`.
fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Last second of `date`, UTC.
fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + TimeDelta::days(1) - TimeDelta::seconds(1)
}

// ── Output formatting ────────────────────────────────────────────────

/// Creates a styled spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

/// Returns a table with the shared preset and a cyan header.
fn styled_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(
        header
            .iter()
            .map(|title| Cell::new(title).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    table
}

/// Prints cart rows and the checkout summary.
fn print_cart_table<S: Storage>(
    app: &App<S>,
    rows: &[CartDisplayItem],
    summary: &CheckoutSummary,
) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if rows.is_empty() {
        writeln!(out, "{}", "Your cart is empty.".dimmed())?;
        return Ok(());
    }

    let mut table = styled_table(&["Product", "Qty", "Price", "Total"]);
    for row in rows {
        _ = table.add_row(vec![
            Cell::new(&row.product.name),
            Cell::new(row.quantity),
            Cell::new(app.money(row.product.price)),
            Cell::new(
                row.line_total()
                    .map_or_else(|| "-".to_owned(), |total| app.money(total)),
            ),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Cart".green().bold(),
        format_args!("({} items)", app.store.cart().item_count()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    writeln!(out, "  {:<10} {}", "Subtotal:".bold(), app.money(summary.subtotal))?;
    if let Some(applied) = app.store.checkout().applied_coupon() {
        writeln!(
            out,
            "  {:<10} -{} ({})",
            "Discount:".bold(),
            app.money(summary.discount),
            applied.code
        )?;
    }
    writeln!(out, "  {:<10} {}", "Total:".bold(), app.money(summary.total))?;
    Ok(())
}

/// Prints products in a table.
fn print_products_table<S: Storage>(
    app: &App<S>,
    title: &str,
    products: &[Product],
) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if products.is_empty() {
        writeln!(out, "{}", "No products found.".dimmed())?;
        return Ok(());
    }

    let mut table = styled_table(&["Id", "Name", "Category", "Price", "Rating"]);
    for product in products {
        _ = table.add_row(vec![
            Cell::new(&product.id),
            Cell::new(&product.name),
            Cell::new(product.category.as_deref().unwrap_or("\u{2014}")),
            Cell::new(app.money(product.price)),
            Cell::new(
                product
                    .rating
                    .map_or_else(|| "\u{2014}".to_owned(), |rating| format!("{rating:.1}")),
            ),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        title.green().bold(),
        format_args!("({})", products.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints saved addresses in a table.
fn print_addresses_table<S: Storage>(app: &App<S>) -> io::Result<()> {
    let mut out = io::stdout().lock();
    let book = app.store.addresses();
    if book.addresses().is_empty() {
        writeln!(out, "{}", "No saved addresses.".dimmed())?;
        return Ok(());
    }

    let selected = book.selected_for_checkout().map(|address| &address.id);
    let mut table = styled_table(&["Id", "Name", "Address", "Phone", ""]);
    for address in book.addresses() {
        let mut flags = Vec::new();
        if address.is_default {
            flags.push("default");
        }
        if selected == Some(&address.id) {
            flags.push("checkout");
        }
        _ = table.add_row(vec![
            Cell::new(&address.id),
            Cell::new(&address.full_name),
            Cell::new(address.one_line()),
            Cell::new(&address.phone_number),
            Cell::new(flags.join(", ")),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Addresses".green().bold(),
        format_args!("({})", book.addresses().len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints coupons in a table.
fn print_coupons_table<S: Storage>(app: &App<S>, coupons: &[Coupon]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if coupons.is_empty() {
        writeln!(out, "{}", "No coupons.".dimmed())?;
        return Ok(());
    }

    let mut table = styled_table(&["Id", "Code", "Discount", "Min", "Valid", "Active"]);
    for coupon in coupons {
        let discount = match coupon.kind {
            CouponType::Percentage => format!("{}%", coupon.discount_value.normalize()),
            CouponType::Fixed => app.money(coupon.discount_value),
        };
        let min = coupon
            .min_purchase_amount
            .map_or_else(|| "\u{2014}".to_owned(), |amount| app.money(amount));
        let window = format!(
            "{} .. {}",
            coupon
                .valid_from
                .map_or_else(String::new, |from| from.format("%Y-%m-%d").to_string()),
            coupon
                .valid_until
                .map_or_else(String::new, |until| until.format("%Y-%m-%d").to_string()),
        );
        let active = if coupon.is_active {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::Red)
        };
        _ = table.add_row(vec![
            Cell::new(&coupon.id),
            Cell::new(&coupon.code),
            Cell::new(discount),
            Cell::new(min),
            Cell::new(window),
            active,
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Coupons".green().bold(),
        format_args!("({})", coupons.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints an order confirmation.
fn print_receipt<S: Storage>(app: &App<S>, receipt: &OrderReceipt) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", "Order placed".green().bold())?;
    writeln!(out)?;
    if let Some(id) = receipt.transaction_id.as_ref() {
        writeln!(out, "  {} {id}", "Transaction:".bold())?;
    }
    if let Some(code) = receipt.coupon_code.as_deref() {
        writeln!(
            out,
            "  {} {code} (-{})",
            "Coupon:".bold(),
            app.money(receipt.summary.discount)
        )?;
    }
    writeln!(out, "  {} {}", "Paid:".bold(), app.money(receipt.summary.total))?;
    write_address(&mut out, &receipt.address)?;
    writeln!(
        out,
        "  {} {}",
        "Arrives by:".bold(),
        receipt.estimated_delivery.format("%A, %B %-d")
    )?;
    Ok(())
}

/// Writes the shipping address block of a receipt.
fn write_address<W: io::Write>(out: &mut W, address: &Address) -> io::Result<()> {
    writeln!(out, "  {} {}", "Ship to:".bold(), address.full_name)?;
    writeln!(out, "            {}", address.one_line())?;
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            // Last-resort error output; nothing left to report to if
            // stderr itself failed.
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use storefront_core::storage::InMemoryStorage;

    fn app() -> App<InMemoryStorage> {
        App {
            store: Storefront::builder()
                .storage(InMemoryStorage::new())
                .build()
                .unwrap(),
            catalog: InMemoryCatalog::new(vec![
                Product::new("p1", "Shirt", Decimal::from(100)),
                Product::new("p2", "Mug", Decimal::from(12)),
            ]),
            currency: "₹".to_owned(),
        }
    }

    fn address_args() -> AddressArgs {
        AddressArgs {
            full_name: "Asha Rao".to_owned(),
            street: "12 MG Road".to_owned(),
            apartment: None,
            city: "Pune".to_owned(),
            state: "Maharashtra".to_owned(),
            zip: "411001".to_owned(),
            country: "India".to_owned(),
            phone: "+91 9876543210".to_owned(),
            default: false,
        }
    }

    fn checkout_args(coupon: Option<&str>) -> CheckoutArgs {
        CheckoutArgs {
            coupon: coupon.map(str::to_owned),
            address: None,
            method: PaymentMethod::PhonePe,
            card_holder: None,
            card_number: None,
            card_expiry: None,
            card_cvc: None,
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory as _;
        Cli::command().debug_assert();
    }

    #[test]
    fn parsers() {
        assert_eq!(parse_coupon_type("Fixed").unwrap(), CouponType::Fixed);
        assert!(parse_coupon_type("bogo").is_err());
        assert_eq!(parse_method("card").unwrap(), PaymentMethod::Card);
        assert_eq!(parse_decimal("12.50").unwrap(), Decimal::new(1250, 2));
        assert_eq!(
            end_of_day(parse_date("2025-01-31").unwrap()).to_rfc3339(),
            "2025-01-31T23:59:59+00:00"
        );
    }

    #[test]
    fn money_formats_two_decimals() {
        assert_eq!(app().money(Decimal::new(195, 0)), "₹195.00");
    }

    #[test]
    fn cart_commands() {
        let mut app = app();
        let code = cmd_cart(
            &mut app,
            CartCommand::Add {
                product: "p1".to_owned(),
                qty: 2,
            },
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(app.store.cart().item_count(), 2);

        let code = cmd_cart(
            &mut app,
            CartCommand::Add {
                product: "p1".to_owned(),
                qty: 0,
            },
        )
        .unwrap();
        assert_eq!(code, ExitCode::FAILURE);

        let code = cmd_cart(&mut app, CartCommand::List).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let code = cmd_cart(
            &mut app,
            CartCommand::Set {
                product: "p1".to_owned(),
                qty: -1,
            },
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(!app.store.cart().has_items());
    }

    #[test]
    fn wishlist_toggle_and_list() {
        let mut app = app();
        let toggle = || WishlistCommand::Toggle {
            product: "p2".to_owned(),
        };
        assert_eq!(cmd_wishlist(&mut app, toggle()).unwrap(), ExitCode::SUCCESS);
        assert_eq!(app.store.wishlist().item_count(), 1);
        assert_eq!(
            cmd_wishlist(&mut app, WishlistCommand::List).unwrap(),
            ExitCode::SUCCESS
        );
        assert_eq!(cmd_wishlist(&mut app, toggle()).unwrap(), ExitCode::SUCCESS);
        assert_eq!(app.store.wishlist().item_count(), 0);
    }

    #[test]
    fn address_commands() {
        let mut app = app();
        let code = cmd_address(&mut app, AddressCommand::Add(address_args())).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(app.store.addresses().default_address().is_some());

        let mut bad = address_args();
        bad.zip = "1".to_owned();
        let code = cmd_address(&mut app, AddressCommand::Add(bad)).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert_eq!(
            cmd_address(&mut app, AddressCommand::List).unwrap(),
            ExitCode::SUCCESS
        );
    }

    #[test]
    fn coupon_commands() {
        let mut app = app();
        let args = CouponArgs {
            code: "welcome".to_owned(),
            kind: CouponType::Percentage,
            value: Decimal::from(15),
            min: None,
            from: None,
            until: None,
            inactive: false,
        };
        assert_eq!(
            cmd_coupon(&mut app, CouponCommand::Add(args)).unwrap(),
            ExitCode::SUCCESS
        );
        assert!(app.store.coupons().find_by_code("WELCOME").is_some());

        let check = |code: &str| CouponCommand::Check {
            code: code.to_owned(),
            subtotal: Some(Decimal::from(100)),
        };
        assert_eq!(cmd_coupon(&mut app, check("welcome")).unwrap(), ExitCode::SUCCESS);
        assert_eq!(cmd_coupon(&mut app, check("EXPIRED")).unwrap(), ExitCode::FAILURE);
        assert_eq!(
            cmd_coupon(
                &mut app,
                CouponCommand::Disable {
                    id: "c1".to_owned()
                }
            )
            .unwrap(),
            ExitCode::SUCCESS
        );
        assert_eq!(cmd_coupon(&mut app, check("SAVE10")).unwrap(), ExitCode::FAILURE);
        assert_eq!(cmd_coupon(&mut app, CouponCommand::List).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn products_are_listed() {
        let app = app();
        let args = ProductArgs {
            query: Some("mug".to_owned()),
            category: Vec::new(),
            sort: Some(ProductSort::PriceAsc),
            limit: None,
        };
        assert_eq!(cmd_products(&app, &args).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn checkout_with_empty_cart_fails() {
        let mut app = app();
        let code = cmd_checkout(&mut app, checkout_args(None)).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn checkout_pays_and_clears_cart() {
        let mut app = app();
        let _saved = cmd_address(&mut app, AddressCommand::Add(address_args())).unwrap();
        let _added = cmd_cart(
            &mut app,
            CartCommand::Add {
                product: "p1".to_owned(),
                qty: 2,
            },
        )
        .unwrap();
        let code = cmd_checkout(&mut app, checkout_args(Some("FIXED5"))).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(!app.store.cart().has_items());
    }

    #[test]
    fn home_commands() {
        let mut app = app();
        let set = HomeCommand::Set {
            url: "https://cdn.example.com/b.png".to_owned(),
        };
        assert_eq!(cmd_home(&mut app, set).unwrap(), ExitCode::SUCCESS);
        assert_eq!(app.store.home().image_url(), "https://cdn.example.com/b.png");
        let bad = HomeCommand::Set {
            url: "javascript:alert(1)".to_owned(),
        };
        assert_eq!(cmd_home(&mut app, bad).unwrap(), ExitCode::FAILURE);
        assert_eq!(cmd_home(&mut app, HomeCommand::Reset).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn dispatch_products() {
        let mut app = app();
        let code = dispatch(
            &mut app,
            Command::Products(ProductArgs {
                query: None,
                category: Vec::new(),
                sort: None,
                limit: Some(1),
            }),
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }
}
